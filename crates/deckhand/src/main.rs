mod app;
mod chat;
mod cli;
mod commands;
mod config;
mod deck;
mod defaults;
mod error;
mod gemini;
mod imagegen;
mod images;
mod model;
mod navigation;
mod persist;
mod snapshot;
mod store;
mod theme;

use clap::Parser;
use colored::Colorize;

fn main() {
    let cli = cli::Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = cli.run() {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}
