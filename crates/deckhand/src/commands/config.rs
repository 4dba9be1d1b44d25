use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let config = Config::load_or_default();
    let path = Config::path()?;
    println!("{} {}", "Config file:".bold(), path.display());
    println!();
    println!("{}", "Effective settings:".bold());
    println!("  image model:   {}", config.image_model());
    println!("  aspect ratio:  {}", config.aspect_ratio());
    println!("  chat model:    {}", config.chat_model());
    println!(
        "  api key:       {}",
        if config.resolve_api_key().is_some() {
            "set".green()
        } else {
            "missing (set image_generation.api_key or GEMINI_API_KEY)".yellow()
        }
    );
    println!(
        "  password:      {}",
        if config.authoring.as_ref().and_then(|a| a.password.as_ref()).is_some() {
            "custom"
        } else {
            "built-in"
        }
    );
    println!("  storage:       {}", config.storage_dir()?.display());
    println!();

    let mut redacted = config.clone();
    if let Some(key) = redacted
        .image_generation
        .as_mut()
        .and_then(|g| g.api_key.as_mut())
    {
        *key = "********".to_string();
    }
    if let Some(password) = redacted
        .authoring
        .as_mut()
        .and_then(|a| a.password.as_mut())
    {
        *password = "********".to_string();
    }
    let yaml = serde_yaml::to_string(&redacted)?;
    println!("{}", "Stored configuration:".bold());
    println!("{yaml}");
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_or_default();
    config.set(key, value)?;
    let path = config.save()?;
    println!(
        "{}",
        format!("Set {key} in {}", path.display()).green()
    );
    Ok(())
}
