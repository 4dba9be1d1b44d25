use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::Config;
use crate::store::ImportSummary;

pub fn export(file: Option<&Path>, legacy: bool) -> Result<()> {
    let store = super::open_store(&Config::load_or_default())?;
    let json = if legacy {
        store.export_overrides()?
    } else {
        store.export_snapshot()?
    };

    match file {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{}",
                format!(
                    "Exported {} slides to {}",
                    store.slides().len(),
                    path.display()
                )
                .green()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn import(file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mut store = super::open_store(&Config::load_or_default())?;

    match store.import_snapshot(&raw) {
        Ok(summary) => {
            println!("{}", "Configuration imported successfully!".green().bold());
            match summary {
                ImportSummary::Deck { slides } => println!("Deck replaced with {slides} slides."),
                ImportSummary::Overrides { matched } => {
                    println!("Image overrides applied to {matched} slides.")
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", "Failed to import configuration.".red());
            Err(e).with_context(|| format!("Could not import {}", file.display()))
        }
    }
}
