use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::imagegen::retry::ThreadSleeper;
use crate::imagegen::{ImageOrchestrator, ImagePipeline};

/// Run the generate command for one slide (1-indexed) or every slide lacking an image.
pub fn run(slide: Option<usize>, all: bool) -> Result<()> {
    let config = Config::load_or_default();
    let mut store = super::open_store(&config)?;

    let index = match (slide, all) {
        (_, true) => None,
        (Some(number), false) => Some(
            crate::navigation::jump_index(number, store.slides().len()).ok_or_else(|| {
                anyhow::anyhow!(
                    "Slide {number} does not exist. The deck has {} slides.",
                    store.slides().len()
                )
            })?,
        ),
        (None, false) => anyhow::bail!("Pass --slide N or --all."),
    };

    let client = GeminiClient::from_config(&config)?;
    let sleeper = ThreadSleeper;
    let pipeline = ImagePipeline::new(&client, &sleeper, config.pipeline_settings());
    let mut orchestrator = ImageOrchestrator::default();
    let mut notify = |message: String| println!("  {}", message.yellow());

    match index {
        Some(index) => {
            let title = store.slides()[index].title.clone();
            println!("Generating image for slide {}: {title}...", index + 1);
            orchestrator.generate_image_for(&mut store, index, &pipeline, &mut notify)?;
            println!("{}", "Image saved to the deck.".green().bold());
        }
        None => {
            let pending = store
                .slides()
                .iter()
                .filter(|s| s.generated_image_url.is_none())
                .count();
            if pending == 0 {
                println!(
                    "{}",
                    "Every slide already has a generated image. Nothing to generate."
                        .green()
                        .bold()
                );
                return Ok(());
            }
            println!("Generating images for {pending} slide(s)...");
            let report = orchestrator.generate_all_images(&mut store, &pipeline, &mut notify)?;

            println!();
            if report.generated > 0 {
                println!(
                    "{}",
                    format!("Generated {} image(s).", report.generated).green()
                );
            }
            for (id, error) in &report.failed {
                println!("{}", format!("  slide id {id}: {error}").red());
            }
            if !report.failed.is_empty() {
                println!(
                    "{}",
                    format!("{} image(s) failed to generate.", report.failed.len()).red()
                );
            }
        }
    }
    Ok(())
}
