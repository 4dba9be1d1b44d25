use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::deck::{self, Action, Direction};
use crate::model::{KindTag, SectionContent, Slide, SlideKind, SlidePatch};
use crate::store::DeckStore;

fn open() -> Result<DeckStore> {
    super::open_store(&Config::load_or_default())
}

fn require(store: &DeckStore, id: u32) -> Result<usize> {
    store
        .state()
        .position(id)
        .ok_or_else(|| anyhow::anyhow!("No slide with id {id}. Run `deckhand list` to see ids."))
}

pub fn list(search: Option<&str>) -> Result<()> {
    let store = open()?;
    let positions = deck::search(store.slides(), search.unwrap_or_default());
    if positions.is_empty() {
        println!("{}", "No matching slides.".yellow());
        return Ok(());
    }
    for index in positions {
        println!("{}", summary_line(index, &store.slides()[index]));
    }
    Ok(())
}

fn summary_line(index: usize, slide: &Slide) -> String {
    let marker = if slide.generated_image_url.is_some() {
        " [AI image]".cyan().to_string()
    } else {
        String::new()
    };
    format!(
        "{:>3}. {} {}{}",
        index + 1,
        format!("[{}]", slide.kind_tag().name()).dimmed(),
        slide.title.bold(),
        format!(" (id {})", slide.id).dimmed(),
    ) + &marker
}

pub fn show(number: usize) -> Result<()> {
    let store = open()?;
    let index = crate::navigation::jump_index(number, store.slides().len()).ok_or_else(|| {
        anyhow::anyhow!(
            "Slide {number} does not exist. The deck has {} slides.",
            store.slides().len()
        )
    })?;
    print!("{}", render_slide(&store.slides()[index]));
    Ok(())
}

/// Plain-text rendering of a slide for the terminal.
fn render_slide(slide: &Slide) -> String {
    let mut out = format!("{}\n", slide.title.bold());
    match &slide.kind {
        SlideKind::Cover {
            subtitle,
            author,
            date,
        } => {
            for line in [subtitle, author, date].into_iter().flatten() {
                out.push_str(&format!("{line}\n"));
            }
        }
        SlideKind::Content { sections } => {
            for section in sections {
                out.push('\n');
                if let Some(heading) = &section.heading {
                    out.push_str(&format!("{}\n", heading.underline()));
                }
                out.push_str(&render_section(&section.content));
            }
        }
    }
    out.push_str(&format!("\n{} {}\n", "Image:".dimmed(), image_label(slide)));
    out
}

fn render_section(content: &SectionContent) -> String {
    match content {
        SectionContent::Text { text } => format!("{text}\n"),
        SectionContent::List { items } => items.iter().map(|i| format!("  \u{2022} {i}\n")).collect(),
        SectionContent::Table { rows } => {
            let width = rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0);
            rows.iter()
                .map(|r| format!("  {:<width$}  {}\n", r.label, r.value))
                .collect()
        }
        SectionContent::Chart { data, .. } => data
            .iter()
            .map(|item| {
                let unit = item.unit.as_deref().unwrap_or_default();
                match item.secondary_value {
                    Some(second) => {
                        format!("  {}: {}{unit} / {}{unit}\n", item.label, item.value, second)
                    }
                    None => format!("  {}: {}{unit}\n", item.label, item.value),
                }
            })
            .collect(),
    }
}

fn image_label(slide: &Slide) -> String {
    match &slide.generated_image_url {
        Some(uri) => format!("generated ({} bytes, base {})", uri.len(), slide.image_url),
        None => slide.image_url.clone(),
    }
}

pub fn add(kind: KindTag) -> Result<()> {
    let mut store = open()?;
    store.dispatch(Action::Add(kind));
    let index = store.current();
    println!(
        "{}",
        format!("Added {} slide at position {}.", kind.name(), index + 1).green()
    );
    println!("{}", summary_line(index, &store.slides()[index]));
    Ok(())
}

pub fn duplicate(id: u32) -> Result<()> {
    let mut store = open()?;
    require(&store, id)?;
    store.dispatch(Action::Duplicate(id));
    let index = store.current();
    println!("{}", "Duplicated slide.".green());
    println!("{}", summary_line(index, &store.slides()[index]));
    Ok(())
}

pub fn delete(id: u32) -> Result<()> {
    let mut store = open()?;
    require(&store, id)?;
    if store.slides().len() <= 1 {
        anyhow::bail!("Cannot delete the last remaining slide.");
    }
    store.dispatch(Action::Delete(id));
    println!("{}", format!("Deleted slide {id}.").green());
    Ok(())
}

pub fn move_slide(id: u32, direction: Direction) -> Result<()> {
    let mut store = open()?;
    let before = require(&store, id)?;
    store.dispatch(Action::Move(id, direction));
    let after = require(&store, id)?;
    if before == after {
        println!("{}", "Slide is already at the edge of the deck.".yellow());
    } else {
        println!(
            "{}",
            format!("Moved slide {id} to position {}.", after + 1).green()
        );
    }
    Ok(())
}

pub fn edit(id: u32, patch: SlidePatch) -> Result<()> {
    if patch.is_empty() {
        anyhow::bail!("Nothing to change. Pass at least one of --title, --subtitle, --author, --date, --image-url.");
    }
    let mut store = open()?;
    let index = require(&store, id)?;
    if store.slides()[index].kind_tag() == KindTag::Content
        && (patch.subtitle.is_some() || patch.author.is_some() || patch.date.is_some())
    {
        println!(
            "{}",
            "Subtitle, author and date only apply to cover slides; ignoring them.".yellow()
        );
    }
    let clears_generated =
        patch.image_url.is_some() && store.slides()[index].generated_image_url.is_some();
    store.dispatch(Action::Update(id, patch));
    if clears_generated {
        println!("{}", "The generated image was discarded.".yellow());
    }
    println!("{}", format!("Updated slide {id}.").green());
    Ok(())
}

pub fn reset(id: u32) -> Result<()> {
    let mut store = open()?;
    require(&store, id)?;
    if crate::defaults::template_for(id).is_none() {
        anyhow::bail!("Slide {id} has no built-in version to reset to.");
    }
    store.dispatch(Action::Reset(id));
    println!("{}", format!("Reset slide {id} to its built-in version.").green());
    Ok(())
}

pub fn reset_all(yes: bool) -> Result<()> {
    if !yes {
        let confirmed = inquire::Confirm::new(
            "Reset the whole deck to the built-in slides? All edits and generated images are lost.",
        )
        .with_default(false)
        .prompt()?;
        if !confirmed {
            println!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }
    let mut store = open()?;
    store.dispatch(Action::ResetAll);
    println!(
        "{}",
        format!("Deck reset to {} built-in slides.", store.slides().len()).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    #[test]
    fn test_render_content_slide() {
        colored::control::set_override(false);
        let deck = defaults::builtin_deck();
        let slide = deck
            .iter()
            .find(|s| s.kind_tag() == KindTag::Content)
            .unwrap();
        let text = render_slide(slide);
        assert!(text.starts_with(&slide.title));
        assert!(text.contains(&slide.image_url));
    }

    #[test]
    fn test_render_sections() {
        let table = SectionContent::Table {
            rows: vec![
                crate::model::TableRow {
                    label: "A".to_string(),
                    value: "1".to_string(),
                },
                crate::model::TableRow {
                    label: "Longer".to_string(),
                    value: "2".to_string(),
                },
            ],
        };
        assert_eq!(render_section(&table), "  A       1\n  Longer  2\n");

        let list = SectionContent::List {
            items: vec!["one".to_string()],
        };
        assert_eq!(render_section(&list), "  \u{2022} one\n");
    }
}
