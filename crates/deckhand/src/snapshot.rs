//! Export and import of the deck as JSON.
//!
//! Two formats are accepted on import, both top-level arrays:
//! full slide records (current format) and legacy image overrides
//! (`{id, imageUrl, generatedImageUrl}`), which only touch the image fields
//! of matching slides.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::Slide;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("File is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Expected a JSON array of slides")]
    NotAnArray,

    #[error("Entries are neither slides nor image overrides: {0}")]
    Shape(String),

    #[error("Imported deck contains no slides")]
    Empty,

    #[error("Imported deck contains duplicate slide id {0}")]
    DuplicateId(u32),

    #[error("Slide id {0} is too large; no room left for new slides")]
    IdOutOfRange(u32),
}

/// Legacy partial-override entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageOverride {
    pub id: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Import {
    Deck(Vec<Slide>),
    Overrides(Vec<ImageOverride>),
}

/// Full-project export.
pub fn export_deck(slides: &[Slide]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(slides)
}

/// Legacy partial-override export.
pub fn export_overrides(slides: &[Slide]) -> serde_json::Result<String> {
    let overrides: Vec<ImageOverride> = slides
        .iter()
        .map(|s| ImageOverride {
            id: s.id,
            image_url: Some(s.image_url.clone()),
            generated_image_url: s.generated_image_url.clone(),
        })
        .collect();
    serde_json::to_string_pretty(&overrides)
}

/// Parse and validate an import file without touching any deck.
pub fn parse_import(raw: &str) -> Result<Import, ImportError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if !value.is_array() {
        return Err(ImportError::NotAnArray);
    }

    let deck_error = match serde_json::from_value::<Vec<Slide>>(value.clone()) {
        Ok(slides) => return validate_deck(slides).map(Import::Deck),
        Err(e) => e,
    };

    match serde_json::from_value::<Vec<ImageOverride>>(value) {
        Ok(overrides) => Ok(Import::Overrides(overrides)),
        Err(_) => Err(ImportError::Shape(deck_error.to_string())),
    }
}

/// Deck invariants: at least one slide, unique ids, and room for one more id.
pub(crate) fn validate_deck(slides: Vec<Slide>) -> Result<Vec<Slide>, ImportError> {
    if slides.is_empty() {
        return Err(ImportError::Empty);
    }
    let mut seen = HashSet::new();
    for slide in &slides {
        if slide.id == u32::MAX {
            return Err(ImportError::IdOutOfRange(slide.id));
        }
        if !seen.insert(slide.id) {
            return Err(ImportError::DuplicateId(slide.id));
        }
    }
    Ok(slides)
}

/// Merge legacy overrides onto `slides` by id.
///
/// A present `imageUrl` replaces the base image; `generatedImageUrl` is taken
/// as-is, so an override without one clears the generated image.
pub fn apply_overrides(slides: &[Slide], overrides: &[ImageOverride]) -> Vec<Slide> {
    slides
        .iter()
        .map(|slide| {
            let Some(entry) = overrides.iter().find(|o| o.id == slide.id) else {
                return slide.clone();
            };
            let mut slide = slide.clone();
            if let Some(url) = &entry.image_url {
                slide.image_url = url.clone();
            }
            slide.generated_image_url = entry.generated_image_url.clone();
            slide
        })
        .collect()
}
