use crate::model::{KindTag, Section, SectionContent, Slide, SlideKind};

/// The built-in deck, shipped with the binary.
const DEFAULT_DECK: &str = include_str!("../assets/default_deck.json");

/// Parse the built-in template set.
///
/// Falls back to a single cover slide if the embedded asset is unreadable, so
/// callers always get a non-empty deck.
pub fn builtin_deck() -> Vec<Slide> {
    match serde_json::from_str::<Vec<Slide>>(DEFAULT_DECK) {
        Ok(slides) if !slides.is_empty() => slides,
        Ok(_) => {
            log::error!("Built-in deck is empty");
            vec![new_slide(KindTag::Cover, 0)]
        }
        Err(e) => {
            log::error!("Failed to parse built-in deck: {e}");
            vec![new_slide(KindTag::Cover, 0)]
        }
    }
}

/// The built-in slide sharing `id`, if the template set has one.
pub fn template_for(id: u32) -> Option<Slide> {
    builtin_deck().into_iter().find(|s| s.id == id)
}

/// Default template for a freshly added slide.
pub fn new_slide(kind: KindTag, id: u32) -> Slide {
    let image_url = format!("https://picsum.photos/seed/new-slide-{id}/800/1000");
    match kind {
        KindTag::Cover => Slide {
            id,
            kind: SlideKind::Cover {
                subtitle: Some("Subtitle".to_string()),
                author: Some("Presenter Name – contact@example.com".to_string()),
                date: Some("Date".to_string()),
            },
            title: "New Cover Slide".to_string(),
            image_url,
            generated_image_url: None,
        },
        KindTag::Content => Slide {
            id,
            kind: SlideKind::Content {
                sections: vec![Section {
                    heading: Some("New Section".to_string()),
                    content: SectionContent::Text {
                        text: "Add your content here.".to_string(),
                    },
                }],
            },
            title: "New Slide".to_string(),
            image_url,
            generated_image_url: None,
        },
    }
}
