//! Scene prompt construction for slide imagery.

use crate::model::{SectionContent, Slide};

/// Body text beyond this many characters is not sent to the model.
const BODY_LIMIT: usize = 300;

/// Setting the photographed subject is placed in, chosen from slide keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Rural,
    Urban,
    OffGrid,
    TechHub,
    Neutral,
}

impl Environment {
    /// Checked in order; the first archetype with a matching keyword wins.
    const KEYWORDS: [(Environment, &'static [&'static str]); 4] = [
        (Environment::Rural, &["farmer", "rural", "agriculture"]),
        (Environment::Urban, &["urban", "city", "lagos", "market"]),
        (Environment::OffGrid, &["solar", "off-grid"]),
        (Environment::TechHub, &["youth", "student", "digital"]),
    ];

    pub fn classify(context: &str) -> Self {
        let lower = context.to_lowercase();
        Self::KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map_or(Environment::Neutral, |(env, _)| *env)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Rural => "a lush Nigerian farm with green fields or a rural village market",
            Self::Urban => {
                "a vibrant, busy Nigerian urban street with modern buildings or a bustling shopping area"
            }
            Self::OffGrid => "a home interior in Nigeria with warm solar-powered lighting",
            Self::TechHub => "a modern Nigerian cafe, workspace, or community tech hub",
            Self::Neutral => "a natural everyday setting in Nigeria",
        }
    }
}

/// Flatten a slide into the text used for environment classification:
/// title, subtitle, headings and the first characters of section bodies.
pub fn slide_context(slide: &Slide) -> String {
    let sections = slide.sections();
    let headings = sections
        .iter()
        .filter_map(|s| s.heading.as_deref())
        .filter(|h| !h.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let body = sections
        .iter()
        .map(|s| section_text(&s.content))
        .collect::<Vec<_>>()
        .join(" ");
    let body: String = body.chars().take(BODY_LIMIT).collect();

    format!(
        "{}. {}. {}. {}",
        slide.title,
        slide.subtitle().unwrap_or_default(),
        headings,
        body
    )
}

fn section_text(content: &SectionContent) -> String {
    match content {
        SectionContent::Text { text } => text.clone(),
        SectionContent::List { items } => serde_json::to_string(items).unwrap_or_default(),
        SectionContent::Table { rows } => serde_json::to_string(rows).unwrap_or_default(),
        SectionContent::Chart { data, .. } => serde_json::to_string(data).unwrap_or_default(),
    }
}

/// Documentary-photograph prompt for `slide`.
pub fn scene_prompt(slide: &Slide) -> String {
    let environment = Environment::classify(&slide_context(slide));
    format!(
        "A highly professional, realistic, documentary-style photograph of a real-life Nigerian person in {}.\n\
         Subject: {}.\n\
         Pose & Action: The subject is holding a modern smartphone naturally and is looking directly at the screen, \
         appearing focused and engaged. This is a candid moment; the subject is NOT showing the phone to the camera \
         or to anyone else. The device is held for personal use as in real life.\n\
         Style: Authentic documentary photography, sharp focus on the subject, naturalistic professional lighting, \
         cinematic depth of field, 8k resolution.",
        environment.description(),
        slide.title
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;
    use crate::model::{KindTag, Section, SlideKind};

    fn content_slide(title: &str, text: &str) -> Slide {
        Slide {
            id: 1,
            kind: SlideKind::Content {
                sections: vec![Section {
                    heading: Some("Context".to_string()),
                    content: SectionContent::Text {
                        text: text.to_string(),
                    },
                }],
            },
            title: title.to_string(),
            image_url: String::new(),
            generated_image_url: None,
        }
    }

    #[test]
    fn test_classify_keywords() {
        assert_eq!(Environment::classify("Smallholder FARMER credit"), Environment::Rural);
        assert_eq!(Environment::classify("Lagos retail"), Environment::Urban);
        assert_eq!(Environment::classify("Off-grid homes"), Environment::OffGrid);
        assert_eq!(Environment::classify("Digital skills"), Environment::TechHub);
        assert_eq!(Environment::classify("Methodology"), Environment::Neutral);
    }

    #[test]
    fn test_classify_first_match_wins() {
        // Both rural and urban keywords: rural is checked first.
        assert_eq!(
            Environment::classify("rural and urban markets"),
            Environment::Rural
        );
    }

    #[test]
    fn test_context_includes_headings_and_body() {
        let slide = content_slide("Title", "Body text");
        assert_eq!(slide_context(&slide), "Title. . Context. Body text");
    }

    #[test]
    fn test_context_truncates_body() {
        let slide = content_slide("T", &"x".repeat(1000));
        let context = slide_context(&slide);
        assert_eq!(context.matches('x').count(), BODY_LIMIT);
    }

    #[test]
    fn test_cover_context_uses_subtitle() {
        let cover = defaults::new_slide(KindTag::Cover, 1);
        assert!(slide_context(&cover).starts_with("New Cover Slide. Subtitle."));
    }

    #[test]
    fn test_prompt_mentions_environment_and_pose() {
        let slide = content_slide("Farmer financing", "Seasonal repayments");
        let prompt = scene_prompt(&slide);
        assert!(prompt.contains(Environment::Rural.description()));
        assert!(prompt.contains("Subject: Farmer financing."));
        assert!(prompt.contains("NOT showing the phone to the camera"));
    }
}
