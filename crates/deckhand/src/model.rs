use serde::{Deserialize, Serialize};

/// One deck entry.
///
/// `image_url` is the manually chosen base image. `generated_image_url` holds an
/// AI-produced data URI that overrides it for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: u32,

    #[serde(flatten)]
    pub kind: SlideKind,

    pub title: String,

    pub image_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlideKind {
    Cover {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtitle: Option<String>,

        /// Newline-delimited "name – contact" entries.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<String>,
    },
    Content {
        #[serde(default)]
        sections: Vec<Section>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindTag {
    Cover,
    Content,
}

impl KindTag {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Content => "content",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,

    pub content: SectionContent,
}

/// Section payload. The discriminant is chosen when the content is written,
/// so a list of strings and a two-column table can never be confused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SectionContent {
    Text {
        text: String,
    },
    List {
        items: Vec<String>,
    },
    Table {
        rows: Vec<TableRow>,
    },
    Chart {
        #[serde(rename = "chartType")]
        chart_type: ChartType,
        data: Vec<ChartItem>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    Bar,
    GroupedBar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartItem {
    pub label: String,
    pub value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ChartItem {
    /// Largest value across all series, used to scale bars.
    pub fn max_value(items: &[ChartItem]) -> f64 {
        items
            .iter()
            .map(|item| item.value.max(item.secondary_value.unwrap_or(0.0)))
            .fold(0.0, f64::max)
    }
}

/// Partial update for a slide. `None` leaves a field untouched.
///
/// Cover-only fields are ignored on content slides and `sections` is ignored
/// on cover slides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlidePatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub sections: Option<Vec<Section>>,
    pub image_url: Option<String>,
    pub generated_image_url: Option<Option<String>>,
}

impl SlidePatch {
    pub fn generated_image(url: String) -> Self {
        Self {
            generated_image_url: Some(Some(url)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Slide {
    pub fn kind_tag(&self) -> KindTag {
        match self.kind {
            SlideKind::Cover { .. } => KindTag::Cover,
            SlideKind::Content { .. } => KindTag::Content,
        }
    }

    /// The image to show: the generated one when present.
    pub fn display_image(&self) -> &str {
        self.generated_image_url
            .as_deref()
            .unwrap_or(&self.image_url)
    }

    pub fn subtitle(&self) -> Option<&str> {
        match &self.kind {
            SlideKind::Cover { subtitle, .. } => subtitle.as_deref(),
            SlideKind::Content { .. } => None,
        }
    }

    pub fn sections(&self) -> &[Section] {
        match &self.kind {
            SlideKind::Content { sections } => sections,
            SlideKind::Cover { .. } => &[],
        }
    }

    /// Shallow-merge `patch` into this slide.
    ///
    /// A manual `image_url` edit discards any generated image.
    pub fn apply_patch(&mut self, patch: SlidePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(url) = patch.image_url {
            self.image_url = url;
            self.generated_image_url = None;
        }
        if let Some(generated) = patch.generated_image_url {
            self.generated_image_url = generated;
        }
        match &mut self.kind {
            SlideKind::Cover {
                subtitle,
                author,
                date,
            } => {
                if let Some(value) = patch.subtitle {
                    *subtitle = Some(value);
                }
                if let Some(value) = patch.author {
                    *author = Some(value);
                }
                if let Some(value) = patch.date {
                    *date = Some(value);
                }
            }
            SlideKind::Content { sections } => {
                if let Some(value) = patch.sections {
                    *sections = value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_slide() -> Slide {
        Slide {
            id: 3,
            kind: SlideKind::Content {
                sections: vec![Section {
                    heading: Some("Overview".to_string()),
                    content: SectionContent::Text {
                        text: "Body".to_string(),
                    },
                }],
            },
            title: "Scope".to_string(),
            image_url: "https://example.com/a.jpg".to_string(),
            generated_image_url: Some("data:image/png;base64,AAAA".to_string()),
        }
    }

    #[test]
    fn test_slide_json_shape() {
        let json = serde_json::to_value(content_slide()).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["type"], "content");
        assert_eq!(json["imageUrl"], "https://example.com/a.jpg");
        assert_eq!(json["generatedImageUrl"], "data:image/png;base64,AAAA");
        assert_eq!(json["sections"][0]["content"]["type"], "text");
    }

    #[test]
    fn test_cover_parses_without_optional_fields() {
        let raw = r#"{"id":0,"type":"cover","title":"Hello","imageUrl":"x"}"#;
        let slide: Slide = serde_json::from_str(raw).unwrap();
        assert_eq!(slide.kind_tag(), KindTag::Cover);
        assert_eq!(slide.subtitle(), None);
        assert!(slide.generated_image_url.is_none());
    }

    #[test]
    fn test_chart_section_parses() {
        let raw = r#"{"type":"chart","chartType":"grouped-bar","data":[
            {"label":"Europe","value":85,"secondaryValue":95,"unit":"%"},
            {"label":"SSA","value":23}
        ]}"#;
        let content: SectionContent = serde_json::from_str(raw).unwrap();
        match content {
            SectionContent::Chart { chart_type, data } => {
                assert_eq!(chart_type, ChartType::GroupedBar);
                assert_eq!(data.len(), 2);
                assert_eq!(ChartItem::max_value(&data), 95.0);
            }
            other => panic!("expected chart, got {other:?}"),
        }
    }

    #[test]
    fn test_list_and_table_are_distinct() {
        let list: SectionContent =
            serde_json::from_str(r#"{"type":"list","items":["a","b"]}"#).unwrap();
        let table: SectionContent =
            serde_json::from_str(r#"{"type":"table","rows":[{"label":"a","value":"b"}]}"#)
                .unwrap();
        assert!(matches!(list, SectionContent::List { .. }));
        assert!(matches!(table, SectionContent::Table { .. }));
    }

    #[test]
    fn test_display_image_prefers_generated() {
        let mut slide = content_slide();
        assert!(slide.display_image().starts_with("data:"));
        slide.generated_image_url = None;
        assert_eq!(slide.display_image(), "https://example.com/a.jpg");
    }

    #[test]
    fn test_manual_image_edit_clears_generated() {
        let mut slide = content_slide();
        slide.apply_patch(SlidePatch {
            image_url: Some("https://example.com/b.jpg".to_string()),
            ..SlidePatch::default()
        });
        assert_eq!(slide.image_url, "https://example.com/b.jpg");
        assert!(slide.generated_image_url.is_none());
    }

    #[test]
    fn test_generated_patch_keeps_base_image() {
        let mut slide = content_slide();
        slide.apply_patch(SlidePatch::generated_image("data:image/png;base64,BBBB".into()));
        assert_eq!(slide.image_url, "https://example.com/a.jpg");
        assert_eq!(
            slide.generated_image_url.as_deref(),
            Some("data:image/png;base64,BBBB")
        );
    }

    #[test]
    fn test_cover_fields_ignored_on_content_slide() {
        let mut slide = content_slide();
        let before = slide.clone();
        slide.apply_patch(SlidePatch {
            subtitle: Some("ignored".to_string()),
            ..SlidePatch::default()
        });
        assert_eq!(slide, before);
    }
}
