use eframe::egui::Color32;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub background: Color32,
    pub foreground: Color32,
    pub heading_color: Color32,
    pub accent: Color32,
    pub panel_background: Color32,
    /// Second series in grouped bar charts.
    pub accent_secondary: Color32,
    pub title_size: f32,
    pub heading_size: f32,
    pub body_size: f32,
    pub small_size: f32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            background: Color32::from_rgb(0x12, 0x18, 0x26),
            foreground: Color32::from_rgb(0xC8, 0xCE, 0xD8),
            heading_color: Color32::WHITE,
            accent: Color32::from_rgb(0x5C, 0xB8, 0xFF),
            panel_background: Color32::from_rgb(0x1E, 0x26, 0x36),
            accent_secondary: Color32::from_rgb(0x5C, 0xDB, 0x95),
            title_size: 44.0,
            heading_size: 22.0,
            body_size: 17.0,
            small_size: 13.0,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            background: Color32::WHITE,
            foreground: Color32::from_rgb(0x33, 0x41, 0x55),
            heading_color: Color32::from_rgb(0x0F, 0x17, 0x2A),
            accent: Color32::from_rgb(0x25, 0x63, 0xEB),
            panel_background: Color32::from_rgb(0xF1, 0xF5, 0xF9),
            accent_secondary: Color32::from_rgb(0x1E, 0x8A, 0x5A),
            title_size: 44.0,
            heading_size: 22.0,
            body_size: 17.0,
            small_size: 13.0,
        }
    }

    pub fn toggled(&self) -> Self {
        if self.name == "dark" {
            Self::light()
        } else {
            Self::dark()
        }
    }

    pub fn is_dark(&self) -> bool {
        self.name == "dark"
    }

    /// Apply opacity to a color
    pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
        Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), (opacity * 255.0) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_roundtrip() {
        let light = Theme::light();
        assert!(light.toggled().is_dark());
        assert!(!light.toggled().toggled().is_dark());
    }

    #[test]
    fn test_with_opacity() {
        let c = Theme::with_opacity(Color32::from_rgb(10, 20, 30), 0.5);
        assert_eq!(c.a(), 127);
    }
}
