//! Slide image loading for the viewer.
//!
//! Data URIs are decoded inline; remote URLs are fetched on a worker thread
//! and uploaded as textures when they arrive.

use anyhow::{Context, Result};
use base64::Engine;
use eframe::egui;
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Decode a `data:<mime>;base64,<payload>` URI into raw bytes.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow::anyhow!("Not a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("Data URI has no payload"))?;
    if !meta.ends_with(";base64") {
        anyhow::bail!("Only base64 data URIs are supported");
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .context("Failed to decode base64 image data")
}

fn fetch(url: &str) -> Result<Vec<u8>> {
    if url.starts_with("data:") {
        return decode_data_uri(url);
    }
    let bytes = ureq::get(url)
        .call()
        .with_context(|| format!("Failed to fetch {url}"))?
        .body_mut()
        .read_to_vec()
        .with_context(|| format!("Failed to read {url}"))?;
    Ok(bytes)
}

fn to_color_image(bytes: &[u8]) -> Result<egui::ColorImage> {
    let image = image::load_from_memory(bytes)
        .context("Unsupported image format")?
        .into_rgba8();
    let (w, h) = image.dimensions();
    Ok(egui::ColorImage::from_rgba_unmultiplied(
        [w as usize, h as usize],
        &image.into_raw(),
    ))
}

enum Slot {
    Loading,
    Ready(egui::TextureHandle),
    Failed,
}

pub enum ImageState<'a> {
    Loading,
    Ready(&'a egui::TextureHandle),
    Failed,
}

type Loaded = (String, Result<egui::ColorImage, String>);

pub struct ImageCache {
    slots: HashMap<String, Slot>,
    tx: Sender<Loaded>,
    rx: Receiver<Loaded>,
}

impl Default for ImageCache {
    fn default() -> Self {
        let (tx, rx) = channel();
        Self {
            slots: HashMap::new(),
            tx,
            rx,
        }
    }
}

impl ImageCache {
    /// Upload any images finished by workers.
    pub fn poll(&mut self, ctx: &egui::Context) {
        while let Ok((url, result)) = self.rx.try_recv() {
            let slot = match result {
                Ok(image) => Slot::Ready(ctx.load_texture(
                    format!("slide-image-{}", self.slots.len()),
                    image,
                    egui::TextureOptions::LINEAR,
                )),
                Err(e) => {
                    log::warn!("{e}");
                    Slot::Failed
                }
            };
            self.slots.insert(url, slot);
        }
    }

    pub fn is_loading(&self) -> bool {
        self.slots.values().any(|s| matches!(s, Slot::Loading))
    }

    /// Current state for `url`, starting a background load on first use.
    pub fn get(&mut self, url: &str) -> ImageState<'_> {
        if !self.slots.contains_key(url) {
            self.slots.insert(url.to_string(), Slot::Loading);
            let tx = self.tx.clone();
            let url = url.to_string();
            std::thread::spawn(move || {
                let result = fetch(&url)
                    .and_then(|bytes| to_color_image(&bytes))
                    .map_err(|e| format!("Failed to load slide image: {e:#}"));
                let _ = tx.send((url, result));
            });
        }
        match self.slots.get(url) {
            Some(Slot::Ready(texture)) => ImageState::Ready(texture),
            Some(Slot::Failed) => ImageState::Failed,
            _ => ImageState::Loading,
        }
    }
}
