//! AI image generation for slides.
//!
//! The pipeline runs synchronously against an [`ImageGenerator`] and reports
//! progress as [`GenerationEvent`]s. The [`ImageOrchestrator`] owns the
//! "is generating" flags and applies those events to the deck store, either
//! inline (CLI) or as they arrive from a worker thread (viewer).

pub mod prompt;
pub mod retry;

use std::collections::BTreeSet;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::deck::Action;
use crate::error::{GenerationError, ServiceError};
use crate::model::{Slide, SlidePatch};
use crate::store::DeckStore;
use retry::{RetryPolicy, Sleeper, ThreadSleeper};

pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: String,
}

/// Base64-encoded image returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn data_uri(&self) -> String {
        let mime = if self.mime_type.is_empty() {
            "image/png"
        } else {
            &self.mime_type
        };
        format!("data:{mime};base64,{}", self.data)
    }
}

/// Remote image model.
pub trait ImageGenerator {
    fn generate(&self, request: &ImageRequest) -> Result<Vec<InlineImage>, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Started {
        slide_id: u32,
    },
    Retrying {
        slide_id: u32,
        attempt: u32,
        delay: Duration,
    },
    Finished {
        slide_id: u32,
        result: Result<String, GenerationError>,
    },
    BatchFinished(BatchReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub generated: usize,
    pub skipped: usize,
    pub failed: Vec<(u32, GenerationError)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub policy: RetryPolicy,
    pub aspect_ratio: String,
    /// Pause between consecutive slides of a batch.
    pub batch_pause: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            batch_pause: Duration::from_secs(1),
        }
    }
}

pub struct ImagePipeline<'a> {
    generator: &'a dyn ImageGenerator,
    sleeper: &'a dyn Sleeper,
    settings: PipelineSettings,
}

impl<'a> ImagePipeline<'a> {
    pub fn new(
        generator: &'a dyn ImageGenerator,
        sleeper: &'a dyn Sleeper,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            sleeper,
            settings,
        }
    }

    /// Generate a scene image for `slide` and return it as a data URI.
    ///
    /// Rate limits are retried per the policy; other failures are terminal.
    /// Emits `Started`, any `Retrying`, then `Finished`.
    pub fn generate_scene_image(
        &self,
        slide: &Slide,
        on_event: &mut dyn FnMut(GenerationEvent),
    ) -> Result<String, GenerationError> {
        let slide_id = slide.id;
        on_event(GenerationEvent::Started { slide_id });

        let request = ImageRequest {
            prompt: prompt::scene_prompt(slide),
            aspect_ratio: self.settings.aspect_ratio.clone(),
        };
        log::debug!("Generating image for slide {slide_id}");

        let outcome = retry::run(
            self.settings.policy,
            self.sleeper,
            |attempt| {
                log::debug!("Image attempt {} for slide {slide_id}", attempt + 1);
                self.generator.generate(&request)
            },
            ServiceError::is_rate_limited,
            |attempt, delay| {
                on_event(GenerationEvent::Retrying {
                    slide_id,
                    attempt: attempt + 1,
                    delay,
                })
            },
        );

        let result = match outcome {
            Ok(parts) => parts
                .first()
                .map(InlineImage::data_uri)
                .ok_or(GenerationError::NoImageData),
            Err(ServiceError::RateLimited(msg)) => {
                log::warn!("Quota exhausted for slide {slide_id}: {msg}");
                Err(GenerationError::QuotaExhausted)
            }
            Err(ServiceError::Failed(msg)) => {
                log::warn!("Image generation failed for slide {slide_id}: {msg}");
                Err(GenerationError::Service(msg))
            }
        };

        on_event(GenerationEvent::Finished {
            slide_id,
            result: result.clone(),
        });
        result
    }

    /// Generate images for every slide that has none yet, one at a time.
    ///
    /// Per-slide failures are collected into the report and never abort the
    /// batch. Emits `BatchFinished` last.
    pub fn generate_batch(
        &self,
        slides: &[Slide],
        on_event: &mut dyn FnMut(GenerationEvent),
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut first = true;
        for slide in slides {
            if slide.generated_image_url.is_some() {
                report.skipped += 1;
                continue;
            }
            if !first {
                self.sleeper.sleep(self.settings.batch_pause);
            }
            first = false;
            match self.generate_scene_image(slide, on_event) {
                Ok(_) => report.generated += 1,
                Err(e) => report.failed.push((slide.id, e)),
            }
        }
        on_event(GenerationEvent::BatchFinished(report.clone()));
        report
    }
}

/// Work handed to a background generation thread.
#[derive(Debug, Clone)]
pub enum Job {
    Slide(Slide),
    Batch(Vec<Slide>),
}

/// Run `job` on a new thread, streaming events over `tx`.
pub fn spawn_worker<G>(
    generator: G,
    settings: PipelineSettings,
    job: Job,
    tx: Sender<GenerationEvent>,
) -> JoinHandle<()>
where
    G: ImageGenerator + Send + 'static,
{
    std::thread::spawn(move || {
        let pipeline = ImagePipeline::new(&generator, &ThreadSleeper, settings);
        let mut send = |event: GenerationEvent| {
            // The receiver is gone when the viewer closed; nothing to report to.
            let _ = tx.send(event);
        };
        match job {
            Job::Slide(slide) => {
                let _ = pipeline.generate_scene_image(&slide, &mut send);
            }
            Job::Batch(slides) => {
                pipeline.generate_batch(&slides, &mut send);
            }
        }
    })
}

/// Generation flags and event application.
#[derive(Debug, Default)]
pub struct ImageOrchestrator {
    generating: BTreeSet<u32>,
    generating_all: bool,
}

impl ImageOrchestrator {
    pub fn is_generating(&self, slide_id: u32) -> bool {
        self.generating.contains(&slide_id)
    }

    pub fn is_generating_all(&self) -> bool {
        self.generating_all
    }

    pub fn is_idle(&self) -> bool {
        self.generating.is_empty() && !self.generating_all
    }

    /// Mark a slide as generating before its worker starts. Returns `false`
    /// when that slide is already being generated.
    pub fn begin_slide(&mut self, slide_id: u32) -> bool {
        self.generating.insert(slide_id)
    }

    /// Claim the batch flag. Returns `false` when a batch is already running.
    pub fn begin_batch(&mut self) -> bool {
        if self.generating_all {
            return false;
        }
        self.generating_all = true;
        true
    }

    /// Apply one pipeline event. Returns a toast message, if any.
    ///
    /// A finished image is written to the slide by id; if that slide was
    /// deleted meanwhile the write is dropped.
    pub fn apply(&mut self, store: &mut DeckStore, event: GenerationEvent) -> Option<String> {
        match event {
            GenerationEvent::Started { slide_id } => {
                self.generating.insert(slide_id);
                None
            }
            GenerationEvent::Retrying {
                slide_id,
                attempt,
                delay,
            } => {
                log::info!("Slide {slide_id} rate limited; retry {attempt} in {delay:?}");
                Some(format!(
                    "Quota reached. Retrying in {}s...",
                    delay.as_secs()
                ))
            }
            GenerationEvent::Finished { slide_id, result } => {
                self.generating.remove(&slide_id);
                match result {
                    Ok(url) => {
                        store.dispatch(Action::Update(slide_id, SlidePatch::generated_image(url)));
                        None
                    }
                    Err(e) => Some(e.toast()),
                }
            }
            GenerationEvent::BatchFinished(report) => {
                log::info!(
                    "Batch finished: {} generated, {} skipped, {} failed",
                    report.generated,
                    report.skipped,
                    report.failed.len()
                );
                self.generating_all = false;
                None
            }
        }
    }

    /// Generate the image for the slide at `index`, applying the result.
    pub fn generate_image_for(
        &mut self,
        store: &mut DeckStore,
        index: usize,
        pipeline: &ImagePipeline<'_>,
        notify: &mut dyn FnMut(String),
    ) -> Result<String, GenerationError> {
        let slide = store
            .slides()
            .get(index)
            .cloned()
            .ok_or(GenerationError::NoSuchSlide(index))?;
        if self.is_generating(slide.id) {
            return Err(GenerationError::Busy);
        }
        pipeline.generate_scene_image(&slide, &mut |event| {
            if let Some(message) = self.apply(store, event) {
                notify(message);
            }
        })
    }

    /// Generate images for every slide lacking one.
    ///
    /// Refused with `Busy` while another batch holds the flag.
    pub fn generate_all_images(
        &mut self,
        store: &mut DeckStore,
        pipeline: &ImagePipeline<'_>,
        notify: &mut dyn FnMut(String),
    ) -> Result<BatchReport, GenerationError> {
        if !self.begin_batch() {
            return Err(GenerationError::Busy);
        }
        let slides = store.slides().to_vec();
        Ok(pipeline.generate_batch(&slides, &mut |event| {
            if let Some(message) = self.apply(store, event) {
                notify(message);
            }
        }))
    }
}
