use anyhow::Context;
use eframe::egui;
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::{Duration, Instant};

use crate::chat::{self, ASSISTANT_NAME, Conversation, DEFAULT_SYSTEM_PROMPT, Role, markup};
use crate::commands::open_store;
use crate::config::Config;
use crate::deck::{self, Action, Direction};
use crate::error::ServiceError;
use crate::gemini::GeminiClient;
use crate::images::{ImageCache, ImageState};
use crate::imagegen::{GenerationEvent, ImageOrchestrator, Job, spawn_worker};
use crate::model::{ChartItem, ChartType, KindTag, Section, SectionContent, Slide, SlideKind, SlidePatch};
use crate::navigation::{AuthoringGate, Command, Key, KeyContext, PasswordOutcome, command_for};
use crate::store::{DeckStore, ImportSummary};
use crate::theme::Theme;

const TOAST_SECS: f32 = 3.0;

const KEY_MAP: &[(egui::Key, Key)] = &[
    (egui::Key::ArrowRight, Key::ArrowRight),
    (egui::Key::ArrowDown, Key::ArrowDown),
    (egui::Key::ArrowLeft, Key::ArrowLeft),
    (egui::Key::ArrowUp, Key::ArrowUp),
    (egui::Key::Space, Key::Space),
    (egui::Key::M, Key::M),
    (egui::Key::A, Key::A),
    (egui::Key::J, Key::J),
];

struct Toast {
    message: String,
    start: Instant,
}

impl Toast {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            start: Instant::now(),
        }
    }

    fn opacity(&self) -> f32 {
        let elapsed = self.start.elapsed().as_secs_f32();
        let fade_start = TOAST_SECS - 0.5;
        if elapsed < fade_start {
            1.0
        } else if elapsed < TOAST_SECS {
            1.0 - (elapsed - fade_start) / (TOAST_SECS - fade_start)
        } else {
            0.0
        }
    }

    fn is_expired(&self) -> bool {
        self.start.elapsed().as_secs_f32() >= TOAST_SECS
    }
}

/// Edit buffers for the slide manager panel.
#[derive(Default)]
struct ManagerState {
    search: String,
    /// Slide the title/image buffers were loaded from.
    editing: Option<u32>,
    title: String,
    image_url: String,
    transfer_path: String,
    confirm_reset_all: bool,
}

struct DeckApp {
    config: Config,
    store: DeckStore,
    gate: AuthoringGate,
    theme: Theme,
    toast: Option<Toast>,
    images: ImageCache,
    orchestrator: ImageOrchestrator,
    gen_tx: Sender<GenerationEvent>,
    gen_rx: Receiver<GenerationEvent>,
    conversation: Conversation,
    chat_open: bool,
    chat_input: String,
    chat_tx: Sender<Result<String, ServiceError>>,
    chat_rx: Receiver<Result<String, ServiceError>>,
    manager: ManagerState,
}

impl DeckApp {
    fn new(config: Config, store: DeckStore) -> Self {
        let (gen_tx, gen_rx) = channel();
        let (chat_tx, chat_rx) = channel();
        let conversation =
            Conversation::new(config.system_prompt().unwrap_or(DEFAULT_SYSTEM_PROMPT));
        Self {
            config,
            store,
            gate: AuthoringGate::default(),
            theme: Theme::dark(),
            toast: None,
            images: ImageCache::default(),
            orchestrator: ImageOrchestrator::default(),
            gen_tx,
            gen_rx,
            conversation,
            chat_open: false,
            chat_input: String::new(),
            chat_tx,
            chat_rx,
            manager: ManagerState {
                transfer_path: "deckhand-deck.json".to_string(),
                ..ManagerState::default()
            },
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.theme = self.theme.toggled();
        apply_visuals(ctx, &self.theme);
        self.toast = Some(Toast::new(format!("Theme: {}", self.theme.name)));
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Next => self.store.dispatch(Action::Next),
            Command::Prev => self.store.dispatch(Action::Prev),
            Command::ToggleAuthoring => {
                let was_authoring = self.gate.is_authoring();
                self.gate.request_toggle();
                if was_authoring {
                    self.toast = Some(Toast::new("Authoring mode disabled"));
                }
            }
            Command::ToggleManager => self.gate.toggle_manager(),
            Command::OpenJump => self.gate.open_jump(self.store.current()),
        }
    }

    /// Drain worker channels into the store and conversation.
    fn poll_workers(&mut self, ctx: &egui::Context) {
        for event in self.gen_rx.try_iter() {
            if let Some(message) = self.orchestrator.apply(&mut self.store, event) {
                self.toast = Some(Toast::new(message));
            }
        }
        while let Ok(reply) = self.chat_rx.try_recv() {
            self.conversation.finish_turn(reply);
        }
        self.images.poll(ctx);

        if !self.orchestrator.is_idle() || self.conversation.is_waiting() || self.images.is_loading()
        {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn generate_current(&mut self) {
        let Some(slide) = self.store.state().current_slide().cloned() else {
            return;
        };
        let client = match GeminiClient::from_config(&self.config) {
            Ok(client) => client,
            Err(e) => {
                self.toast = Some(Toast::new(e.toast()));
                return;
            }
        };
        if !self.orchestrator.begin_slide(slide.id) {
            return;
        }
        spawn_worker(
            client,
            self.config.pipeline_settings(),
            Job::Slide(slide),
            self.gen_tx.clone(),
        );
    }

    fn generate_all(&mut self) {
        let client = match GeminiClient::from_config(&self.config) {
            Ok(client) => client,
            Err(e) => {
                self.toast = Some(Toast::new(e.toast()));
                return;
            }
        };
        if !self.orchestrator.begin_batch() {
            return;
        }
        self.toast = Some(Toast::new("Generating images for all slides..."));
        spawn_worker(
            client,
            self.config.pipeline_settings(),
            Job::Batch(self.store.slides().to_vec()),
            self.gen_tx.clone(),
        );
    }

    fn send_chat(&mut self) {
        let text = std::mem::take(&mut self.chat_input);
        if !self.conversation.begin_turn(&text) {
            self.chat_input = text;
            return;
        }
        match GeminiClient::from_config(&self.config) {
            Ok(client) => {
                chat::spawn_reply(client, &self.conversation, self.chat_tx.clone());
            }
            Err(e) => {
                self.toast = Some(Toast::new(e.to_string()));
                self.conversation
                    .finish_turn(Err(ServiceError::Failed(e.to_string())));
            }
        }
    }

    fn export_to(&mut self, path: &Path, legacy: bool) {
        let result = if legacy {
            self.store.export_overrides()
        } else {
            self.store.export_snapshot()
        };
        let message = match result.and_then(|json| {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))
        }) {
            Ok(()) => format!("Exported to {}", path.display()),
            Err(e) => {
                log::warn!("Export to {} failed: {e:#}", path.display());
                format!("Export failed: {e}")
            }
        };
        self.toast = Some(Toast::new(message));
    }

    fn import_from(&mut self, path: &Path) {
        let message = match std::fs::read_to_string(path) {
            Ok(raw) => match self.store.import_snapshot(&raw) {
                Ok(ImportSummary::Deck { slides }) => {
                    format!("Configuration imported successfully! ({slides} slides)")
                }
                Ok(ImportSummary::Overrides { matched }) => {
                    format!("Configuration imported successfully! ({matched} images)")
                }
                Err(e) => {
                    log::warn!("Import from {} failed: {e}", path.display());
                    "Failed to import configuration.".to_string()
                }
            },
            Err(e) => {
                log::warn!("Cannot read {}: {e}", path.display());
                "Failed to import configuration.".to_string()
            }
        };
        self.toast = Some(Toast::new(message));
    }

    /// Reload the manager's edit buffers when the current slide changed.
    fn sync_manager_buffers(&mut self) {
        let Some(slide) = self.store.state().current_slide() else {
            return;
        };
        if self.manager.editing != Some(slide.id) {
            self.manager.editing = Some(slide.id);
            self.manager.title = slide.title.clone();
            self.manager.image_url = slide.image_url.clone();
        }
    }

    fn compute_scale(rect: egui::Rect) -> f32 {
        (rect.width() / 1280.0).min(rect.height() / 720.0).max(0.4)
    }
}

fn apply_visuals(ctx: &egui::Context, theme: &Theme) {
    ctx.set_visuals(if theme.is_dark() {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    });
}

impl eframe::App for DeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_workers(ctx);

        // Viewport commands must be sent outside the input closure
        let mut viewport_cmds: Vec<egui::ViewportCommand> = Vec::new();
        let mut commands: Vec<Command> = Vec::new();
        let mut toggle_theme = false;
        let key_ctx = KeyContext {
            text_focused: ctx.wants_keyboard_input(),
            challenge_open: self.gate.challenge().is_some(),
            authoring: self.gate.is_authoring(),
        };

        let mut submit_password = false;
        ctx.input(|i| {
            if key_ctx.challenge_open {
                for event in &i.events {
                    if let egui::Event::Text(text) = event {
                        text.chars().for_each(|ch| self.gate.challenge_keystroke(ch));
                    }
                }
                if i.key_pressed(egui::Key::Backspace) {
                    self.gate.challenge_backspace();
                }
                if i.key_pressed(egui::Key::Enter) {
                    submit_password = true;
                }
            }
            if i.key_pressed(egui::Key::Escape) {
                if self.gate.challenge().is_some() {
                    self.gate.cancel_challenge();
                } else if self.gate.is_jump_open() {
                    self.gate.cancel_jump();
                } else if self.gate.is_manager_open() {
                    self.gate.close_manager();
                }
                return;
            }
            for (egui_key, key) in KEY_MAP {
                if i.key_pressed(*egui_key) {
                    commands.extend(command_for(*key, key_ctx));
                }
            }
            if key_ctx.text_focused || key_ctx.challenge_open {
                return;
            }
            if i.key_pressed(egui::Key::Q) {
                viewport_cmds.push(egui::ViewportCommand::Close);
            }
            if i.key_pressed(egui::Key::F) {
                viewport_cmds.push(egui::ViewportCommand::Fullscreen(
                    !i.viewport().fullscreen.unwrap_or(false),
                ));
            }
            if i.key_pressed(egui::Key::D) {
                toggle_theme = true;
            }
        });

        for cmd in viewport_cmds {
            ctx.send_viewport_cmd(cmd);
        }
        for command in commands {
            self.run_command(command);
        }
        if submit_password {
            self.submit_password();
        }
        if toggle_theme {
            self.toggle_theme(ctx);
        }

        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }

        if self.gate.is_manager_open() {
            self.show_manager(ctx);
        }
        if self.gate.challenge().is_some() {
            self.show_password_dialog(ctx);
        }
        if self.gate.is_jump_open() {
            self.show_jump_dialog(ctx);
        }
        if self.chat_open {
            self.show_chat(ctx);
        }
        self.show_controls(ctx);

        let bg = self.theme.background;
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(bg).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let scale = Self::compute_scale(rect);
                self.draw_slide(ui, rect, scale);
                self.draw_chrome(ui, rect, scale);

                if let Some(ref toast) = self.toast {
                    draw_toast(ui, &self.theme, toast, rect, scale);
                    ctx.request_repaint();
                }
            });
    }
}

// Panels and dialogs
impl DeckApp {
    fn submit_password(&mut self) {
        let secret = self.config.password().to_string();
        if self.gate.submit_password(&secret) == PasswordOutcome::Accepted {
            self.toast = Some(Toast::new("Authoring mode enabled"));
        }
    }

    fn show_password_dialog(&mut self, ctx: &egui::Context) {
        let mut submit = false;
        let mut cancel = false;
        let Some(challenge) = self.gate.challenge() else {
            return;
        };
        let masked = "•".repeat(challenge.input.chars().count());
        let incorrect = challenge.incorrect;

        egui::Window::new("Authoring mode")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Enter the authoring password to edit the deck.");
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.set_min_width(240.0);
                    ui.monospace(if masked.is_empty() { " " } else { masked.as_str() });
                });
                if incorrect {
                    ui.colored_label(egui::Color32::from_rgb(0xE5, 0x48, 0x4D), "Incorrect password");
                }
                ui.horizontal(|ui| {
                    if ui.button("Unlock").clicked() {
                        submit = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if cancel {
            self.gate.cancel_challenge();
        } else if submit {
            self.submit_password();
        }
    }

    fn show_jump_dialog(&mut self, ctx: &egui::Context) {
        let mut submit = false;
        let slide_count = self.store.state().slide_count();
        let Some(input) = self.gate.jump_input_mut() else {
            return;
        };

        egui::Window::new("Go to slide")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!("Slide number (1-{slide_count})"));
                let response = ui.add(egui::TextEdit::singleline(input).desired_width(120.0));
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit = true;
                } else if !response.has_focus() {
                    response.request_focus();
                }
            });

        if submit {
            if let Some(n) = self.gate.submit_jump() {
                self.store.dispatch(Action::JumpTo(n));
            }
        }
    }

    fn show_manager(&mut self, ctx: &egui::Context) {
        self.sync_manager_buffers();
        let mut actions: Vec<Action> = Vec::new();
        let mut export: Option<bool> = None;
        let mut import = false;
        let mut generate_current = false;
        let mut generate_all = false;
        let current = self.store.current();
        let slide_count = self.store.state().slide_count();

        egui::SidePanel::right("slide_manager")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                ui.heading("Slides");
                ui.add(
                    egui::TextEdit::singleline(&mut self.manager.search)
                        .hint_text("Search slides..."),
                );
                ui.separator();

                egui::ScrollArea::vertical()
                    .id_salt("slide_list")
                    .max_height(ui.available_height() * 0.4)
                    .show(ui, |ui| {
                        let slides = self.store.slides();
                        for index in deck::search(slides, &self.manager.search) {
                            let slide = &slides[index];
                            ui.horizontal(|ui| {
                                let label = format!("{}. {}", index + 1, slide.title);
                                if ui.selectable_label(index == current, label).clicked() {
                                    actions.push(Action::GoTo(index));
                                }
                                ui.with_layout(
                                    egui::Layout::right_to_left(egui::Align::Center),
                                    |ui| {
                                        if ui
                                            .add_enabled(slide_count > 1, egui::Button::new("Del"))
                                            .clicked()
                                        {
                                            actions.push(Action::Delete(slide.id));
                                        }
                                        if ui.small_button("Dup").clicked() {
                                            actions.push(Action::Duplicate(slide.id));
                                        }
                                        if ui.small_button("↓").clicked() {
                                            actions.push(Action::Move(slide.id, Direction::Down));
                                        }
                                        if ui.small_button("↑").clicked() {
                                            actions.push(Action::Move(slide.id, Direction::Up));
                                        }
                                    },
                                );
                            });
                        }
                    });

                ui.horizontal(|ui| {
                    if ui.button("Add content slide").clicked() {
                        actions.push(Action::Add(KindTag::Content));
                    }
                    if ui.button("Add cover slide").clicked() {
                        actions.push(Action::Add(KindTag::Cover));
                    }
                });
                ui.separator();

                if let Some(slide) = self.store.state().current_slide() {
                    ui.strong(format!("Slide {} of {slide_count}", current + 1));
                    ui.label("Title");
                    ui.text_edit_singleline(&mut self.manager.title);
                    ui.label("Image URL");
                    ui.text_edit_singleline(&mut self.manager.image_url);
                    ui.horizontal(|ui| {
                        if ui.button("Apply").clicked() {
                            let patch = SlidePatch {
                                title: (self.manager.title != slide.title)
                                    .then(|| self.manager.title.clone()),
                                image_url: (self.manager.image_url != slide.image_url)
                                    .then(|| self.manager.image_url.clone()),
                                ..SlidePatch::default()
                            };
                            if !patch.is_empty() {
                                actions.push(Action::Update(slide.id, patch));
                            }
                        }
                        if ui.button("Reset slide").clicked() {
                            actions.push(Action::Reset(slide.id));
                            self.manager.editing = None;
                        }
                        if slide.generated_image_url.is_some()
                            && ui.button("Clear AI image").clicked()
                        {
                            actions.push(Action::Update(
                                slide.id,
                                SlidePatch {
                                    generated_image_url: Some(None),
                                    ..SlidePatch::default()
                                },
                            ));
                        }
                    });
                    ui.horizontal(|ui| {
                        let busy = self.orchestrator.is_generating(slide.id);
                        if ui
                            .add_enabled(!busy, egui::Button::new("Generate image"))
                            .clicked()
                        {
                            generate_current = true;
                        }
                        if ui
                            .add_enabled(
                                !self.orchestrator.is_generating_all(),
                                egui::Button::new("Generate all"),
                            )
                            .clicked()
                        {
                            generate_all = true;
                        }
                    });
                }
                ui.separator();

                ui.label("Snapshot file");
                ui.text_edit_singleline(&mut self.manager.transfer_path);
                ui.horizontal(|ui| {
                    if ui.button("Export").clicked() {
                        export = Some(false);
                    }
                    if ui.button("Export images only").clicked() {
                        export = Some(true);
                    }
                    if ui.button("Import").clicked() {
                        import = true;
                    }
                });
                ui.separator();

                if self.manager.confirm_reset_all {
                    ui.label("Reset every slide to the built-in deck?");
                    ui.horizontal(|ui| {
                        if ui.button("Confirm reset").clicked() {
                            actions.push(Action::ResetAll);
                            self.manager.confirm_reset_all = false;
                            self.manager.editing = None;
                        }
                        if ui.button("Cancel").clicked() {
                            self.manager.confirm_reset_all = false;
                        }
                    });
                } else if ui.button("Reset all slides").clicked() {
                    self.manager.confirm_reset_all = true;
                }
            });

        for action in actions {
            self.store.dispatch(action);
        }
        let path = std::path::PathBuf::from(self.manager.transfer_path.trim());
        if let Some(legacy) = export {
            self.export_to(&path, legacy);
        }
        if import {
            self.import_from(&path);
            self.manager.editing = None;
        }
        if generate_current {
            self.generate_current();
        }
        if generate_all {
            self.generate_all();
        }
    }

    fn show_chat(&mut self, ctx: &egui::Context) {
        let mut open = self.chat_open;
        let mut send = false;
        let waiting = self.conversation.is_waiting();

        egui::Window::new(ASSISTANT_NAME)
            .open(&mut open)
            .default_size([380.0, 460.0])
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("chat_transcript")
                    .stick_to_bottom(true)
                    .max_height(ui.available_height() - 40.0)
                    .show(ui, |ui| {
                        for message in self.conversation.messages() {
                            let speaker = match message.role {
                                Role::User => "You",
                                Role::Model => ASSISTANT_NAME,
                            };
                            ui.strong(speaker);
                            render_markup(ui, &message.text);
                            ui.add_space(8.0);
                        }
                        if waiting {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label("Thinking...");
                            });
                        }
                    });
                ui.separator();
                ui.horizontal(|ui| {
                    let response = ui.add_enabled(
                        !waiting,
                        egui::TextEdit::singleline(&mut self.chat_input)
                            .hint_text("Inquire about project specifics...")
                            .desired_width(ui.available_width() - 60.0),
                    );
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        send = true;
                    }
                    if ui.add_enabled(!waiting, egui::Button::new("Send")).clicked() {
                        send = true;
                    }
                });
            });

        self.chat_open = open;
        if send {
            self.send_chat();
        }
    }

    fn show_controls(&mut self, ctx: &egui::Context) {
        let mut toggle_chat = false;
        let mut generate = false;
        let busy = self
            .store
            .state()
            .current_slide()
            .is_some_and(|s| self.orchestrator.is_generating(s.id));

        egui::Area::new(egui::Id::new("viewer_controls"))
            .anchor(egui::Align2::LEFT_BOTTOM, [16.0, -16.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button(format!("Ask the {ASSISTANT_NAME}")).clicked() {
                        toggle_chat = true;
                    }
                    if self.gate.is_authoring()
                        && ui
                            .add_enabled(!busy, egui::Button::new("Generate scene"))
                            .clicked()
                    {
                        generate = true;
                    }
                });
            });

        if toggle_chat {
            self.chat_open = !self.chat_open;
        }
        if generate {
            self.generate_current();
        }
    }
}

// Slide drawing
impl DeckApp {
    fn draw_slide(&mut self, ui: &egui::Ui, rect: egui::Rect, scale: f32) {
        let Some(slide) = self.store.state().current_slide() else {
            return;
        };
        let painter = ui.painter_at(rect);
        let (image_rect, text_rect) = match slide.kind {
            SlideKind::Cover { .. } => {
                let split = rect.left() + rect.width() * 0.5;
                (
                    egui::Rect::from_min_max(rect.min, egui::pos2(split, rect.bottom())),
                    egui::Rect::from_min_max(egui::pos2(split, rect.top()), rect.max)
                        .shrink(64.0 * scale),
                )
            }
            SlideKind::Content { .. } => {
                let split = rect.left() + rect.width() * 0.62;
                (
                    egui::Rect::from_min_max(egui::pos2(split, rect.top()), rect.max),
                    egui::Rect::from_min_max(rect.min, egui::pos2(split, rect.bottom()))
                        .shrink(56.0 * scale),
                )
            }
        };

        let url = slide.display_image();
        let state = if url.is_empty() {
            ImageState::Failed
        } else {
            self.images.get(url)
        };
        draw_image(&painter, &self.theme, state, image_rect, scale);
        if self.orchestrator.is_generating(slide.id) {
            painter.rect_filled(image_rect, 0.0, Theme::with_opacity(egui::Color32::BLACK, 0.55));
            painter.text(
                image_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Generating scene...",
                egui::FontId::proportional(self.theme.heading_size * scale),
                egui::Color32::WHITE,
            );
        }

        match &slide.kind {
            SlideKind::Cover {
                subtitle,
                author,
                date,
            } => draw_cover(
                &painter,
                &self.theme,
                slide,
                subtitle.as_deref(),
                author.as_deref(),
                date.as_deref(),
                text_rect,
                scale,
            ),
            SlideKind::Content { sections } => {
                draw_content(&painter, &self.theme, slide, sections, text_rect, scale)
            }
        }
    }

    fn draw_chrome(&self, ui: &egui::Ui, rect: egui::Rect, scale: f32) {
        let count = self.store.state().slide_count();
        let current = self.store.current();

        // Progress bar
        let fraction = (current + 1) as f32 / count.max(1) as f32;
        let bar = egui::Rect::from_min_size(
            rect.min,
            egui::vec2(rect.width() * fraction, 4.0 * scale),
        );
        ui.painter().rect_filled(bar, 0.0, self.theme.accent);

        // Slide counter
        let counter_color = Theme::with_opacity(self.theme.foreground, 0.5);
        let galley = ui.painter().layout_no_wrap(
            format!("{} / {count}", current + 1),
            egui::FontId::monospace(14.0 * scale),
            counter_color,
        );
        let pos = egui::pos2(
            rect.right() - galley.rect.width() - 16.0 * scale,
            rect.bottom() - 30.0 * scale,
        );
        ui.painter().galley(pos, galley, counter_color);

        if self.gate.is_authoring() {
            let badge_color = self.theme.accent;
            let galley = ui.painter().layout_no_wrap(
                "AUTHORING  ·  A slides  ·  M exit".to_string(),
                egui::FontId::monospace(12.0 * scale),
                badge_color,
            );
            ui.painter().galley(
                egui::pos2(rect.left() + 16.0 * scale, rect.top() + 14.0 * scale),
                galley,
                badge_color,
            );
        }
    }
}

fn draw_toast(ui: &egui::Ui, theme: &Theme, toast: &Toast, rect: egui::Rect, scale: f32) {
    let opacity = toast.opacity();
    if opacity <= 0.0 {
        return;
    }
    let toast_color = Theme::with_opacity(theme.foreground, opacity * 0.9);
    let toast_bg = Theme::with_opacity(theme.panel_background, opacity * 0.9);
    let galley = ui.painter().layout_no_wrap(
        toast.message.clone(),
        egui::FontId::proportional(18.0 * scale),
        toast_color,
    );
    let padding = 16.0 * scale;
    let toast_rect = egui::Rect::from_min_size(
        egui::pos2(
            rect.center().x - galley.rect.width() / 2.0 - padding,
            rect.bottom() - 96.0 * scale,
        ),
        egui::vec2(
            galley.rect.width() + padding * 2.0,
            galley.rect.height() + padding * 2.0,
        ),
    );
    ui.painter().rect_filled(toast_rect, 8.0 * scale, toast_bg);
    let text_pos = egui::pos2(toast_rect.left() + padding, toast_rect.top() + padding);
    ui.painter().galley(text_pos, galley, toast_color);
}

fn render_markup(ui: &mut egui::Ui, text: &str) {
    for line in markup::parse(text) {
        let (prefix, spans) = match line {
            markup::Line::Blank => {
                ui.add_space(4.0);
                continue;
            }
            markup::Line::Paragraph(spans) => ("", spans),
            markup::Line::Bullet(spans) => ("• ", spans),
        };
        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing.x = 0.0;
            if !prefix.is_empty() {
                ui.label(prefix);
            }
            for span in spans {
                let text = egui::RichText::new(span.text);
                ui.label(if span.bold { text.strong() } else { text });
            }
        });
    }
}

/// UV rect that crops a texture to fill `target` while keeping its aspect.
fn cover_uv(texture: egui::Vec2, target: egui::Vec2) -> egui::Rect {
    let full = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    if texture.x <= 0.0 || texture.y <= 0.0 || target.x <= 0.0 || target.y <= 0.0 {
        return full;
    }
    let texture_aspect = texture.x / texture.y;
    let target_aspect = target.x / target.y;
    if texture_aspect > target_aspect {
        let w = target_aspect / texture_aspect;
        egui::Rect::from_min_max(egui::pos2((1.0 - w) / 2.0, 0.0), egui::pos2((1.0 + w) / 2.0, 1.0))
    } else {
        let h = texture_aspect / target_aspect;
        egui::Rect::from_min_max(egui::pos2(0.0, (1.0 - h) / 2.0), egui::pos2(1.0, (1.0 + h) / 2.0))
    }
}

fn draw_image(
    painter: &egui::Painter,
    theme: &Theme,
    state: ImageState<'_>,
    rect: egui::Rect,
    scale: f32,
) {
    let placeholder = match state {
        ImageState::Ready(texture) => {
            let uv = cover_uv(texture.size_vec2(), rect.size());
            painter.image(texture.id(), rect, uv, egui::Color32::WHITE);
            return;
        }
        ImageState::Loading => "Loading image...",
        ImageState::Failed => "Image unavailable",
    };
    painter.rect_filled(rect, 0.0, theme.panel_background);
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        placeholder,
        egui::FontId::proportional(theme.small_size * scale),
        Theme::with_opacity(theme.foreground, 0.5),
    );
}

/// Lay out wrapped text at `y` and return the y below it.
fn text_block(
    painter: &egui::Painter,
    text: String,
    size: f32,
    color: egui::Color32,
    left: f32,
    y: f32,
    width: f32,
) -> f32 {
    let galley = painter.layout(text, egui::FontId::proportional(size), color, width);
    let height = galley.rect.height();
    painter.galley(egui::pos2(left, y), galley, color);
    y + height
}

#[allow(clippy::too_many_arguments)]
fn draw_cover(
    painter: &egui::Painter,
    theme: &Theme,
    slide: &Slide,
    subtitle: Option<&str>,
    author: Option<&str>,
    date: Option<&str>,
    rect: egui::Rect,
    scale: f32,
) {
    let width = rect.width();
    let mut y = rect.top() + rect.height() * 0.2;
    painter.rect_filled(
        egui::Rect::from_min_size(egui::pos2(rect.left(), y), egui::vec2(64.0 * scale, 6.0 * scale)),
        2.0,
        theme.accent,
    );
    y += 28.0 * scale;
    y = text_block(
        painter,
        slide.title.clone(),
        theme.title_size * scale,
        theme.heading_color,
        rect.left(),
        y,
        width,
    );
    if let Some(subtitle) = subtitle {
        y += 16.0 * scale;
        y = text_block(
            painter,
            subtitle.to_string(),
            theme.heading_size * scale,
            theme.accent,
            rect.left(),
            y,
            width,
        );
    }
    y += 40.0 * scale;
    if let Some(author) = author {
        for line in author.lines().filter(|l| !l.trim().is_empty()) {
            y = text_block(
                painter,
                line.trim().to_string(),
                theme.body_size * scale,
                theme.foreground,
                rect.left(),
                y,
                width,
            ) + 6.0 * scale;
        }
    }
    if let Some(date) = date {
        y += 16.0 * scale;
        text_block(
            painter,
            date.to_string(),
            theme.small_size * scale,
            Theme::with_opacity(theme.foreground, 0.7),
            rect.left(),
            y,
            width,
        );
    }
}

fn draw_content(
    painter: &egui::Painter,
    theme: &Theme,
    slide: &Slide,
    sections: &[Section],
    rect: egui::Rect,
    scale: f32,
) {
    let left = rect.left();
    let width = rect.width();
    let mut y = text_block(
        painter,
        slide.title.clone(),
        theme.title_size * 0.75 * scale,
        theme.heading_color,
        left,
        rect.top(),
        width,
    ) + 28.0 * scale;

    for section in sections {
        if let Some(heading) = &section.heading {
            y = text_block(
                painter,
                heading.to_uppercase(),
                theme.small_size * scale,
                theme.accent,
                left,
                y,
                width,
            ) + 8.0 * scale;
        }
        y = draw_section_content(painter, theme, &section.content, left, y, width, scale);
        y += 24.0 * scale;
    }
}

fn draw_section_content(
    painter: &egui::Painter,
    theme: &Theme,
    content: &SectionContent,
    left: f32,
    mut y: f32,
    width: f32,
    scale: f32,
) -> f32 {
    let body = theme.body_size * scale;
    match content {
        SectionContent::Text { text } => {
            text_block(painter, text.clone(), body, theme.foreground, left, y, width)
        }
        SectionContent::List { items } => {
            for item in items {
                painter.circle_filled(
                    egui::pos2(left + 5.0 * scale, y + body * 0.6),
                    3.0 * scale,
                    theme.accent,
                );
                y = text_block(
                    painter,
                    item.clone(),
                    body,
                    theme.foreground,
                    left + 18.0 * scale,
                    y,
                    width - 18.0 * scale,
                ) + 6.0 * scale;
            }
            y
        }
        SectionContent::Table { rows } => {
            let label_width = width * 0.45;
            for row in rows {
                let label_end = text_block(
                    painter,
                    row.label.clone(),
                    body,
                    Theme::with_opacity(theme.foreground, 0.75),
                    left,
                    y,
                    label_width,
                );
                let value_end = text_block(
                    painter,
                    row.value.clone(),
                    body,
                    theme.heading_color,
                    left + label_width + 12.0 * scale,
                    y,
                    width - label_width - 12.0 * scale,
                );
                y = label_end.max(value_end) + 6.0 * scale;
                painter.hline(
                    left..=left + width,
                    y,
                    egui::Stroke::new(1.0, Theme::with_opacity(theme.foreground, 0.15)),
                );
                y += 6.0 * scale;
            }
            y
        }
        SectionContent::Chart { chart_type, data } => {
            draw_chart(painter, theme, *chart_type, data, left, y, width, scale)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_chart(
    painter: &egui::Painter,
    theme: &Theme,
    chart_type: ChartType,
    data: &[ChartItem],
    left: f32,
    mut y: f32,
    width: f32,
    scale: f32,
) -> f32 {
    let max = ChartItem::max_value(data).max(f64::EPSILON);
    let label_width = width * 0.3;
    let bar_left = left + label_width + 8.0 * scale;
    let bar_space = width * 0.5;
    let row_height = 24.0 * scale;
    let small = egui::FontId::proportional(theme.small_size * scale);

    for item in data {
        let label = painter.layout(
            item.label.clone(),
            small.clone(),
            theme.foreground,
            label_width,
        );
        painter.galley(egui::pos2(left, y + 2.0 * scale), label, theme.foreground);

        let bar_width = |value: f64| (value / max) as f32 * bar_space;
        let mut value_text = format_value(item.value, item.unit.as_deref());
        let end = match (chart_type, item.secondary_value) {
            (ChartType::GroupedBar, Some(secondary)) => {
                let half = (row_height - 6.0 * scale) / 2.0;
                let first = egui::Rect::from_min_size(
                    egui::pos2(bar_left, y + 3.0 * scale),
                    egui::vec2(bar_width(item.value), half),
                );
                let second = egui::Rect::from_min_size(
                    egui::pos2(bar_left, first.bottom()),
                    egui::vec2(bar_width(secondary), half),
                );
                painter.rect_filled(first, 2.0, theme.accent);
                painter.rect_filled(second, 2.0, theme.accent_secondary);
                value_text = format!(
                    "{} / {}",
                    value_text,
                    format_value(secondary, item.unit.as_deref())
                );
                first.right().max(second.right())
            }
            _ => {
                let bar = egui::Rect::from_min_size(
                    egui::pos2(bar_left, y + 4.0 * scale),
                    egui::vec2(bar_width(item.value), row_height - 8.0 * scale),
                );
                painter.rect_filled(bar, 3.0, theme.accent);
                bar.right()
            }
        };
        painter.text(
            egui::pos2(end + 6.0 * scale, y + row_height / 2.0),
            egui::Align2::LEFT_CENTER,
            value_text,
            small.clone(),
            theme.heading_color,
        );
        y += row_height + 6.0 * scale;
    }
    y
}

/// Chart value label: whole numbers without decimals, unit appended.
fn format_value(value: f64, unit: Option<&str>) -> String {
    let number = if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    };
    match unit {
        Some(unit) => format!("{number}{unit}"),
        None => number,
    }
}

pub fn run(windowed: bool, start_slide: Option<usize>) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let mut store = open_store(&config)?;
    if let Some(n) = start_slide {
        store.dispatch(Action::JumpTo(n));
    }

    let title = "Deckhand";
    let viewport = if windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(title)
    };

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        title,
        options,
        Box::new(move |cc| {
            let app = DeckApp::new(config, store);
            apply_visuals(&cc.egui_ctx, &app.theme);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
