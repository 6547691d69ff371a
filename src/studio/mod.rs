use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{info, warn};

use crate::config::Settings;
use crate::generate::{GenerationResult, Severity, generate};
use crate::input::{BackendChoice, CREDENTIAL_HELP, DESCRIPTION_PLACEHOLDER, GenerationInput};
use crate::model::OpenAiProvider;
use crate::present::{DIAGRAM_HEADING, LINK_LABEL, Presentation, REASONING_HEADING};

pub mod events;

use self::events::{StudioCommand, StudioEvent, StudioNotice};

const APP_TITLE: &str = "AI Architect - Sequence Diagram Generator";

pub fn run_studio(settings: &Settings) -> Result<()> {
    let runtime_handle = Handle::try_current().context("studio requires a tokio runtime")?;
    let output_dir =
        std::env::current_dir().context("failed to resolve output directory for studio")?;

    let (command_tx, command_rx) = unbounded_channel::<StudioCommand>();
    let (event_tx, event_rx) = unbounded_channel::<StudioEvent>();

    spawn_runtime_worker(&runtime_handle, settings.clone(), command_rx, event_tx);
    info!(
        model = %settings.model,
        output_dir = %output_dir.display(),
        "starting native studio shell"
    );

    eframe::run_native(
        APP_TITLE,
        eframe::NativeOptions::default(),
        Box::new(move |_cc| Ok(Box::new(StudioApp::new(command_tx, event_rx, output_dir)))),
    )
    .map_err(|error| anyhow::anyhow!("studio UI exited with error: {error}"))
}

fn spawn_runtime_worker(
    handle: &Handle,
    settings: Settings,
    mut command_rx: UnboundedReceiver<StudioCommand>,
    event_tx: UnboundedSender<StudioEvent>,
) {
    let provider = OpenAiProvider::new(&settings);
    let _task = handle.spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match command {
                StudioCommand::Generate { input } => {
                    if event_tx
                        .send(StudioEvent::GenerationStarted {
                            started_at: SystemTime::now(),
                        })
                        .is_err()
                    {
                        break;
                    }

                    let event = match generate(&input, &provider, &settings.model).await {
                        Ok(result) => StudioEvent::GenerationCompleted {
                            result,
                            show_reasoning: input.show_reasoning,
                        },
                        Err(error) => StudioEvent::GenerationFailed {
                            notice: StudioNotice::from(&error),
                        },
                    };
                    if event_tx.send(event).is_err() {
                        break;
                    }
                }
                StudioCommand::Shutdown => break,
            }
        }
    });
}

struct StudioApp {
    command_tx: UnboundedSender<StudioCommand>,
    event_rx: UnboundedReceiver<StudioEvent>,
    output_dir: PathBuf,
    backend: BackendChoice,
    api_key: String,
    description: String,
    show_reasoning: bool,
    result: Option<(GenerationResult, bool)>,
    notice: Option<StudioNotice>,
    status: String,
    generation_in_flight: bool,
    runtime_disconnected: bool,
}

impl StudioApp {
    fn new(
        command_tx: UnboundedSender<StudioCommand>,
        event_rx: UnboundedReceiver<StudioEvent>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            command_tx,
            event_rx,
            output_dir,
            backend: BackendChoice::default(),
            api_key: String::new(),
            description: String::new(),
            show_reasoning: false,
            result: None,
            notice: None,
            status: "Idle".to_owned(),
            generation_in_flight: false,
            runtime_disconnected: false,
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.runtime_disconnected {
                        warn!("studio runtime worker disconnected");
                        self.notice = Some(StudioNotice {
                            severity: Severity::Error,
                            message: "Runtime worker disconnected. Restart studio to continue."
                                .to_owned(),
                        });
                    }
                    self.runtime_disconnected = true;
                    self.generation_in_flight = false;
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: StudioEvent) {
        match event {
            StudioEvent::GenerationStarted { started_at } => {
                self.generation_in_flight = true;
                let _ = started_at;
                self.status = "Generating...".to_owned();
            }
            StudioEvent::GenerationCompleted {
                result,
                show_reasoning,
            } => {
                self.generation_in_flight = false;
                self.result = Some((result, show_reasoning));
                self.status = "Idle".to_owned();
            }
            StudioEvent::GenerationFailed { notice } => {
                self.generation_in_flight = false;
                self.status = "Generation failed".to_owned();
                self.notice = Some(notice);
            }
        }
    }

    fn submit(&mut self) {
        let input = GenerationInput::collect(
            self.backend,
            &self.api_key,
            self.description.clone(),
            self.show_reasoning,
        );

        // The previous result is discarded as soon as a new generation starts.
        self.result = None;
        self.notice = None;
        self.generation_in_flight = true;
        self.status = "Queued...".to_owned();

        if let Err(error) = self.command_tx.send(StudioCommand::Generate { input }) {
            self.generation_in_flight = false;
            self.runtime_disconnected = true;
            self.status = "Runtime disconnected".to_owned();
            self.notice = Some(StudioNotice {
                severity: Severity::Error,
                message: format!("Failed to submit generation to runtime worker: {error}"),
            });
        }
    }

    fn render_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        egui::ComboBox::from_label("LLM backend")
            .selected_text(self.backend.label())
            .show_ui(ui, |ui| {
                for choice in BackendChoice::ALL {
                    ui.selectable_value(&mut self.backend, choice, choice.label());
                }
            });

        if self.backend.requires_credential() {
            ui.add_space(8.0);
            ui.label("OpenAI API Key");
            ui.add(egui::TextEdit::singleline(&mut self.api_key).password(true))
                .on_hover_text(CREDENTIAL_HELP);
        }
    }

    fn render_main(&mut self, ui: &mut egui::Ui) {
        ui.heading("Software Architect AI Agent");
        ui.label(
            "Enter any system or feature description below. The agent will think through the logic and generate sequencediagram.org code for you.",
        );
        ui.separator();

        ui.label("System / Feature description");
        ui.add(
            egui::TextEdit::multiline(&mut self.description)
                .hint_text(DESCRIPTION_PLACEHOLDER)
                .desired_rows(10)
                .desired_width(f32::INFINITY),
        );
        ui.checkbox(
            &mut self.show_reasoning,
            "Show agent reasoning (extra API cost)",
        );

        let can_generate = !self.generation_in_flight && !self.runtime_disconnected;
        if ui
            .add_enabled(can_generate, egui::Button::new("Generate Diagram"))
            .clicked()
        {
            self.submit();
        }
        ui.label(format!("Status: {}", self.status));

        if let Some(notice) = &self.notice {
            match notice.severity {
                Severity::Info => {
                    ui.label(&notice.message);
                }
                Severity::Warning => {
                    ui.colored_label(egui::Color32::from_rgb(140, 84, 0), &notice.message);
                }
                Severity::Error => {
                    ui.colored_label(egui::Color32::from_rgb(173, 33, 33), &notice.message);
                }
            }
        }

        let Some((result, show_reasoning)) = &self.result else {
            return;
        };
        let presentation = Presentation::new(result, *show_reasoning);
        let mut save_requested = false;

        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| {
            if let Some(reasoning) = presentation.reasoning {
                egui::CollapsingHeader::new(REASONING_HEADING).show(ui, |ui| {
                    ui.label(reasoning);
                });
            }

            ui.label(egui::RichText::new(DIAGRAM_HEADING).strong());
            let mut markup = presentation.diagram_markup;
            ui.add(
                egui::TextEdit::multiline(&mut markup)
                    .code_editor()
                    .desired_width(f32::INFINITY),
            );

            ui.horizontal(|ui| {
                if ui.button("Download diagram code").clicked() {
                    save_requested = true;
                }
                if ui.button("Copy").clicked() {
                    ui.ctx().copy_text(presentation.diagram_markup.to_owned());
                }
            });
            ui.hyperlink_to(LINK_LABEL, &presentation.link);
        });

        if save_requested {
            let download = presentation.download();
            let path = self.output_dir.join(download.file_name);
            let notice = match download.save_to(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "saved diagram code");
                    StudioNotice {
                        severity: Severity::Info,
                        message: format!("Saved diagram code to {}", path.display()),
                    }
                }
                Err(error) => StudioNotice {
                    severity: Severity::Error,
                    message: format!("{error:#}"),
                },
            };
            self.notice = Some(notice);
        }
    }
}

impl Drop for StudioApp {
    fn drop(&mut self) {
        let _ = self.command_tx.send(StudioCommand::Shutdown);
    }
}

impl eframe::App for StudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::SidePanel::left("studio_settings_pane")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| self.render_sidebar(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.render_main(ui));

        ctx.request_repaint_after(Duration::from_millis(120));
    }
}
