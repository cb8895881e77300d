//! Desktop front-end for the yt-dlp command-line downloader

// Turns form options into yt-dlp arguments
mod command;
// Last-used folder persistence
mod config;
// Worker task that owns the yt-dlp process
mod downloader;
// Error types
mod error;
// Request, format and outcome types
mod model;
// Progress parsing utilities
mod progress;
// Single-download controller used by the UI
mod supervisor;

// Form path and repaint interval
use std::{path::PathBuf, time::Duration};

// Saved folder and startup default
use config::{FolderStore, default_destination};
// Worker events and yt-dlp lookup
use downloader::{WorkerEvent, find_executable};
// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{Color32, RichText, TextStyle, Visuals};
use error::DownloadError;
use model::{AudioFormat, DownloadRequest, OutputLine, OutputStream, VideoFormat};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// Native folder picker and error dialogs
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use supervisor::{StopRequest, Supervisor};
// Runtime that hosts the download worker
use tokio::runtime::{Handle, Runtime};
use tracing::{error, info};

// Tokio runtime hosting the download worker, created once at startup
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Program entry point: initializes logging and the runtime, then launches the GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let runtime = RUNTIME.get_or_try_init(Runtime::new)?;
    let handle = runtime.handle().clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("yt-dlp GUI")
            .with_inner_size([700.0, 650.0]),
        ..Default::default()
    };
    eframe::run_native(
        "yt-dlp GUI",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(YtDlpApp::new(handle))
        }),
    )?;
    Ok(())
}

/// Kind of entry in the output view
#[derive(Clone, Copy, PartialEq, Eq)]
enum LogKind {
    /// Messages from the front-end itself
    Status,
    Stdout,
    Stderr,
}

struct LogEntry {
    kind: LogKind,
    text: String,
}

/// Application state for the GUI
struct YtDlpApp {
    /// Input field for the media URL
    url_input: String,
    /// Destination folder text field
    destination: String,
    /// "Audio only" checkbox
    audio_only: bool,
    /// Audio format dropdown
    audio_format: AudioFormat,
    /// Video format field, free text with presets
    video_format: String,
    /// "Download subtitles" checkbox
    subtitles: bool,
    /// "Download auto-generated subtitles" checkbox
    auto_subtitles: bool,
    /// Owner of the running download, if any
    supervisor: Supervisor,
    /// Lines shown in the output view
    output: Vec<LogEntry>,
    /// Last parsed progress fraction; `None` shows an animated bar
    progress: Option<f32>,
    /// Stop was pressed for the current run
    stop_requested: bool,
}

impl YtDlpApp {
    fn new(runtime: Handle) -> Self {
        let store = FolderStore::in_home();
        let destination = default_destination(&store);
        let program = find_executable();
        match &program {
            Some(path) => info!("using {}", path.display()),
            None => {
                let err = DownloadError::ExecutableNotFound("yt-dlp".to_string());
                error!("{err}");
                show_error(&err);
            }
        }

        Self {
            url_input: String::new(),
            destination: destination.display().to_string(),
            audio_only: false,
            audio_format: AudioFormat::Best,
            video_format: "best".to_string(),
            subtitles: false,
            auto_subtitles: false,
            supervisor: Supervisor::new(runtime, program, store),
            output: Vec::new(),
            progress: None,
            stop_requested: false,
        }
    }

    /// Snapshot of the form as a download request
    fn request(&self) -> DownloadRequest {
        DownloadRequest {
            url: self.url_input.trim().to_string(),
            destination: PathBuf::from(self.destination.trim()),
            audio_only: self.audio_only,
            audio_format: self.audio_format,
            video_format: VideoFormat::parse(&self.video_format),
            subtitles: self.subtitles,
            auto_subtitles: self.auto_subtitles,
        }
    }

    fn push(&mut self, kind: LogKind, text: impl AsRef<str>) {
        self.output.extend(log_entries(kind, text.as_ref()));
    }

    fn start_download(&mut self) {
        let request = self.request();
        match self.supervisor.start(&request) {
            Ok(args) => {
                self.output.clear();
                self.progress = None;
                self.stop_requested = false;
                if let Some(program) = self.supervisor.program() {
                    let line = command::command_line(program, &args);
                    self.push(LogKind::Status, format!("Running:\n{line}\n"));
                }
            }
            Err(err) => show_error(&err),
        }
    }

    fn stop_download(&mut self) {
        match self.supervisor.stop() {
            StopRequest::Requested => {
                self.stop_requested = true;
                self.push(LogKind::Status, "--- Attempting to stop... ---");
            }
            StopRequest::AlreadyRequested => self.stop_requested = true,
            StopRequest::NothingToStop => {
                self.push(LogKind::Status, "--- No active process to stop ---")
            }
        }
    }

    /// Applies everything the worker reported since the last frame
    fn drain_events(&mut self) {
        for event in self.supervisor.poll() {
            match event {
                WorkerEvent::Output(OutputLine { stream, text }) => {
                    if let Some(fraction) = progress::parse_progress_from_line(&text) {
                        self.progress = Some(fraction);
                    }
                    let kind = match stream {
                        OutputStream::Stdout => LogKind::Stdout,
                        OutputStream::Stderr => LogKind::Stderr,
                    };
                    self.push(kind, text);
                }
                WorkerEvent::Stopping => {
                    self.push(LogKind::Status, "--- Termination signal sent ---")
                }
                WorkerEvent::Finished(outcome) => {
                    self.push(LogKind::Status, format!("\n{}", outcome.summary()));
                    self.progress = None;
                    self.stop_requested = false;
                }
            }
        }
    }

    fn options_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.audio_only, "Audio only");
            ui.add_space(20.0);
            ui.label("Audio format:");
            egui::ComboBox::from_id_source("audio_format")
                .selected_text(self.audio_format.to_string())
                .show_ui(ui, |ui| {
                    for format in AudioFormat::ALL {
                        ui.selectable_value(&mut self.audio_format, format, format.to_string());
                    }
                });
        });
        ui.horizontal(|ui| {
            ui.label("Video format/container:");
            ui.add(egui::TextEdit::singleline(&mut self.video_format).desired_width(220.0));
            egui::ComboBox::from_id_source("video_format_presets")
                .selected_text("Presets")
                .show_ui(ui, |ui| {
                    for preset in VideoFormat::PRESETS {
                        if ui.selectable_label(self.video_format == preset, preset).clicked() {
                            self.video_format = preset.to_string();
                        }
                    }
                });
        });
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.subtitles, "Download subtitles");
            ui.add_space(20.0);
            ui.checkbox(&mut self.auto_subtitles, "Download auto-generated subtitles");
        });
    }

    fn output_ui(&self, ui: &mut egui::Ui) {
        let row_height = ui.text_style_height(&TextStyle::Monospace);
        // Only the visible rows are laid out; every entry is a single line.
        egui::ScrollArea::both()
            .auto_shrink([false; 2])
            .stick_to_bottom(true)
            .show_rows(ui, row_height, self.output.len(), |ui, rows| {
                for entry in &self.output[rows] {
                    ui.add(egui::Label::new(entry_text(entry)).wrap(false));
                }
            });
    }
}

/// Splits `text` into one entry per line so every row has the same height
fn log_entries(kind: LogKind, text: &str) -> impl Iterator<Item = LogEntry> + '_ {
    text.lines().map(move |line| LogEntry {
        kind,
        text: line.to_string(),
    })
}

fn entry_text(entry: &LogEntry) -> RichText {
    let text = match entry.kind {
        LogKind::Stderr => {
            RichText::new(format!("ERROR: {}", entry.text)).color(Color32::LIGHT_RED)
        }
        LogKind::Status => RichText::new(&entry.text).color(Color32::LIGHT_BLUE),
        LogKind::Stdout => RichText::new(&entry.text),
    };
    text.monospace()
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for YtDlpApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.drain_events();
        let running = self.supervisor.is_running();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.group(|ui| {
                ui.label("Video URL");
                ui.horizontal(|ui| {
                    ui.label("URL:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.url_input)
                            .desired_width(f32::INFINITY),
                    );
                });
            });

            ui.group(|ui| {
                ui.label("Destination");
                ui.horizontal(|ui| {
                    ui.label("Folder:");
                    ui.add(egui::TextEdit::singleline(&mut self.destination).desired_width(450.0));
                    if ui.button("Browse…").clicked() {
                        if let Some(folder) = FileDialog::new()
                            .set_directory(&self.destination)
                            .pick_folder()
                        {
                            self.destination = folder.display().to_string();
                        }
                    }
                });
            });

            ui.group(|ui| {
                ui.label("Download options");
                self.options_ui(ui);
            });

            ui.horizontal(|ui| {
                let can_start = self.supervisor.program().is_some() && !running;
                if ui
                    .add_enabled(can_start, egui::Button::new("Download"))
                    .clicked()
                {
                    self.start_download();
                }
                if ui
                    .add_enabled(running && !self.stop_requested, egui::Button::new("Stop"))
                    .clicked()
                {
                    self.stop_download();
                }
            });

            let bar = match (running, self.progress) {
                (true, Some(fraction)) => egui::ProgressBar::new(fraction).show_percentage(),
                (true, None) => egui::ProgressBar::new(0.0).animate(true),
                (false, _) => egui::ProgressBar::new(0.0),
            };
            ui.add(bar);

            ui.separator();
            ui.label("yt-dlp output");
            self.output_ui(ui);
        });

        // Keep polling the worker while a download is running
        if running {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

/// Shows a modal dialog for a download that could not be started
fn show_error(err: &DownloadError) {
    let level = match err {
        DownloadError::ExecutableNotFound(_) => MessageLevel::Error,
        _ => MessageLevel::Warning,
    };
    MessageDialog::new()
        .set_level(level)
        .set_title(err.dialog_title())
        .set_description(&err.to_string())
        .set_buttons(MessageButtons::Ok)
        .show();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_status_becomes_one_entry_per_line() {
        let entries: Vec<_> =
            log_entries(LogKind::Status, "Running:\nyt-dlp -x url\n").collect();
        let texts: Vec<_> = entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Running:", "yt-dlp -x url"]);
        assert!(entries.iter().all(|e| e.kind == LogKind::Status));
    }

    #[test]
    fn each_output_line_is_its_own_entry() {
        let entries: Vec<_> = log_entries(LogKind::Stdout, "[download]  10.0% of 5MiB").collect();
        assert_eq!(entries.len(), 1);
        assert!(log_entries(LogKind::Stdout, "").next().is_none());
    }
}
