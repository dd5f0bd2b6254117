//! Main application state and UI
//!
//! A single window: file selection, output settings, progress, and the
//! processing log. Extraction itself runs on the [`Extractor`] worker.

use std::path::{Path, PathBuf};

use eframe::egui::{self, Color32, RichText, Vec2};

use crate::extractor::formats::{is_supported_extension, supported_input_extensions};
use crate::extractor::job::format_size;
use crate::extractor::{
    AudioFormat, Bitrate, ExtractionForm, ExtractionStatus, Extractor, FfmpegBinary, WorkerEvent,
};
use crate::settings::Preferences;
use crate::ui::{detect_system_theme, effective_theme, LogPanel, Theme};

/// Main application state
pub struct AudioSiftApp {
    // Extraction
    pub form: ExtractionForm,
    pub extractor: Extractor,
    pub status: ExtractionStatus,
    ffmpeg: Option<FfmpegBinary>,
    cancel_requested: bool,

    // UI
    pub log: LogPanel,
    pub theme: Theme,

    // Settings
    pub preferences: Preferences,
}

impl AudioSiftApp {
    /// Create a new application instance
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        log::info!("Initializing AudioSift...");

        let preferences = Preferences::load();
        let theme = preferences
            .theme
            .unwrap_or_else(|| detect_system_theme(cc.integration_info.system_theme));
        theme.apply(&cc.egui_ctx);

        let app = Self::with_preferences(preferences, theme);
        log::info!("AudioSift initialized");
        app
    }

    /// Build the app state from loaded preferences.
    pub fn with_preferences(preferences: Preferences, theme: Theme) -> Self {
        let mut log = LogPanel::new();

        let ffmpeg = match FfmpegBinary::locate(preferences.ffmpeg_path.as_deref()) {
            Ok(binary) => {
                let version = binary.version().unwrap_or_else(|| "unknown version".to_string());
                log.info(format!("FFmpeg: {} ({})", version, binary.path().display()));
                Some(binary)
            }
            Err(e) => {
                log::warn!("{}", e);
                log.warn(e.to_string());
                None
            }
        };

        Self {
            form: ExtractionForm::new(preferences.format, preferences.bitrate),
            extractor: Extractor::new(),
            status: ExtractionStatus::default(),
            ffmpeg,
            cancel_requested: false,
            log,
            theme,
            preferences,
        }
    }

    pub fn ffmpeg_available(&self) -> bool {
        self.ffmpeg.is_some()
    }

    /// Whether the start button is enabled.
    pub fn can_start(&self) -> bool {
        self.form
            .can_start(self.ffmpeg_available(), self.extractor.is_running())
    }

    /// Set the input video (from the dialog or a drop).
    pub fn set_input(&mut self, path: &Path) {
        self.form.set_input(path);
        if let Some(dir) = path.parent().filter(|d| d.is_dir()) {
            self.preferences.last_input_dir = Some(dir.to_path_buf());
            self.save_preferences();
        }
    }

    pub fn set_format(&mut self, format: AudioFormat) {
        if format == self.form.format() {
            return;
        }
        self.form.set_format(format);
        self.preferences.format = format;
        self.save_preferences();
    }

    pub fn set_bitrate(&mut self, bitrate: Bitrate) {
        if bitrate == self.form.bitrate {
            return;
        }
        self.form.bitrate = bitrate;
        self.preferences.bitrate = bitrate;
        self.save_preferences();
    }

    pub fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.theme = self.theme.toggled();
        self.theme.apply(ctx);
        self.preferences.theme = Some(self.theme);
        self.save_preferences();
    }

    fn save_preferences(&self) {
        if let Err(e) = self.preferences.save() {
            log::warn!("Failed to save preferences: {:#}", e);
        }
    }

    /// Validate the form and hand the request to the worker.
    pub fn start_extraction(&mut self) {
        let Some(ffmpeg) = self.ffmpeg.clone() else {
            self.log.error("FFmpeg is not available");
            return;
        };

        let request = match self.form.build_request() {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Rejected extraction request: {}", e);
                self.log.error(e.to_string());
                return;
            }
        };

        self.log.clear();
        self.log.info("🚀 Starting audio extraction...");
        self.log.info(format!("Input: {}", request.input.display()));
        self.log.info(format!(
            "Format: {}, Quality: {}",
            request.format.display_name(),
            quality_label(request.format, request.bitrate)
        ));

        match self.extractor.start(ffmpeg, request) {
            Ok(()) => {
                self.status = ExtractionStatus::running();
                self.cancel_requested = false;
            }
            Err(e) => self.log.error(e.to_string()),
        }
    }

    pub fn cancel_extraction(&mut self) {
        if self.extractor.is_running() {
            self.cancel_requested = true;
            self.extractor.cancel();
            self.log.warn("Stopping FFmpeg...");
        }
    }

    /// Drain worker events into status and log.
    pub fn handle_worker_events(&mut self) {
        for event in self.extractor.poll_events() {
            match event {
                WorkerEvent::Log(line) => self.log.warn(line),
                WorkerEvent::Progress(update) => {
                    self.status.set_progress(update.percent, update.speed);
                }
                WorkerEvent::Finished(Ok((output, size))) => {
                    self.log.success(format!(
                        "Extraction complete! Saved to: {} ({})",
                        output.display(),
                        format_size(size)
                    ));
                    self.status.complete(output, size);
                }
                WorkerEvent::Finished(Err(_)) if self.cancel_requested => {
                    self.log.warn("Extraction cancelled");
                    self.status = ExtractionStatus::Cancelled;
                }
                WorkerEvent::Finished(Err(error)) => {
                    self.log.error(format!("Error: {}", error));
                    self.status = ExtractionStatus::Failed { error };
                }
            }
        }
    }

    /// Open file dialog to pick the input video.
    fn browse_input(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Select video file")
            .add_filter("Video Files", supported_input_extensions())
            .add_filter("All Files", &["*"]);

        if let Some(dir) = self
            .form
            .input_dir()
            .or_else(|| self.preferences.get_last_input_dir().map(Path::to_path_buf))
        {
            dialog = dialog.set_directory(dir);
        }

        if let Some(path) = dialog.pick_file() {
            self.set_input(&path);
        }
    }

    /// Open save dialog to choose the output file.
    fn browse_output(&mut self) {
        let format = self.form.format();
        let mut dialog = rfd::FileDialog::new()
            .set_title("Save audio file")
            .add_filter(format.display_name(), &[format.extension()])
            .add_filter("All Files", &["*"]);

        if let Some(suggested) = self.form.suggested_output() {
            if let Some(dir) = suggested.parent() {
                dialog = dialog.set_directory(dir);
            }
            if let Some(name) = suggested.file_name() {
                dialog = dialog.set_file_name(name.to_string_lossy());
            }
        }

        if let Some(path) = dialog.save_file() {
            self.form.set_output_from_dialog(&path);
        }
    }

    /// Accept a video dropped onto the window.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if dropped.is_empty() || self.extractor.is_running() {
            return;
        }

        let video = dropped.iter().find(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(is_supported_extension)
                .unwrap_or(false)
        });

        match video {
            Some(path) => {
                let path = path.clone();
                self.set_input(&path);
            }
            None => self.log.warn("Dropped file is not a supported video"),
        }
    }

    fn show_title(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("🎵 AudioSift").size(26.0).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(self.theme.toggle_label()).clicked() {
                    self.toggle_theme(ui.ctx());
                }
            });
        });
    }

    fn show_file_section(&mut self, ui: &mut egui::Ui) {
        let running = self.extractor.is_running();

        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.label(RichText::new("File Selection").strong().size(15.0));
            ui.add_space(6.0);

            ui.add_enabled_ui(!running, |ui| {
                egui::Grid::new("file_selection")
                    .num_columns(3)
                    .spacing([8.0, 10.0])
                    .show(ui, |ui| {
                        let field_width = (ui.available_width() - 200.0).max(200.0);

                        ui.label("Video file:");
                        let response = ui.add(
                            egui::TextEdit::singleline(&mut self.form.input)
                                .hint_text("Select a video file to process...")
                                .desired_width(field_width),
                        );
                        if response.changed() {
                            self.form.refresh_output();
                        }
                        if ui.button("Browse...").clicked() {
                            self.browse_input();
                        }
                        ui.end_row();

                        ui.label("Save to:");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.form.output)
                                .hint_text("Matched automatically, or choose...")
                                .desired_width(field_width),
                        );
                        if ui.button("Save as...").clicked() {
                            self.browse_output();
                        }
                        ui.end_row();
                    });
            });
        });

        // Visual feedback for drag
        let is_dragging = ui.ctx().input(|i| !i.raw.hovered_files.is_empty());
        if is_dragging {
            ui.painter().rect_stroke(
                ui.max_rect(),
                4.0,
                egui::Stroke::new(2.0, Color32::from_rgb(59, 130, 246)),
            );
        }
    }

    fn show_settings(&mut self, ui: &mut egui::Ui) {
        let running = self.extractor.is_running();
        let mut format = self.form.format();
        let mut bitrate = self.form.bitrate;

        ui.add_enabled_ui(!running, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Output format:").strong());
                egui::ComboBox::from_id_source("output_format")
                    .width(220.0)
                    .selected_text(format_label(format))
                    .show_ui(ui, |ui| {
                        for f in AudioFormat::all() {
                            ui.selectable_value(&mut format, *f, format_label(*f));
                        }
                    });

                ui.add_space(24.0);

                ui.label(RichText::new("Audio quality:").strong());
                ui.add_enabled_ui(self.form.bitrate_enabled(), |ui| {
                    egui::ComboBox::from_id_source("audio_quality")
                        .width(160.0)
                        .selected_text(bitrate.display_name())
                        .show_ui(ui, |ui| {
                            for b in Bitrate::all() {
                                ui.selectable_value(&mut bitrate, *b, b.display_name());
                            }
                        });
                });
            });
        });

        self.set_format(format);
        self.set_bitrate(bitrate);

        if !self.form.bitrate_enabled() {
            ui.label(
                RichText::new(quality_label(format, bitrate))
                    .small()
                    .italics()
                    .color(Color32::GRAY),
            );
        }
    }

    fn show_progress(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.label(self.status.label());
        });

        let bar = egui::ProgressBar::new(self.status.fraction())
            .show_percentage()
            .animate(self.status.is_active());
        ui.add(bar);

        if let ExtractionStatus::Failed { error } = &self.status {
            ui.label(RichText::new(error).small().color(Color32::from_rgb(239, 68, 68)));
        }
    }

    fn show_actions(&mut self, ui: &mut egui::Ui) {
        let running = self.extractor.is_running();
        let text = if running {
            "⏳ Extracting..."
        } else {
            "✨ Start Extraction"
        };

        ui.horizontal(|ui| {
            let cancel_width = if running { 110.0 } else { 0.0 };
            let width = ui.available_width() - cancel_width;
            let start = egui::Button::new(RichText::new(text).size(18.0).strong());
            if ui
                .add_enabled_ui(self.can_start(), |ui| ui.add_sized(Vec2::new(width, 50.0), start))
                .inner
                .clicked()
            {
                self.start_extraction();
            }

            if running && ui.add_sized(Vec2::new(100.0, 50.0), egui::Button::new("⏹ Cancel")).clicked() {
                self.cancel_extraction();
            }
        });
    }
}

impl eframe::App for AudioSiftApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.handle_worker_events();
        self.handle_dropped_files(ctx);

        let theme = effective_theme(self.preferences.theme, self.theme, frame.info().system_theme);
        if theme != self.theme {
            log::info!("System theme changed to {:?}", theme);
            self.theme = theme;
        }

        // eframe resets visuals when the system theme changes
        if ctx.style().visuals.panel_fill != self.theme.visuals().panel_fill {
            self.theme.apply(ctx);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).inner_margin(24.0))
            .show(ctx, |ui| {
                self.show_title(ui);
                ui.add_space(12.0);

                if !self.ffmpeg_available() {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("⚠").color(Color32::YELLOW));
                        ui.label(
                            RichText::new(crate::extractor::FfmpegError::NotFound.to_string())
                                .color(Color32::YELLOW)
                                .small(),
                        );
                    });
                    ui.add_space(8.0);
                }

                self.show_file_section(ui);
                ui.add_space(12.0);
                self.show_settings(ui);
                ui.add_space(12.0);
                self.show_progress(ui);
                ui.add_space(12.0);
                self.show_actions(ui);
                ui.add_space(12.0);
                self.log.show(ui);
            });

        // Request repaint while extracting
        if self.extractor.is_running() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

/// Combo box text for a format, e.g. "MP3 - Best compatibility".
fn format_label(format: AudioFormat) -> String {
    format!("{} - {}", format.display_name(), format.description())
}

/// What "quality" means for the chosen format.
fn quality_label(format: AudioFormat, bitrate: Bitrate) -> String {
    if format.uses_bitrate() {
        bitrate.as_str().to_string()
    } else if format.is_lossless() {
        "lossless".to_string()
    } else {
        "variable bitrate (quality 6)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_label() {
        assert_eq!(quality_label(AudioFormat::Mp3, Bitrate::Kbps256), "256k");
        assert_eq!(quality_label(AudioFormat::Flac, Bitrate::Kbps256), "lossless");
        assert_eq!(
            quality_label(AudioFormat::Ogg, Bitrate::Kbps256),
            "variable bitrate (quality 6)"
        );
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(AudioFormat::Wav), "WAV - Uncompressed, lossless");
    }
}
