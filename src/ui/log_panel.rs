//! Processing log shown under the controls.

use std::collections::VecDeque;

use egui::{Color32, RichText};

/// Oldest entries are dropped past this many.
const MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "",
            LogLevel::Success => "✅ ",
            LogLevel::Warning => "⚠ ",
            LogLevel::Error => "❌ ",
        }
    }

    fn color(&self) -> Option<Color32> {
        match self {
            LogLevel::Info => None,
            LogLevel::Success => Some(Color32::from_rgb(34, 197, 94)),
            LogLevel::Warning => Some(Color32::from_rgb(234, 179, 8)),
            LogLevel::Error => Some(Color32::from_rgb(239, 68, 68)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub text: String,
}

/// Bounded list of log lines with an egui view.
#[derive(Debug, Default)]
pub struct LogPanel {
    entries: VecDeque<LogEntry>,
}

impl LogPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: LogLevel, text: impl Into<String>) {
        if self.entries.len() == MAX_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            level,
            text: text.into(),
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Success, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Error, text);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Show the log, filling the remaining space and following new lines.
    pub fn show(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("📋 Processing Log").strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(!self.is_empty(), egui::Button::new("Clear").small())
                    .clicked()
                {
                    self.clear();
                }
            });
        });

        egui::Frame::group(ui.style())
            .fill(ui.visuals().extreme_bg_color)
            .show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        if self.entries.is_empty() {
                            ui.label(RichText::new("No messages yet").italics().color(Color32::GRAY));
                        }
                        for entry in &self.entries {
                            let mut text = RichText::new(format!("{}{}", entry.level.prefix(), entry.text))
                                .monospace();
                            if let Some(color) = entry.level.color() {
                                text = text.color(color);
                            }
                            ui.label(text);
                        }
                    });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_clear() {
        let mut log = LogPanel::new();
        log.info("Starting");
        log.error("Boom");
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries().last().unwrap().level, LogLevel::Error);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_bounded() {
        let mut log = LogPanel::new();
        for i in 0..MAX_ENTRIES + 10 {
            log.info(format!("line {}", i));
        }
        assert_eq!(log.len(), MAX_ENTRIES);
        assert_eq!(log.entries().next().unwrap().text, "line 10");
    }
}
