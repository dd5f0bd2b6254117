//! Light/dark theme handling.

use std::process::Command;
use std::time::Duration;

use egui::{Color32, Visuals};
use serde::{Deserialize, Serialize};

use crate::process::run_with_timeout;

/// Budget for each `gsettings`/`reg` query.
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Slate palette shared by both themes.
mod palette {
    use egui::Color32;

    pub const SLATE_900: Color32 = Color32::from_rgb(0x0f, 0x17, 0x2a);
    pub const SLATE_800: Color32 = Color32::from_rgb(0x1e, 0x29, 0x3b);
    pub const SLATE_700: Color32 = Color32::from_rgb(0x33, 0x41, 0x55);
    pub const SLATE_200: Color32 = Color32::from_rgb(0xe2, 0xe8, 0xf0);
    pub const SLATE_50: Color32 = Color32::from_rgb(0xf8, 0xfa, 0xfc);
    pub const BLUE_500: Color32 = Color32::from_rgb(0x3b, 0x82, 0xf6);
}

/// Application color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn is_dark(&self) -> bool {
        matches!(self, Theme::Dark)
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Label for the button that switches away from this theme.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            Theme::Light => "🌙 Dark",
            Theme::Dark => "☀ Light",
        }
    }

    /// egui visuals for this theme.
    pub fn visuals(&self) -> Visuals {
        use palette::*;

        let (mut visuals, window, base, button, text) = match self {
            Theme::Dark => (Visuals::dark(), SLATE_900, SLATE_800, SLATE_700, SLATE_50),
            Theme::Light => (Visuals::light(), SLATE_50, Color32::WHITE, SLATE_200, SLATE_900),
        };

        visuals.override_text_color = Some(text);
        visuals.window_fill = window;
        visuals.panel_fill = window;
        visuals.extreme_bg_color = base;
        visuals.faint_bg_color = base;
        visuals.code_bg_color = base;
        visuals.widgets.inactive.bg_fill = button;
        visuals.widgets.inactive.weak_bg_fill = button;
        visuals.selection.bg_fill = BLUE_500;
        visuals.hyperlink_color = BLUE_500;
        visuals
    }

    /// Apply to an egui context.
    pub fn apply(&self, ctx: &egui::Context) {
        ctx.set_visuals(self.visuals());
    }
}

impl From<eframe::Theme> for Theme {
    fn from(theme: eframe::Theme) -> Self {
        match theme {
            eframe::Theme::Dark => Theme::Dark,
            eframe::Theme::Light => Theme::Light,
        }
    }
}

/// Work out the desktop's theme.
///
/// `hint` is what the windowing backend reported, if anything. Otherwise
/// GNOME settings are queried on Linux and the registry on Windows.
pub fn detect_system_theme(hint: Option<eframe::Theme>) -> Theme {
    if let Some(theme) = hint {
        return theme.into();
    }

    let dark = if cfg!(target_os = "windows") {
        query(
            "reg",
            &[
                "query",
                r"HKCU\Software\Microsoft\Windows\CurrentVersion\Themes\Personalize",
                "/v",
                "AppsUseLightTheme",
            ],
        )
        .and_then(|out| parse_apps_use_light_theme(&out))
        .map(|light| !light)
    } else if cfg!(target_os = "linux") {
        let color_scheme = query(
            "gsettings",
            &["get", "org.gnome.desktop.interface", "color-scheme"],
        );
        let gtk_theme = query("gsettings", &["get", "org.gnome.desktop.interface", "gtk-theme"]);
        match (color_scheme, gtk_theme) {
            (None, None) => None,
            (a, b) => Some(
                a.map(|s| mentions_dark(&s)).unwrap_or(false)
                    || b.map(|s| mentions_dark(&s)).unwrap_or(false),
            ),
        }
    } else {
        None
    };

    match dark {
        Some(true) => Theme::Dark,
        Some(false) => Theme::Light,
        None => {
            log::debug!("Could not detect system theme, using light");
            Theme::Light
        }
    }
}

/// Run a helper command and capture stdout when it succeeds.
fn query(program: &str, args: &[&str]) -> Option<String> {
    let output = run_with_timeout(Command::new(program).args(args), QUERY_TIMEOUT).ok()??;
    output.status.success().then_some(output.stdout)
}

/// Theme to show this frame. An explicit choice always wins; otherwise the
/// backend's current system theme is followed, keeping `current` when the
/// backend doesn't know.
pub fn effective_theme(
    saved: Option<Theme>,
    current: Theme,
    system: Option<eframe::Theme>,
) -> Theme {
    match (saved, system) {
        (Some(theme), _) => theme,
        (None, Some(system)) => system.into(),
        (None, None) => current,
    }
}

/// `gsettings` values such as `'prefer-dark'` or `'Adwaita-dark'`.
fn mentions_dark(value: &str) -> bool {
    value.to_ascii_lowercase().contains("dark")
}

/// Parse `reg query ... /v AppsUseLightTheme` output.
fn parse_apps_use_light_theme(output: &str) -> Option<bool> {
    let line = output
        .lines()
        .find(|l| l.trim_start().starts_with("AppsUseLightTheme"))?;
    let value = line.split_whitespace().last()?;
    let value = value.trim_start_matches("0x");
    u32::from_str_radix(value, 16).ok().map(|v| v != 0)
}
