//! AudioSift - extract the audio track from video files
//!
//! Main entry point for the application.

use audiosift::AudioSiftApp;

fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Starting AudioSift v{}", env!("CARGO_PKG_VERSION"));

    // Configure native options
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 750.0])
            .with_min_inner_size([700.0, 600.0])
            .with_title("AudioSift")
            .with_drag_and_drop(true),
        follow_system_theme: true,
        ..Default::default()
    };

    // Run the app
    eframe::run_native(
        "AudioSift",
        native_options,
        Box::new(|cc| Box::new(AudioSiftApp::new(cc))),
    )
}
