//! # wc_display
//!
//! Part of the wc_display crate family.
//!
//! This is the interactive water Cherenkov event browser, with a GUI using [egui](https://github.com/emilk/egui).
//!
//! ## Install
//!
//! Use `cargo install --path ./wc_display`
//!
//! ## Use
//!
//! To launch the application simply invoke it after it is installed
//!
//! ```bash
//! wc_display
//! ```
//!
//! Pick a data file, an experiment and the events to show, then click Load.
//!
//! ## Controls
//!
//! - Previous/Next: step through the selected events; stepping stops at either end.
//! - Position slider: jump to any position in the selection.
//! - Display Event: jump to an event index, which must be part of the selection.
//! - Color: color hits by charge or by time.
//! - View: 2D unrolled surface or 3D tank. Drag the 3D view to rotate it.
//! - Photon tracks: also draw the optical photon truth tracks in the 3D view.
//! - Time min/max: only show hits inside a time window. The window resets on every new event.
//! - Save Image: write the displayed event using the image settings of the configuration.
//!
//! Configurations can be saved using File->Save and loaded using File->Open

mod app;
mod painter;
use app::DisplayApp;
use simplelog::{Config, LevelFilter, WriteLogger};

/// The program entry point
fn main() {
    // Setup logging to a file
    match std::fs::File::create("./wc_display.log") {
        Ok(log_file) => {
            if let Err(e) = WriteLogger::init(LevelFilter::Info, Config::default(), log_file) {
                eprintln!("Could not initialize the logger: {e}");
            }
        }
        Err(e) => eprintln!("Could not create the log file: {e}"),
    }
    log::info!("Starting water Cherenkov event display UI");

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("WC Event Display")
            .with_inner_size(eframe::epaint::vec2(1400.0, 900.0))
            .with_min_inner_size(eframe::epaint::vec2(900.0, 600.0)),
        ..Default::default()
    };
    match eframe::run_native(
        "wc_display",
        native_options,
        Box::new(|cc| Ok(Box::new(DisplayApp::new(cc)))),
    ) {
        Ok(()) => (),
        Err(e) => log::error!("Eframe error: {}", e),
    }
}
