use std::path::{Path, PathBuf};

use eframe::egui::{Color32, ComboBox, DragValue, RichText, Slider};
use rfd::FileDialog;

use libwc_display::browser::{BrowserAction, EventBrowser};
use libwc_display::config::Config;
use libwc_display::error::{DisplayError, RenderError};
use libwc_display::event::{ColorChannel, RenderMode};
use libwc_display::geometry::ProfileRegistry;
use libwc_display::hdf_reader::Hdf5EventFile;
use libwc_display::render::{ImageFormat, ImageRenderer, Renderer};
use libwc_display::scene::{Camera, Scene};

use super::painter::paint_scene;

fn render_error_dialog(show: &mut bool, ctx: &eframe::egui::Context) {
    eframe::egui::Window::new("Error")
        .open(show)
        .show(ctx, |ui| {
            ui.label("There was an error! Check the log file wc_display.log for more information.")
        });
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Keeps the last scene the browser rendered so it can be painted every frame
#[derive(Debug, Default)]
pub struct SceneCache {
    scene: Option<Scene>,
}

impl Renderer for SceneCache {
    fn render(&mut self, scene: &Scene) -> Result<(), RenderError> {
        self.scene = Some(scene.clone());
        Ok(())
    }
}

/// The UI app which inherits the eframe::App trait.
///
/// Owns the configuration and, once data is loaded, the event browser.
#[derive(Debug)]
pub struct DisplayApp {
    config: Config,
    experiments: Vec<String>,
    browser: Option<EventBrowser<Hdf5EventFile, SceneCache>>,
    event_entry: String,
    camera: Camera,
    show_error_window: bool,
}

impl DisplayApp {
    /// Create the application
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut visuals = eframe::egui::Visuals::dark();
        visuals.override_text_color = Some(Color32::LIGHT_GRAY);
        cc.egui_ctx.set_visuals(visuals);
        let mut app = DisplayApp {
            config: Config::default(),
            experiments: vec![],
            browser: None,
            event_entry: String::new(),
            camera: Camera::default(),
            show_error_window: false,
        };
        app.refresh_experiments();
        app
    }

    /// Log an error and raise the error window
    fn report<T, E: std::fmt::Display>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("{e}");
                self.show_error_window = true;
                None
            }
        }
    }

    fn refresh_experiments(&mut self) {
        let registry = ProfileRegistry::with_overrides(self.config.profiles_path.as_deref());
        if let Some(registry) = self.report(registry) {
            self.experiments = registry.names();
        }
    }

    /// Write the current Config to a file
    fn write_config(&mut self, path: &Path) {
        let result = self.config.write_config_file(path);
        self.report(result);
    }

    /// Read the Config from a file
    fn read_config(&mut self, path: &Path) {
        let result = Config::read_config_file(path);
        if let Some(config) = self.report(result) {
            self.config = config;
            self.refresh_experiments();
        }
    }

    /// Open the data file and display the first selected event
    fn load(&mut self) -> Result<(), DisplayError> {
        if let Some(mut old) = self.browser.take() {
            old.close();
        }
        let registry = ProfileRegistry::with_overrides(self.config.profiles_path.as_deref())?;
        let profile = registry.get(&self.config.experiment)?.clone();
        let file = Hdf5EventFile::open(&self.config.data_path, &self.config.table)?;
        let selection = self.config.selection()?;
        let mut browser = EventBrowser::new(
            file,
            profile,
            self.config.extra_data.clone(),
            SceneCache::default(),
        );
        browser.open(&selection, self.config.display_options())?;
        if !browser.missing_fields().is_empty() {
            self.show_error_window = true;
        }
        self.browser = Some(browser);
        Ok(())
    }

    fn apply(&mut self, action: BrowserAction) {
        let Some(browser) = self.browser.as_mut() else {
            return;
        };
        let result = browser.apply(action);
        self.report(result);
    }

    /// Save the displayed event with the image settings of the configuration
    fn save_image(&mut self) -> Result<(), DisplayError> {
        let Some(scene) = self.browser.as_ref().and_then(|b| b.scene()) else {
            return Ok(());
        };
        let output = &self.config.output;
        let mut renderer = ImageRenderer::new(
            &output.directory,
            &self.config.file_stem(),
            output.format,
            output.size(),
        )
        .with_camera(self.camera);
        renderer.render(&scene)?;
        Ok(())
    }

    fn config_ui(&mut self, ui: &mut eframe::egui::Ui) {
        ui.label(
            RichText::new("Configuration")
                .color(Color32::LIGHT_BLUE)
                .size(18.0),
        );
        eframe::egui::Grid::new("ConfigGrid").show(ui, |ui| {
            ui.label(format!("Data file: {}", self.config.data_path.display()));
            if ui.button("Open...").clicked() {
                if let Some(path) = FileDialog::new()
                    .set_directory(current_dir())
                    .add_filter("HDF5 file", &["h5", "hdf5"])
                    .pick_file()
                {
                    self.config.data_path = path;
                }
            }
            ui.end_row();

            ui.label("Table:");
            ui.text_edit_singleline(&mut self.config.table);
            ui.end_row();

            ui.label("Experiment:");
            ComboBox::from_id_source("experiment")
                .selected_text(self.config.experiment.as_str())
                .show_ui(ui, |ui| {
                    for name in self.experiments.iter() {
                        ui.selectable_value(&mut self.config.experiment, name.clone(), name);
                    }
                });
            ui.end_row();

            let profiles_text: String = match &self.config.profiles_path {
                Some(p) => p.to_string_lossy().to_string(),
                None => String::from("Default"),
            };
            ui.label(format!("Detector profiles: {profiles_text}"));
            if ui.button("Open...").clicked() {
                if let Some(path) = FileDialog::new()
                    .set_directory(current_dir())
                    .add_filter("YAML file", &["yaml", "yml"])
                    .pick_file()
                {
                    self.config.profiles_path = Some(path);
                    self.refresh_experiments();
                }
            }
            if ui.button("Default").clicked() {
                self.config.profiles_path = None;
                self.refresh_experiments();
            }
            ui.end_row();

            ui.label("Events:");
            ui.text_edit_singleline(&mut self.config.display);
            ui.end_row();

            ui.label(format!(
                "Image directory: {}",
                self.config.output.directory.display()
            ));
            if ui.button("Open...").clicked() {
                if let Some(path) = FileDialog::new()
                    .set_directory(current_dir())
                    .pick_folder()
                {
                    self.config.output.directory = path;
                }
            }
            ui.end_row();

            ui.label("Image format:");
            ui.horizontal(|ui| {
                ui.radio_value(&mut self.config.output.format, ImageFormat::Png, "png");
                ui.radio_value(&mut self.config.output.format, ImageFormat::Svg, "svg");
            });
            ui.end_row();

            ui.label("Image size:");
            ui.horizontal(|ui| {
                ui.add(DragValue::new(&mut self.config.output.width).range(100..=8000));
                ui.add(DragValue::new(&mut self.config.output.height).range(100..=8000));
            });
            ui.end_row();
        });

        if ui.button("Load").clicked() {
            log::info!("Loading {}...", self.config.data_path.display());
            let result = self.load();
            self.report(result);
        }
    }

    fn navigation_ui(&mut self, ui: &mut eframe::egui::Ui) {
        let Some(browser) = self.browser.as_ref() else {
            return;
        };
        let Some(view) = browser.view() else {
            return;
        };
        let n_selected = browser.indices().len();
        let time_range = browser
            .event()
            .and_then(|e| e.event.time_range())
            .unwrap_or((0.0, 1.0));

        ui.separator();
        ui.label(RichText::new("Navigation").color(Color32::LIGHT_BLUE).size(18.0));
        let mut actions = Vec::new();
        ui.horizontal(|ui| {
            if ui.button("< Previous").clicked() {
                actions.push(BrowserAction::Previous);
            }
            if ui.button("Next >").clicked() {
                actions.push(BrowserAction::Next);
            }
        });

        let mut position = view.position;
        if ui
            .add(Slider::new(&mut position, 0..=n_selected.saturating_sub(1)).text("Position"))
            .changed()
        {
            actions.push(BrowserAction::Seek(position));
        }
        ui.label(format!("Event {} ({} of {})", view.event_index, view.position + 1, n_selected));

        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.event_entry);
            if ui.button("Display Event").clicked() {
                match self.event_entry.trim().parse::<usize>() {
                    Ok(index) => actions.push(BrowserAction::JumpTo(index)),
                    Err(_) => log::error!("{} is not an event index", self.event_entry),
                }
            }
        });

        let mut channel = view.channel;
        ui.horizontal(|ui| {
            ui.label("Color:");
            ui.radio_value(&mut channel, ColorChannel::Charge, "Charge");
            ui.radio_value(&mut channel, ColorChannel::Time, "Time");
        });
        if channel != view.channel {
            actions.push(BrowserAction::SetChannel(channel));
        }

        let mut mode = view.mode;
        ui.horizontal(|ui| {
            ui.label("View:");
            ui.radio_value(&mut mode, RenderMode::Unrolled, "2D");
            ui.radio_value(&mut mode, RenderMode::Volume, "3D");
        });
        if mode != view.mode {
            actions.push(BrowserAction::SetMode(mode));
        }

        let mut show_photon_tracks = view.show_photon_tracks;
        ui.checkbox(&mut show_photon_tracks, "Photon tracks (3D)");
        if show_photon_tracks != view.show_photon_tracks {
            actions.push(BrowserAction::SetPhotonTracks(show_photon_tracks));
        }

        let (mut lo, mut hi) = (view.time_window.lo, view.time_window.hi);
        let lo_changed = ui
            .add(Slider::new(&mut lo, time_range.0..=time_range.1).text("Time min"))
            .changed();
        let hi_changed = ui
            .add(Slider::new(&mut hi, time_range.0..=time_range.1).text("Time max"))
            .changed();
        if lo_changed || hi_changed {
            if lo_changed {
                hi = hi.max(lo);
            } else {
                lo = lo.min(hi);
            }
            actions.push(BrowserAction::SetTimeWindow(lo, hi));
        }

        ui.horizontal(|ui| {
            if ui.button("Save Image").clicked() {
                let result = self.save_image();
                self.report(result);
            }
            if ui.button("Close").clicked() {
                actions.push(BrowserAction::Close);
            }
        });

        for action in actions {
            let closing = action == BrowserAction::Close;
            self.apply(action);
            if closing {
                self.browser = None;
            }
        }
    }
}

impl eframe::App for DisplayApp {
    fn update(&mut self, ctx: &eframe::egui::Context, _frame: &mut eframe::Frame) {
        render_error_dialog(&mut self.show_error_window, ctx);
        eframe::egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            //Menus
            ui.menu_button("File", |ui| {
                if ui.button("Open...").clicked() {
                    if let Some(path) = FileDialog::new()
                        .set_directory(current_dir())
                        .add_filter("YAML file", &["yaml", "yml"])
                        .pick_file()
                    {
                        self.read_config(&path);
                    }
                }
                if ui.button("Save...").clicked() {
                    if let Some(path) = FileDialog::new()
                        .set_directory(current_dir())
                        .add_filter("YAML file", &["yaml", "yml"])
                        .save_file()
                    {
                        self.write_config(&path);
                    }
                }
            });
        });

        eframe::egui::SidePanel::left("controls")
            .min_width(320.0)
            .show(ctx, |ui| {
                self.config_ui(ui);
                self.navigation_ui(ui);
            });

        eframe::egui::CentralPanel::default().show(ctx, |ui| {
            let Some(scene) = self
                .browser
                .as_ref()
                .and_then(|b| b.renderer().scene.as_ref())
            else {
                ui.label("Load a data file to display events");
                return;
            };
            ui.heading(&scene.title);
            ui.label(&scene.subtitle);
            paint_scene(ui, scene, &mut self.camera);
        });
    }
}
