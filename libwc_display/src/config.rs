use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::event::{AnnotationSpec, ColorChannel, RenderMode};
use super::hdf_reader::DEFAULT_TABLE_NAME;
use super::render::ImageFormat;
use super::scene::DisplayOptions;
use super::selection::EventSelection;

/// Where and how rendered events are saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Defaults to the stem of the data file
    pub file_stem: Option<String>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_stem: None,
            format: ImageFormat::Png,
            width: 1000,
            height: 1000,
        }
    }
}

impl OutputConfig {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Structure representing the application configuration. Contains pathing and display information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub experiment: String,
    pub data_path: PathBuf,
    pub table: String,
    /// Event selection expression, see EventSelection
    pub display: String,
    pub channel: ColorChannel,
    pub mode: RenderMode,
    /// Draw optical photon tracks in 3D
    #[serde(default)]
    pub show_photon_tracks: bool,
    pub extra_data: Vec<AnnotationSpec>,
    /// Optional user detector profiles, merged over the bundled table
    pub profiles_path: Option<PathBuf>,
    pub output: OutputConfig,
}

impl Default for Config {
    /// Generate a new Config object. The data path will be invalid
    fn default() -> Self {
        Self {
            experiment: String::from("SK"),
            data_path: PathBuf::from("None"),
            table: String::from(DEFAULT_TABLE_NAME),
            display: String::from("0"),
            channel: ColorChannel::Charge,
            mode: RenderMode::Unrolled,
            show_photon_tracks: false,
            extra_data: Vec::new(),
            profiles_path: None,
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file, replacing any existing file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Parse the display expression
    pub fn selection(&self) -> Result<EventSelection, ConfigError> {
        Ok(self.display.parse::<EventSelection>()?)
    }

    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            channel: self.channel,
            mode: self.mode,
            show_photon_tracks: self.show_photon_tracks,
        }
    }

    /// The stem of saved images: the configured one, or the data file's
    pub fn file_stem(&self) -> String {
        match &self.output.file_stem {
            Some(stem) => stem.clone(),
            None => self
                .data_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| String::from("event")),
        }
    }
}
