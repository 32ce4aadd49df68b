use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Unknown experiment {0}; known experiments are: {1}")]
    UnknownExperiment(String, String),
    #[error("Detector profile {0} is invalid: {1}")]
    InvalidProfile(String, String),
    #[error("Failed to load detector profiles as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Detector profiles failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Detector profiles failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Could not parse event selection {0:?}; expected 'all', an index, a range 'start:stop' or a list 'a|b|c'")]
    Parse(String),
    #[error("Event range {0}:{1} is invalid; the start must not exceed the stop")]
    InvalidRange(usize, usize),
    #[error("Event index {index} is out of range; the file contains {n_events} events")]
    OutOfRange { index: usize, n_events: usize },
    #[error("Event selection resolved to no events")]
    Empty,
    #[error("Event index {0} is not part of the current selection")]
    NotSelected(usize),
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Event loader failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Could not open event file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Event file does not contain a table named {0}")]
    MissingTable(String),
    #[error("Event file does not contain the field {0}")]
    MissingField(String),
    #[error("Hit arrays have mismatched lengths -- {0}: {1}, {2}: {3}")]
    MismatchedLengths(String, usize, String, usize),
    #[error("Index pointer {0} is malformed: {1}")]
    BadIndexPointer(String, String),
    #[error("Event loader failed due to selection error: {0}")]
    Selection(#[from] SelectionError),
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("EventWriter failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("EventWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("EventWriter failed to encode a string: {0}")]
    StringError(#[from] hdf5::types::StringError),
    #[error("EventWriter received scalar {0} with {1} values for {2} events")]
    ScalarLength(String, usize, usize),
    #[error("EventWriter failed due to shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer failed while drawing: {0}")]
    DrawingError(String),
    #[error("Renderer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Unsupported image format {0}; expected png or svg")]
    UnsupportedFormat(String),
}

impl<E: std::error::Error + Send + Sync> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for RenderError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        Self::DrawingError(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config failed due to selection error: {0}")]
    SelectionError(#[from] SelectionError),
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser failed due to selection error: {0}")]
    SelectionError(#[from] SelectionError),
    #[error("Browser failed due to loader error: {0}")]
    LoaderError(#[from] LoaderError),
    #[error("Browser failed due to render error: {0}")]
    RenderError(#[from] RenderError),
    #[error("Time window [{0}, {1}] is invalid")]
    InvalidTimeWindow(f64, f64),
    #[error("Browser has no event loaded")]
    NotDisplaying,
    #[error("Browser was closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Display failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Display failed due to detector profile error: {0}")]
    ProfileError(#[from] ProfileError),
    #[error("Display failed due to loader error: {0}")]
    LoaderError(#[from] LoaderError),
    #[error("Display failed due to render error: {0}")]
    RenderError(#[from] RenderError),
    #[error("Display failed due to browser error: {0}")]
    BrowserError(#[from] BrowserError),
    #[error("Display failed due to writer error: {0}")]
    WriterError(#[from] WriterError),
}
