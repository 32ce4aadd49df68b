use super::error::LoaderError;
use super::event::{Event, Hit, Track};

/// Random access to the events of a data store.
///
/// Implemented by the HDF5 reader, and by MemorySource for synthetic data and testing.
pub trait EventSource {
    /// Total number of events in the store
    fn n_events(&self) -> usize;

    /// Read the hits of a single event. Index must be less than `n_events()`
    fn read_hits(&self, index: usize) -> Result<Vec<Hit>, LoaderError>;

    /// Is there an event-level scalar with this name?
    fn has_scalar(&self, field: &str) -> bool;

    /// Read one event-level scalar
    fn read_scalar(&self, field: &str, index: usize) -> Result<f64, LoaderError>;

    /// Names of all event-level scalars
    fn scalar_names(&self) -> Vec<String>;

    /// Read the truth tracks of a single event, if the store has any
    fn read_tracks(&self, _index: usize) -> Result<Vec<Track>, LoaderError> {
        Ok(Vec::new())
    }
}

/// An in-memory event store.
///
/// Scalars live in `(name, values)` pairs with one value per event.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    events: Vec<Event>,
    scalars: Vec<(String, Vec<f64>)>,
}

impl MemorySource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            scalars: Vec::new(),
        }
    }

    /// Attach a scalar column. Missing trailing values read as NaN
    pub fn with_scalar(mut self, name: &str, values: Vec<f64>) -> Self {
        self.scalars.push((name.to_string(), values));
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn scalars(&self) -> &[(String, Vec<f64>)] {
        &self.scalars
    }
}

impl EventSource for MemorySource {
    fn n_events(&self) -> usize {
        self.events.len()
    }

    fn read_hits(&self, index: usize) -> Result<Vec<Hit>, LoaderError> {
        Ok(self.events[index].hits.clone())
    }

    fn has_scalar(&self, field: &str) -> bool {
        self.scalars.iter().any(|(name, _)| name == field)
    }

    fn read_scalar(&self, field: &str, index: usize) -> Result<f64, LoaderError> {
        self.scalars
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, values)| values.get(index).copied().unwrap_or(f64::NAN))
            .ok_or_else(|| LoaderError::MissingField(field.to_string()))
    }

    fn scalar_names(&self) -> Vec<String> {
        self.scalars.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_tracks(&self, index: usize) -> Result<Vec<Track>, LoaderError> {
        Ok(self.events[index].tracks.clone())
    }
}
