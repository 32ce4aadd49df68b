use super::error::{LoaderError, SelectionError};
use super::event::{Annotation, AnnotationSpec, Event};
use super::selection::EventSelection;
use super::source::EventSource;

/// Read a single event, attaching the requested annotations that exist in the source.
///
/// Annotations whose field is absent are skipped; use `missing_fields` to report them.
pub fn read_event<S: EventSource>(
    source: &S,
    index: usize,
    annotations: &[AnnotationSpec],
) -> Result<Event, LoaderError> {
    let n_events = source.n_events();
    if index >= n_events {
        return Err(SelectionError::OutOfRange { index, n_events }.into());
    }
    let hits = source.read_hits(index)?;
    let tracks = source.read_tracks(index)?;
    let mut event_annotations = Vec::with_capacity(annotations.len());
    for spec in annotations.iter() {
        if !source.has_scalar(&spec.field) {
            continue;
        }
        event_annotations.push(Annotation {
            label: spec.field.clone(),
            unit: spec.unit.clone(),
            value: source.read_scalar(&spec.field, index)?,
        });
    }
    Ok(Event {
        index,
        hits,
        annotations: event_annotations,
        tracks,
    })
}

/// The annotation requests that cannot be honored by this source
pub fn missing_fields<S: EventSource>(
    source: &S,
    annotations: &[AnnotationSpec],
) -> Vec<LoaderError> {
    annotations
        .iter()
        .filter(|spec| !source.has_scalar(&spec.field))
        .map(|spec| LoaderError::MissingField(spec.field.clone()))
        .collect()
}

/// A lazy, single pass sequence of events in the requested order.
///
/// Each call to `next` reads one event from the source. To go through the events again,
/// call `load_events` again with the same selection.
#[derive(Debug)]
pub struct EventStream<'a, S: EventSource> {
    source: &'a S,
    indices: std::vec::IntoIter<usize>,
    annotations: Vec<AnnotationSpec>,
    missing: Vec<LoaderError>,
    n_requested: usize,
}

impl<S: EventSource> EventStream<'_, S> {
    /// Number of events the selection resolved to
    pub fn n_requested(&self) -> usize {
        self.n_requested
    }

    /// Annotation fields that were requested but are not in the source
    pub fn missing_fields(&self) -> &[LoaderError] {
        &self.missing
    }
}

impl<S: EventSource> Iterator for EventStream<'_, S> {
    type Item = Result<Event, LoaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.indices.next()?;
        Some(read_event(self.source, index, &self.annotations))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl<S: EventSource> ExactSizeIterator for EventStream<'_, S> {}

/// Load the selected events from a source.
///
/// The selection is resolved up front: if any index is out of range the whole request
/// fails and no events are produced. Missing annotation fields do not fail the request;
/// they are logged and listed by `EventStream::missing_fields`.
pub fn load_events<'a, S: EventSource>(
    source: &'a S,
    selection: &EventSelection,
    annotations: &[AnnotationSpec],
) -> Result<EventStream<'a, S>, LoaderError> {
    let indices = selection.resolve(source.n_events())?;
    let missing = missing_fields(source, annotations);
    for error in missing.iter() {
        log::error!("{error}");
    }
    Ok(EventStream {
        source,
        n_requested: indices.len(),
        indices: indices.into_iter(),
        annotations: annotations.to_vec(),
        missing,
    })
}
