use hdf5::types::VarLenUnicode;
use hdf5::File;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::WriterError;
use super::event::Event;
use super::hdf_reader::{
    HITS_NAME, HIT_FIELDS, INDEX_POINTER_NAME, SCALARS_NAME, TRACKS_NAME, TRACK_FIELDS,
    TRACK_POINTER_NAME,
};
use super::source::MemorySource;

/// This is the version of the output format
const FORMAT_VERSION: &str = "1.0";

/// Writes events in the columnar layout read by Hdf5EventFile.
///
/// Events are buffered as they are appended and the datasets are created on `close`,
/// since every hit array spans all events.
#[derive(Debug)]
pub struct EventWriter {
    file_handle: File,
    path: PathBuf,
    table_group: hdf5::Group,
    index_pointer: Vec<u64>,
    hit_columns: [Vec<f64>; 5],
    track_pointer: Vec<u64>,
    track_ids: [Vec<i32>; 3],
    track_vertices: [Vec<f64>; 2],
    scalars: Vec<(String, Vec<f64>)>,
}

impl EventWriter {
    /// Create the writer, creating a file at path with a single table
    pub fn new(path: &Path, table: &str) -> Result<Self, WriterError> {
        let file_handle = File::create(path)?;
        let table_group = file_handle.create_group(table)?;
        let version = format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION);
        table_group
            .new_attr::<VarLenUnicode>()
            .create("version")?
            .write_scalar(&VarLenUnicode::from_str(&version)?)?;
        Ok(Self {
            file_handle,
            path: path.to_path_buf(),
            table_group,
            index_pointer: vec![0],
            hit_columns: Default::default(),
            track_pointer: vec![0],
            track_ids: Default::default(),
            track_vertices: Default::default(),
            scalars: Vec::new(),
        })
    }

    pub fn n_events(&self) -> usize {
        self.index_pointer.len() - 1
    }

    /// Buffer one event. The event index is ignored; events are numbered in append order
    pub fn append_event(&mut self, event: &Event) {
        for hit in event.hits.iter() {
            self.hit_columns[0].push(hit.position[0]);
            self.hit_columns[1].push(hit.position[1]);
            self.hit_columns[2].push(hit.position[2]);
            self.hit_columns[3].push(hit.charge);
            self.hit_columns[4].push(hit.time);
        }
        self.index_pointer.push(self.hit_columns[0].len() as u64);

        for track in event.tracks.iter() {
            self.track_ids[0].push(track.pid);
            self.track_ids[1].push(track.track_id);
            self.track_ids[2].push(track.parent_id);
            self.track_vertices[0].extend_from_slice(&track.start);
            self.track_vertices[1].extend_from_slice(&track.stop);
        }
        self.track_pointer.push(self.track_ids[0].len() as u64);
    }

    /// Set an event-level scalar column; it must hold one value per event by the time of `close`
    pub fn set_scalar(&mut self, name: &str, values: Vec<f64>) {
        self.scalars.retain(|(n, _)| n != name);
        self.scalars.push((name.to_string(), values));
    }

    /// Buffer every event and scalar of an in-memory source
    pub fn append_source(&mut self, source: &MemorySource) {
        for event in source.events() {
            self.append_event(event);
        }
        for (name, values) in source.scalars() {
            self.set_scalar(name, values.clone());
        }
    }

    /// Write all buffered data, consuming the writer
    pub fn close(self) -> Result<(), WriterError> {
        let n_events = self.n_events();
        for (name, values) in self.scalars.iter() {
            if values.len() != n_events {
                return Err(WriterError::ScalarLength(name.clone(), values.len(), n_events));
            }
        }

        self.table_group
            .new_dataset_builder()
            .with_data(&self.index_pointer)
            .create(INDEX_POINTER_NAME)?;

        let hits_group = self.table_group.create_group(HITS_NAME)?;
        for (field, column) in HIT_FIELDS.iter().zip(self.hit_columns.iter()) {
            hits_group
                .new_dataset_builder()
                .with_data(column)
                .create(*field)?;
        }

        if !self.scalars.is_empty() {
            let scalars_group = self.table_group.create_group(SCALARS_NAME)?;
            for (name, values) in self.scalars.iter() {
                scalars_group
                    .new_dataset_builder()
                    .with_data(values)
                    .create(name.as_str())?;
            }
        }

        let n_tracks = self.track_ids[0].len();
        if n_tracks > 0 {
            let tracks_group = self.table_group.create_group(TRACKS_NAME)?;
            tracks_group
                .new_dataset_builder()
                .with_data(&self.track_pointer)
                .create(TRACK_POINTER_NAME)?;
            for (field, ids) in TRACK_FIELDS.iter().zip(self.track_ids.iter()) {
                tracks_group
                    .new_dataset_builder()
                    .with_data(ids)
                    .create(*field)?;
            }
            for (field, vertices) in TRACK_FIELDS[3..].iter().zip(self.track_vertices.iter()) {
                let matrix = Array2::from_shape_vec((n_tracks, 3), vertices.clone())?;
                tracks_group
                    .new_dataset_builder()
                    .with_data(&matrix)
                    .create(*field)?;
            }
        }

        self.file_handle.flush()?;
        log::info!(
            "{} events with {} hits written to {}",
            n_events,
            self.hit_columns[0].len(),
            self.path.display()
        );
        Ok(())
    }
}
