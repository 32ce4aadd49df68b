use hdf5::{File, Group};
use ndarray::s;
use std::path::{Path, PathBuf};

use super::error::LoaderError;
use super::event::{Hit, Track};
use super::source::EventSource;

pub const DEFAULT_TABLE_NAME: &str = "root_event";
pub const INDEX_POINTER_NAME: &str = "index_pointer";
pub const HITS_NAME: &str = "hits";
pub const SCALARS_NAME: &str = "scalars";
pub const TRACKS_NAME: &str = "tracks";
pub const TRACK_POINTER_NAME: &str = "track_pointer";
pub const HIT_FIELDS: [&str; 5] = ["hitx", "hity", "hitz", "charge", "time"];
pub const TRACK_FIELDS: [&str; 5] = ["pid", "track_id", "parent_id", "start", "stop"];

// Structure
// <table> (default root_event)
// |---- index_pointer(dset) - n_events + 1 offsets into the hit arrays
// |---- hits
// |    |---- hitx, hity, hitz, charge, time(dset)
// |---- scalars (optional)
// |    |---- energy, dwall, towall, ...(dset) - one value per event
// |---- tracks (optional)
// |    |---- track_pointer(dset) - n_events + 1 offsets into the track arrays
// |    |---- pid, track_id, parent_id(dset)
// |    |---- start, stop(dset) - n_tracks x 3

/// Check that an offsets array is usable and return the number of entries it addresses
fn check_pointer(name: &str, pointer: &[u64]) -> Result<u64, LoaderError> {
    let bad = |msg: &str| LoaderError::BadIndexPointer(name.to_string(), msg.to_string());
    let last = *pointer.last().ok_or_else(|| bad("it is empty"))?;
    if pointer[0] != 0 {
        return Err(bad("it does not start at 0"));
    }
    if pointer.windows(2).any(|w| w[1] < w[0]) {
        return Err(bad("it is not sorted"));
    }
    Ok(last)
}

/// Check that every dataset in `fields` has `expected` entries along the first axis
fn check_lengths(group: &Group, fields: &[&str], expected: (&str, u64)) -> Result<(), LoaderError> {
    for field in fields {
        let dataset = group
            .dataset(field)
            .map_err(|_| LoaderError::MissingField(field.to_string()))?;
        let length = dataset.shape().first().copied().unwrap_or(0);
        if length as u64 != expected.1 {
            return Err(LoaderError::MismatchedLengths(
                expected.0.to_string(),
                expected.1 as usize,
                field.to_string(),
                length,
            ));
        }
    }
    Ok(())
}

/// Check that every vertex dataset in `fields` is `n_rows` x 3
fn check_vertices(group: &Group, fields: &[&str], n_rows: u64) -> Result<(), LoaderError> {
    for field in fields {
        let dataset = group
            .dataset(field)
            .map_err(|_| LoaderError::MissingField(field.to_string()))?;
        let shape = dataset.shape();
        if shape.len() != 2 || shape[1] != 3 {
            return Err(LoaderError::MismatchedLengths(
                String::from("vertex components"),
                3,
                field.to_string(),
                shape.get(1).copied().unwrap_or(0),
            ));
        }
        if shape[0] as u64 != n_rows {
            return Err(LoaderError::MismatchedLengths(
                TRACK_POINTER_NAME.to_string(),
                n_rows as usize,
                field.to_string(),
                shape[0],
            ));
        }
    }
    Ok(())
}

#[derive(Debug)]
struct TrackTables {
    group: Group,
    pointer: Vec<u64>,
}

/// A read-only handle on an HDF5 event file.
///
/// Events are stored columnar: the hit arrays of all events are concatenated, and
/// `index_pointer[i]..index_pointer[i + 1]` is the slice belonging to event `i`.
/// The layout is validated when the file is opened, so reads of individual events only
/// fail on I/O.
#[derive(Debug)]
pub struct Hdf5EventFile {
    #[allow(dead_code)]
    file_handle: File,
    path: PathBuf,
    table: String,
    index_pointer: Vec<u64>,
    hits_group: Group,
    scalars_group: Option<Group>,
    scalar_names: Vec<String>,
    tracks: Option<TrackTables>,
    size_bytes: u64,
}

impl Hdf5EventFile {
    /// Open an event file and validate the layout of the given table
    pub fn open(path: &Path, table: &str) -> Result<Self, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::BadFilePath(path.to_path_buf()));
        }
        let size_bytes = path.metadata().map(|m| m.len()).unwrap_or(0);
        let file_handle = File::open(path)?;
        let table_group = file_handle
            .group(table)
            .map_err(|_| LoaderError::MissingTable(table.to_string()))?;

        let index_pointer = table_group
            .dataset(INDEX_POINTER_NAME)
            .map_err(|_| LoaderError::MissingField(INDEX_POINTER_NAME.to_string()))?
            .read_raw::<u64>()?;
        let n_hits = check_pointer(INDEX_POINTER_NAME, &index_pointer)?;
        let n_events = index_pointer.len() - 1;

        let hits_group = table_group
            .group(HITS_NAME)
            .map_err(|_| LoaderError::MissingField(HITS_NAME.to_string()))?;
        check_lengths(&hits_group, &HIT_FIELDS, (INDEX_POINTER_NAME, n_hits))?;

        let (scalars_group, scalar_names) = match table_group.group(SCALARS_NAME) {
            Ok(group) => {
                let names = group.member_names()?;
                let fields: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
                check_lengths(&group, &fields, ("events", n_events as u64))?;
                (Some(group), names)
            }
            Err(_) => (None, Vec::new()),
        };

        let tracks = match table_group.group(TRACKS_NAME) {
            Ok(group) => {
                let pointer = group
                    .dataset(TRACK_POINTER_NAME)
                    .map_err(|_| LoaderError::MissingField(TRACK_POINTER_NAME.to_string()))?
                    .read_raw::<u64>()?;
                if pointer.len() != index_pointer.len() {
                    return Err(LoaderError::MismatchedLengths(
                        INDEX_POINTER_NAME.to_string(),
                        index_pointer.len(),
                        TRACK_POINTER_NAME.to_string(),
                        pointer.len(),
                    ));
                }
                let n_tracks = check_pointer(TRACK_POINTER_NAME, &pointer)?;
                check_lengths(&group, &TRACK_FIELDS[..3], (TRACK_POINTER_NAME, n_tracks))?;
                check_vertices(&group, &TRACK_FIELDS[3..], n_tracks)?;
                Some(TrackTables { group, pointer })
            }
            Err(_) => None,
        };

        log::info!(
            "Opened {} ({}) table {table}: {n_events} events, {n_hits} hits",
            path.display(),
            human_bytes::human_bytes(size_bytes as f64)
        );

        Ok(Self {
            file_handle,
            path: path.to_path_buf(),
            table: table.to_string(),
            index_pointer,
            hits_group,
            scalars_group,
            scalar_names,
            tracks,
            size_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn n_hits_total(&self) -> u64 {
        self.index_pointer.last().copied().unwrap_or(0)
    }

    pub fn has_tracks(&self) -> bool {
        self.tracks.is_some()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    fn read_column(&self, field: &str, start: usize, stop: usize) -> Result<Vec<f64>, LoaderError> {
        if start == stop {
            return Ok(Vec::new());
        }
        Ok(self
            .hits_group
            .dataset(field)?
            .read_slice_1d::<f64, _>(s![start..stop])?
            .to_vec())
    }
}

impl EventSource for Hdf5EventFile {
    fn n_events(&self) -> usize {
        self.index_pointer.len() - 1
    }

    fn read_hits(&self, index: usize) -> Result<Vec<Hit>, LoaderError> {
        let start = self.index_pointer[index] as usize;
        let stop = self.index_pointer[index + 1] as usize;
        let x = self.read_column(HIT_FIELDS[0], start, stop)?;
        let y = self.read_column(HIT_FIELDS[1], start, stop)?;
        let z = self.read_column(HIT_FIELDS[2], start, stop)?;
        let charge = self.read_column(HIT_FIELDS[3], start, stop)?;
        let time = self.read_column(HIT_FIELDS[4], start, stop)?;
        Ok((0..stop - start)
            .map(|i| Hit::new([x[i], y[i], z[i]], charge[i], time[i]))
            .collect())
    }

    fn has_scalar(&self, field: &str) -> bool {
        self.scalar_names.iter().any(|name| name == field)
    }

    fn read_scalar(&self, field: &str, index: usize) -> Result<f64, LoaderError> {
        let group = match &self.scalars_group {
            Some(g) if self.has_scalar(field) => g,
            _ => return Err(LoaderError::MissingField(field.to_string())),
        };
        let value = group
            .dataset(field)?
            .read_slice_1d::<f64, _>(s![index..index + 1])?;
        Ok(value[0])
    }

    fn scalar_names(&self) -> Vec<String> {
        self.scalar_names.clone()
    }

    fn read_tracks(&self, index: usize) -> Result<Vec<Track>, LoaderError> {
        let tables = match &self.tracks {
            Some(t) => t,
            None => return Ok(Vec::new()),
        };
        let start = tables.pointer[index] as usize;
        let stop = tables.pointer[index + 1] as usize;
        if start == stop {
            return Ok(Vec::new());
        }
        let read_ids = |name: &str| -> Result<Vec<i32>, LoaderError> {
            Ok(tables
                .group
                .dataset(name)?
                .read_slice_1d::<i32, _>(s![start..stop])?
                .to_vec())
        };
        let pid = read_ids(TRACK_FIELDS[0])?;
        let track_id = read_ids(TRACK_FIELDS[1])?;
        let parent_id = read_ids(TRACK_FIELDS[2])?;
        let starts = tables
            .group
            .dataset(TRACK_FIELDS[3])?
            .read_slice_2d::<f64, _>(s![start..stop, ..])?;
        let stops = tables
            .group
            .dataset(TRACK_FIELDS[4])?
            .read_slice_2d::<f64, _>(s![start..stop, ..])?;
        Ok((0..stop - start)
            .map(|i| Track {
                track_id: track_id[i],
                parent_id: parent_id[i],
                pid: pid[i],
                start: [starts[[i, 0]], starts[[i, 1]], starts[[i, 2]]],
                stop: [stops[[i, 0]], stops[[i, 1]], stops[[i, 2]]],
            })
            .collect())
    }
}

/// Overview of an event file, as printed by the command line tool
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub path: PathBuf,
    pub table: String,
    pub n_events: usize,
    pub n_hits: u64,
    pub scalar_names: Vec<String>,
    pub has_tracks: bool,
    pub size_bytes: u64,
}

impl FileSummary {
    pub fn new(file: &Hdf5EventFile) -> Self {
        Self {
            path: file.path().to_path_buf(),
            table: file.table().to_string(),
            n_events: file.n_events(),
            n_hits: file.n_hits_total(),
            scalar_names: file.scalar_names(),
            has_tracks: file.has_tracks(),
            size_bytes: file.size_bytes(),
        }
    }
}

impl std::fmt::Display for FileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "File: {}", self.path.display())?;
        writeln!(f, "Size: {}", human_bytes::human_bytes(self.size_bytes as f64))?;
        writeln!(f, "Table: {}", self.table)?;
        writeln!(f, "Events: {}", self.n_events)?;
        writeln!(f, "Hits: {}", self.n_hits)?;
        if self.n_events > 0 {
            writeln!(
                f,
                "Mean hits per event: {:.1}",
                self.n_hits as f64 / self.n_events as f64
            )?;
        }
        if self.scalar_names.is_empty() {
            writeln!(f, "Scalars: none")?;
        } else {
            writeln!(f, "Scalars: {}", self.scalar_names.join(", "))?;
        }
        write!(f, "Tracks: {}", if self.has_tracks { "yes" } else { "no" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn write_tracks_file(path: &Path, vertices: Array2<f64>) {
        let file = File::create(path).unwrap();
        let table = file.create_group(DEFAULT_TABLE_NAME).unwrap();
        table
            .new_dataset_builder()
            .with_data(&[0u64, 1])
            .create(INDEX_POINTER_NAME)
            .unwrap();
        let hits = table.create_group(HITS_NAME).unwrap();
        for field in HIT_FIELDS.iter() {
            hits.new_dataset_builder()
                .with_data(&[1.0f64])
                .create(*field)
                .unwrap();
        }
        let tracks = table.create_group(TRACKS_NAME).unwrap();
        tracks
            .new_dataset_builder()
            .with_data(&[0u64, 1])
            .create(TRACK_POINTER_NAME)
            .unwrap();
        for field in TRACK_FIELDS[..3].iter() {
            tracks
                .new_dataset_builder()
                .with_data(&[1i32])
                .create(*field)
                .unwrap();
        }
        for field in TRACK_FIELDS[3..].iter() {
            tracks
                .new_dataset_builder()
                .with_data(&vertices)
                .create(*field)
                .unwrap();
        }
    }

    #[test]
    fn test_track_vertices_need_three_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat_tracks.h5");
        write_tracks_file(&path, Array2::zeros((1, 2)));
        assert!(matches!(
            Hdf5EventFile::open(&path, DEFAULT_TABLE_NAME),
            Err(LoaderError::MismatchedLengths(_, 3, field, 2)) if field == "start"
        ));
    }

    #[test]
    fn test_track_vertices_per_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short_tracks.h5");
        write_tracks_file(&path, Array2::zeros((2, 3)));
        assert!(matches!(
            Hdf5EventFile::open(&path, DEFAULT_TABLE_NAME),
            Err(LoaderError::MismatchedLengths(_, 1, field, 2)) if field == "start"
        ));

        let path = dir.path().join("tracks.h5");
        write_tracks_file(&path, Array2::zeros((1, 3)));
        let file = Hdf5EventFile::open(&path, DEFAULT_TABLE_NAME).unwrap();
        assert_eq!(file.read_tracks(0).unwrap().len(), 1);
    }
}
