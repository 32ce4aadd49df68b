//! # wc_display
//!
//! wc_display is an event display for cylindrical water Cherenkov detectors, written in
//! Rust. It reads photodetector hits (position, charge, time) from HDF5 event files and
//! draws them either on an unrolled map of the detector surface (the barrel opened into
//! a rectangle with the two end caps as discs above and below) or as points in a 3D view
//! of the tank, optionally with the truth tracks of the event. Barrel hits are circles,
//! top cap hits squares, bottom cap hits triangles, and hits away from the detector
//! surface hollow circles.
//!
//! The workspace has three parts: this library, the GUI browser `wc_display` and the
//! batch renderer `wc_display_cli`.
//!
//! ## Installation
//!
//! The only method of install is from source, which is laid out below.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### HDF5
//!
//! Before building and running wc_display, HDF5 must be installed. Typically this will
//! be installed using a package manager (homebrew, apt, etc), and the Rust libraries will
//! auto detect the location of the HDF install. If HDF5 lives in a custom location, write
//! the following snippet into the file `.cargo/config.toml` in the repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! ### Building & Install
//!
//! To build and install the GUI use `cargo install --path ./wc_display`, and for the CLI
//! `cargo install --path ./wc_display_cli`, from the top level of the repository.
//!
//! ## Configuration
//!
//! A configuration file saved using the GUI is compatible with the CLI and vice-versa. The
//! YAML format of a configuration file is as follows:
//!
//! ```yml
//! experiment: SK
//! data_path: events.h5
//! table: root_event
//! display: '0'
//! channel: charge
//! mode: unrolled
//! show_photon_tracks: false
//! extra_data:
//! - field: energy
//!   unit: MeV
//! profiles_path: null
//! output:
//!   directory: .
//!   file_stem: null
//!   format: png
//!   width: 1000
//!   height: 1000
//! ```
//!
//! `display` selects the events: `all`, a single index `12`, a range `3:10` (stop
//! excluded) or a list `1|76|356` shown in that order. `channel` is `charge` or `time`,
//! `mode` is `unrolled` (2D) or `volume` (3D). In 3D each truth track is drawn through
//! the creation points of its daughters; optical photon tracks are only drawn with
//! `show_photon_tracks`. `extra_data` lists event-level scalars to
//! print in the title; fields missing from the file are reported and skipped. If
//! `file_stem` is `null` images are named after the data file.
//!
//! ### Detectors
//!
//! The bundled detector table knows `SK`, `HK`, `HK_realistic`, `WCTE`, `WCTE_r` and
//! `DEMO`. `profiles_path` may point to a YAML file of the same layout to add detectors
//! or replace bundled ones:
//!
//! ```yml
//! MY_TANK:
//!   height: 300.0        # cm, full height
//!   radius: 150.0        # cm
//!   pmt_radius: 4.0      # cm
//!   marker_radius: 2.0   # optional, drawn marker size
//!   vertical_axis: z     # z, or y for data with y along the cylinder
//!   cap_tolerance: 10.0  # hits this close below a cap plane belong to the cap
//!   surface_tolerance: 20.0
//! ```
//!
//! ## Input
//!
//! ### HDF5 Data Format
//!
//! Hits of all events are stored in flat arrays, sliced per event by an index pointer:
//!
//! ```text
//! events.h5
//! root_event - version
//! |---- index_pointer(dset, n_events + 1)
//! |---- hits
//! |    |---- hitx, hity, hitz, charge, time(dset)
//! |---- scalars
//! |    |---- energy, dwall, towall, ...(dset, n_events)
//! |---- tracks
//! |    |---- track_pointer(dset, n_events + 1)
//! |    |---- pid, track_id, parent_id(dset)
//! |    |---- start, stop(dset, n_tracks x 3)
//! ```
//!
//! `scalars` and `tracks` are optional. The CLI `demo` command writes a file of synthetic
//! events in this format.
//!
//! ## Output
//!
//! Rendered events are saved as `<directory>/<file_stem>_<event>.<png|svg>`. The GUI
//! writes its log to `wc_display.log` in the working directory; the CLI logs to the
//! terminal.
pub mod browser;
pub mod color;
pub mod config;
pub mod demo;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hdf_reader;
pub mod hdf_writer;
pub mod loader;
pub mod projector;
pub mod render;
pub mod scene;
pub mod selection;
pub mod source;
