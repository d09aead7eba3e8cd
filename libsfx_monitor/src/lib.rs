//! # sfx_monitor
//!
//! sfx_monitor is an online monitoring pipeline for serial X-ray diffraction
//! experiments, written in Rust. It ingests a stream of detector frames, applies
//! per-frame flat-field corrections and Bragg-peak finding on a pool of workers,
//! accumulates the per-frame results into batches, and periodically writes the
//! aggregated results (peak batches, averaged reference images) in the HDF5
//! format for a downstream viewer running at a much lower frequency than the
//! frame rate.
//!
//! ## Installation
//!
//! In the future we may deploy to crates.io, but currently the only method of
//! install is from source.
//!
//! ### HDF5
//!
//! Before building and running sfx_monitor, HDF5 must be installed. Typically
//! this will be installed using a package manager (homebrew, apt, etc), and the
//! Rust libraries will auto detect the location of the HDF install. However,
//! this is not always possible. Sometimes a newer version will need to be
//! installed to a custom location. If this is the case, write the following
//! snippet into the file `.cargo/config.toml` in the sfx_monitor repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! Replace `/path/to/my/hdf5/install/` with the path to your HDF5 installation.
//!
//! ### Building & Install
//!
//! To build and install the CLI monitor use `cargo install --path ./sfx_monitor_cli`
//! from the top level sfx_monitor repository.
//!
//! ## Configuration
//!
//! The monitor is configured with a YAML file:
//!
//! ```yml
//! frame_path: None
//! output_path: None
//! darkcal_path: None
//! darkcal_group: data
//! mask_path: null
//! mask_group: null
//! gain_map_path: null
//! gain_map_group: null
//! threshold: 250.0
//! window_size: 3
//! accumulated_shots: 50
//! laser_on_event_codes:
//! - 40
//! - 41
//! min_peaks_for_hit: 10
//! first_run_number: 0
//! last_run_number: 0
//! n_threads: 1
//! ```
//!
//! - frame_path: full path to a directory which contains the run_# frame
//!   directories written by the facility layer (one HDF5 file per frame)
//! - output_path: full path to a directory to which aggregate HDF5 (.h5)
//!   files will be written
//! - darkcal_path / darkcal_group: HDF5 file holding the dark reference
//!   frame and the dataset path within it
//! - mask_path / mask_group (Optional): pixel mask applied multiplicatively
//!   before dark subtraction. If set to `null`, no mask is applied.
//! - gain_map_path / gain_map_group (Optional): per-pixel gain correction
//!   applied after dark subtraction. If set to `null`, no gain map is applied.
//! - threshold: intensity threshold for peak candidates
//! - window_size: half-width of the center-of-mass refinement window. Must be
//!   odd.
//! - accumulated_shots: number of frames merged into each flushed aggregate
//! - laser_on_event_codes (Optional): event codes that must all be present
//!   for a frame to count as pump-laser on. If set to `null`, the laser is
//!   reported as always off.
//! - min_peaks_for_hit: minimum peak count for a frame to count as a hit
//! - First/Last Run Number: the run range to process (inclusive)
//! - n_threads: the number of parallel worker threads to divide the runs
//!   amongst. Must be at least 1.
//!
//! ## Output
//!
//! sfx_monitor writes one aggregate HDF5 file per run:
//!
//! ```text
//! run_0001.h5
//! peaks - min_batch, max_batch, version, written_unix
//! |---- batch_# - n_peaks
//! |    |---- x(dset)
//! |    |---- y(dset)
//! |    |---- intensity(dset)
//! frames
//! |---- average_#(dset)
//! ```
//!
//! Each batch_# group holds the peaks of `accumulated_shots` consecutive
//! frames in call order; each average_# dataset is the mean of
//! `accumulated_shots` pump-off corrected frames.
pub mod accumulator;
pub mod aggregate_writer;
pub mod calibration;
pub mod config;
pub mod error;
pub mod event;
pub mod frame_source;
pub mod laser_status;
pub mod peak_finder;
pub mod process;
pub mod worker_status;
