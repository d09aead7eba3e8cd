use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("Could not load calibration data because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Calibration data failed to load due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Calibration array {0} has shape {1:?} which does not match the darkcal shape {2:?}")]
    MismatchedShape(&'static str, (usize, usize), (usize, usize)),
}

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("DarkcalCorrector was given a frame of shape {0:?}; expected the darkcal shape {1:?}")]
    MismatchedFrameShape((usize, usize), (usize, usize)),
}

#[derive(Debug, Error)]
pub enum AveragerError {
    #[error("FrameAverager was given a frame of shape {0:?}; expected the slab shape {1:?}")]
    MismatchedFrameShape((usize, usize), (usize, usize)),
}

#[derive(Debug, Error)]
pub enum FrameSourceError {
    #[error("FrameSource failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("FrameSource failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("FrameSource did not find any frame files in the run directory {0:?}")]
    NoMatchingFiles(PathBuf),
    #[error("Frame file {0:?} does not contain a 2D data block")]
    MalformedFrame(PathBuf),
    #[error("FrameSource was asked for an event before being opened")]
    NotOpened,
}

#[derive(Debug, Error)]
pub enum AggregateWriterError {
    #[error("AggregateWriter failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("AggregateWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Calibration error: {0}")]
    CalibrationError(#[from] CalibrationError),
    #[error("Processor failed due to FrameSource error: {0}")]
    SourceError(#[from] FrameSourceError),
    #[error("Processor failed due to AggregateWriter error: {0}")]
    WriterError(#[from] AggregateWriterError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
