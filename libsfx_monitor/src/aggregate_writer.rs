use hdf5::types::VarLenUnicode;
use hdf5::File;
use ndarray::Array2;
use std::path::Path;
use std::str::FromStr;

use super::error::AggregateWriterError;
use super::peak_finder::PeakList;

const PEAKS_NAME: &str = "peaks";
const FRAMES_NAME: &str = "frames";

// All batch counters start from 0 by law
const START_BATCH_NUMBER: u64 = 0;
/// This is the version of the output format
const FORMAT_VERSION: &str = "1.0";

/// A simple struct which wraps around the hdf5-rust library.
///
/// Opens an HDF5 file for writing flushed aggregates. Each flushed peak
/// batch lands in the peaks group as a batch_# subgroup holding the three
/// parallel datasets; each flushed average image lands in the frames group
/// as an average_# dataset. Only flushed aggregates ever reach the writer.
#[derive(Debug)]
pub struct AggregateWriter {
    file_handle: File, //Idk if this needs to be kept alive, but I think it does
    peaks_group: hdf5::Group,
    frames_group: hdf5::Group,
    last_batch: u64,
    last_average: u64,
    n_batches: u64,
    n_averages: u64,
}
// Structure
// peaks - min_batch, max_batch, version, written_unix
// |---- batch_# - n_peaks
// |    |---- x(dset)
// |    |---- y(dset)
// |    |---- intensity(dset)
// frames
// |---- average_#(dset)

impl AggregateWriter {
    /// Create the writer, opening a file at path and creating the data groups
    pub fn new(path: &Path) -> Result<Self, AggregateWriterError> {
        let file_handle = File::create(path)?;

        let monitor_version = format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION);

        let peaks_group = file_handle.create_group(PEAKS_NAME)?;
        peaks_group.new_attr::<u64>().create("min_batch")?;
        peaks_group.new_attr::<u64>().create("max_batch")?;
        peaks_group
            .new_attr::<hdf5::types::VarLenUnicode>()
            .create("version")?;
        peaks_group
            .attr("version")?
            .write_scalar(&VarLenUnicode::from_str(&monitor_version).unwrap())?;
        peaks_group
            .new_attr::<i64>()
            .create("written_unix")?
            .write_scalar(&time::OffsetDateTime::now_utc().unix_timestamp())?;

        let frames_group = file_handle.create_group(FRAMES_NAME)?;

        Ok(Self {
            file_handle,
            peaks_group,
            frames_group,
            last_batch: 0,
            last_average: 0,
            n_batches: 0,
            n_averages: 0,
        })
    }

    /// Write a flushed peak batch as three parallel datasets
    pub fn write_peak_batch(
        &mut self,
        batch: &PeakList,
        batch_counter: &u64,
    ) -> Result<(), AggregateWriterError> {
        if *batch_counter > self.last_batch {
            self.last_batch = *batch_counter;
        }
        self.n_batches += 1;

        let batch_group = self
            .peaks_group
            .create_group(&format!("batch_{}", batch_counter))?;
        batch_group
            .new_dataset_builder()
            .with_data(&batch.x)
            .create("x")?;
        batch_group
            .new_dataset_builder()
            .with_data(&batch.y)
            .create("y")?;
        batch_group
            .new_dataset_builder()
            .with_data(&batch.intensity)
            .create("intensity")?;
        batch_group
            .new_attr::<u64>()
            .create("n_peaks")?
            .write_scalar(&(batch.len() as u64))?;

        Ok(())
    }

    /// Write a flushed average image
    pub fn write_average_frame(
        &mut self,
        average: &Array2<f64>,
        average_counter: &u64,
    ) -> Result<(), AggregateWriterError> {
        if *average_counter > self.last_average {
            self.last_average = *average_counter;
        }
        self.n_averages += 1;

        self.frames_group
            .new_dataset_builder()
            .with_data(average)
            .create(format!("average_{}", average_counter).as_str())?;

        Ok(())
    }

    /// Write meta information on first and last batches, consume the writer
    pub fn close(self) -> Result<(), AggregateWriterError> {
        self.peaks_group
            .attr("min_batch")?
            .write_scalar(&START_BATCH_NUMBER)?;
        self.peaks_group
            .attr("max_batch")?
            .write_scalar(&self.last_batch)?;
        log::info!(
            "{} peak batches and {} average images written.",
            self.n_batches,
            self.n_averages,
        );
        Ok(())
    }
}
