use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::error::FrameSourceError;
use super::event::{EventCodeSet, FrameEvent};

/// The capability set every facility-specific event source exposes.
///
/// A source is opened once, walked event by event until it reports None, and
/// closed. Which implementation backs it (files, shared memory, a live
/// facility stream) is selected at configuration time; the pipeline only
/// ever talks to this interface. The byte accessors exist for progress
/// reporting and may return 0 for sources without a meaningful size.
pub trait FrameSource {
    /// Open the source and make its events available.
    fn open(&mut self) -> Result<(), FrameSourceError>;

    /// Close the source. Further calls to next_event return None.
    fn close(&mut self) -> Result<(), FrameSourceError>;

    /// The number of frame events this source holds, if known at open time.
    fn frame_count(&self) -> usize;

    /// Total size of the underlying data in bytes.
    fn total_data_size(&self) -> u64;

    /// Bytes consumed so far.
    fn bytes_consumed(&self) -> u64;

    /// Retrieve the next frame event.
    ///
    /// Returns a `Result<Option<FrameEvent>>`. The Option is None once the
    /// source has no more data.
    fn next_event(&mut self) -> Result<Option<FrameEvent>, FrameSourceError>;
}

/// A FrameSource over a run directory of HDF5 frame files, one event per
/// file.
///
/// Each file carries a 2D `data` dataset (the frame in slab layout) and
/// optionally a scalar `timestamp` and a 1D `event_codes` dataset. The
/// metadata datasets are auxiliary: a file without them yields an event with
/// timestamp 0 and an empty code set rather than an error. Files are
/// discovered at open time, sorted, and walked as a stack.
#[derive(Debug)]
pub struct Hdf5FrameSource {
    run_path: PathBuf,
    file_stack: VecDeque<(PathBuf, u64)>,
    n_files: usize,
    total_stack_size_bytes: u64,
    consumed_bytes: u64,
    is_open: bool,
}

impl Hdf5FrameSource {
    const FRAME_FILE_EXTENSION: &'static str = ".h5";

    /// Create a source for a given run directory. No IO happens until open.
    pub fn new(run_path: &Path) -> Self {
        Self {
            run_path: run_path.to_path_buf(),
            file_stack: VecDeque::new(),
            n_files: 0,
            total_stack_size_bytes: 0,
            consumed_bytes: 0,
            is_open: false,
        }
    }

    /// Get all of the frame files in the run directory and put them in the stack
    fn get_file_stack(
        parent_path: &Path,
    ) -> Result<(VecDeque<(PathBuf, u64)>, u64), FrameSourceError> {
        let mut file_list: Vec<(PathBuf, u64)> = Vec::new();
        for item in parent_path.read_dir()? {
            let item_path = item?.path();
            let item_path_str = item_path.to_string_lossy();
            if item_path_str.ends_with(Self::FRAME_FILE_EXTENSION) {
                let bytes = item_path.metadata()?.len();
                file_list.push((item_path, bytes));
            }
        }

        if file_list.is_empty() {
            return Err(FrameSourceError::NoMatchingFiles(parent_path.to_path_buf()));
        }

        let total_stack_size_bytes = file_list.iter().fold(0, |sum, (_, bytes)| sum + bytes);

        // Standard sort; frame files are numbered at the tail
        file_list.sort();
        Ok((file_list.into(), total_stack_size_bytes))
    }

    /// Read one frame event from a single HDF5 frame file.
    fn read_event(path: &Path) -> Result<FrameEvent, FrameSourceError> {
        let file = hdf5::File::open(path)?;

        let data = file
            .dataset("data")
            .and_then(|dataset| dataset.read_2d::<f64>())
            .map_err(|_| FrameSourceError::MalformedFrame(path.to_path_buf()))?;

        let timestamp = file
            .dataset("timestamp")
            .and_then(|dataset| dataset.read_scalar::<f64>())
            .unwrap_or(0.0);

        let event_codes: EventCodeSet = file
            .dataset("event_codes")
            .and_then(|dataset| dataset.read_1d::<u32>())
            .map(|codes| codes.iter().copied().collect())
            .unwrap_or_default();

        Ok(FrameEvent::new(data, timestamp, event_codes))
    }
}

impl FrameSource for Hdf5FrameSource {
    fn open(&mut self) -> Result<(), FrameSourceError> {
        let (stack, bytes) = Self::get_file_stack(&self.run_path)?;
        self.n_files = stack.len();
        self.total_stack_size_bytes = bytes;
        self.file_stack = stack;
        self.consumed_bytes = 0;
        self.is_open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), FrameSourceError> {
        self.file_stack.clear();
        self.is_open = false;
        Ok(())
    }

    fn frame_count(&self) -> usize {
        self.n_files
    }

    fn total_data_size(&self) -> u64 {
        self.total_stack_size_bytes
    }

    fn bytes_consumed(&self) -> u64 {
        self.consumed_bytes
    }

    fn next_event(&mut self) -> Result<Option<FrameEvent>, FrameSourceError> {
        if !self.is_open {
            return Err(FrameSourceError::NotOpened);
        }
        if let Some((file_path, bytes)) = self.file_stack.pop_front() {
            let event = Self::read_event(&file_path)?;
            self.consumed_bytes += bytes;
            Ok(Some(event))
        } else {
            Ok(None)
        }
    }
}
