use ndarray::Array2;

use super::error::AveragerError;
use super::peak_finder::PeakList;

/// Batches per-frame peak lists and flushes the merged list every
/// `accumulated_shots` calls.
///
/// Designed to run on a single aggregation point that receives per-frame
/// results sequentially; one instance has exactly one owner and is never
/// shared. A flush happens within the call that brings the count to the
/// target, so a full accumulator is never observable from outside.
#[derive(Debug, Clone)]
pub struct PeakAccumulator {
    accumulated_shots: usize,
    accumulator: PeakList,
    shots_in_accumulator: usize,
}

impl PeakAccumulator {
    pub fn new(accumulated_shots: usize) -> Self {
        Self {
            accumulated_shots,
            accumulator: PeakList::new(),
            shots_in_accumulator: 0,
        }
    }

    /// Add one frame's peaks to the batch.
    ///
    /// Returns the merged batch once every `accumulated_shots` calls, with
    /// peaks in call order and, within a call, in their input order. All
    /// other calls return None, which is distinct from flushing an empty
    /// list: a batch of peak-less frames flushes as an empty PeakList.
    pub fn accumulate(&mut self, peak_list: &PeakList) -> Option<PeakList> {
        self.accumulator.extend_from(peak_list);
        self.shots_in_accumulator += 1;

        if self.shots_in_accumulator == self.accumulated_shots {
            self.shots_in_accumulator = 0;
            Some(std::mem::take(&mut self.accumulator))
        } else {
            None
        }
    }

    /// Number of shots currently sitting in the partial batch.
    pub fn shots_in_accumulator(&self) -> usize {
        self.shots_in_accumulator
    }
}

/// Builds the average of `accumulated_shots` frames and flushes it every
/// `accumulated_shots` calls.
///
/// Each frame is divided by the target count before being added, so the
/// running array holds a true partial average at every step. The reset
/// happens lazily at the top of the cycle after a flush: the flushed average
/// stays readable, unmodified, until the next call arrives. The returned
/// borrow ties the caller to consuming the average before accumulating
/// again.
#[derive(Debug, Clone)]
pub struct FrameAverager {
    accumulated_shots: usize,
    slab_shape: (usize, usize),
    num_frames: usize,
    average: Array2<f64>,
}

impl FrameAverager {
    pub fn new(accumulated_shots: usize, slab_shape: (usize, usize)) -> Self {
        Self {
            accumulated_shots,
            slab_shape,
            num_frames: 0,
            average: Array2::zeros(slab_shape),
        }
    }

    /// Add one frame to the running average.
    ///
    /// Returns a borrow of the completed average on every
    /// `accumulated_shots`-th call and None otherwise. A frame whose shape
    /// does not match the configured slab shape is rejected without touching
    /// the accumulation state.
    pub fn accumulate(&mut self, frame: &Array2<f64>) -> Result<Option<&Array2<f64>>, AveragerError> {
        if frame.dim() != self.slab_shape {
            return Err(AveragerError::MismatchedFrameShape(
                frame.dim(),
                self.slab_shape,
            ));
        }

        if self.num_frames == self.accumulated_shots {
            self.num_frames = 0;
            self.average.fill(0.0);
        }

        self.average += &(frame / self.accumulated_shots as f64);
        self.num_frames += 1;

        if self.num_frames == self.accumulated_shots {
            Ok(Some(&self.average))
        } else {
            Ok(None)
        }
    }

    /// Number of frames currently folded into the partial average.
    ///
    /// Reports 0 right after a flush even though the reset has not happened
    /// yet; the flushed cycle is complete, not partial.
    pub fn frames_in_average(&self) -> usize {
        if self.num_frames == self.accumulated_shots {
            0
        } else {
            self.num_frames
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_peak(x: f64, y: f64, intensity: f64) -> PeakList {
        let mut peaks = PeakList::new();
        peaks.push(x, y, intensity);
        peaks
    }

    #[test]
    fn test_peak_accumulator_flushes_every_target_calls() {
        let mut accumulator = PeakAccumulator::new(3);
        assert!(accumulator.accumulate(&single_peak(1.0, 10.0, 100.0)).is_none());
        assert!(accumulator.accumulate(&single_peak(2.0, 20.0, 200.0)).is_none());
        let batch = accumulator
            .accumulate(&single_peak(3.0, 30.0, 300.0))
            .expect("third call must flush");
        assert_eq!(batch.x, vec![1.0, 2.0, 3.0]);
        assert_eq!(batch.y, vec![10.0, 20.0, 30.0]);
        assert_eq!(batch.intensity, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_peak_accumulator_cycles_identically() {
        let mut accumulator = PeakAccumulator::new(2);
        accumulator.accumulate(&single_peak(1.0, 1.0, 1.0));
        let first = accumulator.accumulate(&single_peak(2.0, 2.0, 2.0)).unwrap();
        assert_eq!(first.len(), 2);
        // The next cycle starts from an empty batch
        assert!(accumulator.accumulate(&single_peak(3.0, 3.0, 3.0)).is_none());
        let second = accumulator.accumulate(&single_peak(4.0, 4.0, 4.0)).unwrap();
        assert_eq!(second.x, vec![3.0, 4.0]);
    }

    #[test]
    fn test_peak_accumulator_flushes_empty_batches() {
        let mut accumulator = PeakAccumulator::new(2);
        assert!(accumulator.accumulate(&PeakList::new()).is_none());
        let batch = accumulator.accumulate(&PeakList::new());
        // A flush of peak-less frames is Some(empty), not None
        assert_eq!(batch, Some(PeakList::new()));
    }

    #[test]
    fn test_averager_returns_mean_on_flush() {
        let mut averager = FrameAverager::new(2, (4, 4));
        let frame_a = Array2::from_elem((4, 4), 2.0);
        let frame_b = Array2::from_elem((4, 4), 4.0);
        assert!(averager.accumulate(&frame_a).unwrap().is_none());
        let average = averager.accumulate(&frame_b).unwrap().unwrap().clone();
        assert_eq!(average, Array2::from_elem((4, 4), 3.0));
    }

    #[test]
    fn test_averager_resets_lazily_on_next_cycle() {
        let mut averager = FrameAverager::new(2, (2, 2));
        averager.accumulate(&Array2::from_elem((2, 2), 2.0)).unwrap();
        averager.accumulate(&Array2::from_elem((2, 2), 4.0)).unwrap();
        // A third call starts a fresh cycle: the old sum must be gone
        assert!(averager
            .accumulate(&Array2::from_elem((2, 2), 10.0))
            .unwrap()
            .is_none());
        let average = averager
            .accumulate(&Array2::from_elem((2, 2), 20.0))
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(average, Array2::from_elem((2, 2), 15.0));
    }

    #[test]
    fn test_averager_constant_frames_round_trip() {
        let mut averager = FrameAverager::new(5, (3, 3));
        let frame = Array2::from_elem((3, 3), 7.5);
        for _ in 0..4 {
            assert!(averager.accumulate(&frame).unwrap().is_none());
        }
        let average = averager.accumulate(&frame).unwrap().unwrap();
        for value in average.iter() {
            assert!((value - 7.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_averager_rejects_mismatched_shape() {
        let mut averager = FrameAverager::new(2, (4, 4));
        let bad_frame = Array2::<f64>::zeros((4, 5));
        assert!(averager.accumulate(&bad_frame).is_err());
    }
}
