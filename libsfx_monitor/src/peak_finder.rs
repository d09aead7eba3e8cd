use ndarray::{s, Array2};

/// The maximum number of candidates a single frame is allowed to produce.
///
/// Counts above this are treated as a misconfigured threshold rather than a
/// physical result. The frame yields an empty list and processing moves on.
const MAX_PEAKS_PER_FRAME: usize = 10_000;

/// A list of Bragg-peak candidates as three parallel sequences.
///
/// The coordinate sequences hold the (possibly sub-pixel refined) slow-scan
/// and fast-scan positions of each peak; the intensity sequence holds the
/// value of the originating pixel. All three always have the same length and
/// are kept in discovery order. An empty list is a valid result, distinct
/// from "no result yet" which callers express with `Option::None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakList {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl PeakList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            intensity: Vec::with_capacity(capacity),
        }
    }

    /// Append a single peak, keeping the three sequences in lockstep.
    pub fn push(&mut self, x: f64, y: f64, intensity: f64) {
        self.x.push(x);
        self.y.push(y);
        self.intensity.push(intensity);
    }

    /// Append all peaks of another list, preserving their order.
    pub fn extend_from(&mut self, other: &PeakList) {
        self.x.extend_from_slice(&other.x);
        self.y.extend_from_slice(&other.y);
        self.intensity.extend_from_slice(&other.intensity);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Threshold-based peak detection with sub-pixel refinement.
///
/// A pixel is a peak candidate if it is not strictly exceeded by any of its
/// eight neighbors and its value is strictly above the configured threshold.
/// Candidate positions are then refined to sub-pixel precision using the
/// intensity-weighted center of mass of a square window centered on the
/// candidate.
#[derive(Debug, Clone)]
pub struct PeakFinder {
    threshold: f64,
    window_size: usize,
}

impl PeakFinder {
    /// Create a new PeakFinder.
    ///
    /// `window_size` is the half-width of the center-of-mass window; the full
    /// window spans `2 * window_size + 1` pixels per axis.
    pub fn new(threshold: f64, window_size: usize) -> Self {
        Self {
            threshold,
            window_size,
        }
    }

    /// Find peaks in a frame, in 'slab' layout.
    ///
    /// Returns the peak list in discovery order (row-major scan). An empty
    /// list is returned both when nothing is above threshold and when the
    /// runaway-candidate guard trips.
    pub fn find_peaks(&self, frame: &Array2<f64>) -> PeakList {
        let (rows, cols) = frame.dim();

        let mut candidates: Vec<(usize, usize)> = Vec::new();
        for x in 0..rows {
            for y in 0..cols {
                let value = frame[[x, y]];
                if value <= self.threshold {
                    continue;
                }
                if self.is_local_maximum(frame, x, y, value) {
                    candidates.push((x, y));
                }
            }
        }

        if candidates.len() > MAX_PEAKS_PER_FRAME {
            log::warn!(
                "Silly number of peaks {}; returning an empty peak list",
                candidates.len()
            );
            return PeakList::new();
        }

        let mut peaks = PeakList::with_capacity(candidates.len());
        for (x, y) in candidates {
            let value = frame[[x, y]];
            match self.refine_position(frame, x, y) {
                Some((sub_x, sub_y)) => peaks.push(sub_x, sub_y, value),
                None => peaks.push(x as f64, y as f64, value),
            }
        }
        peaks
    }

    /// A pixel is a local maximum when no pixel in its 3x3 block strictly
    /// exceeds it. Plateaus of equal values therefore yield one candidate per
    /// plateau pixel.
    fn is_local_maximum(&self, frame: &Array2<f64>, x: usize, y: usize, value: f64) -> bool {
        let (rows, cols) = frame.dim();
        let x_lo = x.saturating_sub(1);
        let y_lo = y.saturating_sub(1);
        let x_hi = (x + 2).min(rows);
        let y_hi = (y + 2).min(cols);
        for nx in x_lo..x_hi {
            for ny in y_lo..y_hi {
                if frame[[nx, ny]] > value {
                    return false;
                }
            }
        }
        true
    }

    /// Refine a candidate to sub-pixel precision with a windowed center of
    /// mass. Returns None when the window cannot be extracted.
    ///
    /// A window reaching past the low edge of the frame is degenerate and the
    /// candidate keeps its integer coordinates. A window clipped at the high
    /// edge is used as-is, with the offset still measured from the nominal
    /// window center.
    fn refine_position(&self, frame: &Array2<f64>, x: usize, y: usize) -> Option<(f64, f64)> {
        let half = self.window_size;
        if x < half || y < half {
            return None;
        }
        let (rows, cols) = frame.dim();
        let x_lo = x - half;
        let y_lo = y - half;
        let x_hi = (x + half + 1).min(rows);
        let y_hi = (y + half + 1).min(cols);
        let window = frame.slice(s![x_lo..x_hi, y_lo..y_hi]);

        let mut total = 0.0;
        let mut moment_x = 0.0;
        let mut moment_y = 0.0;
        for ((wx, wy), value) in window.indexed_iter() {
            total += *value;
            moment_x += wx as f64 * *value;
            moment_y += wy as f64 * *value;
        }

        let offset_x = moment_x / total - half as f64;
        let offset_y = moment_y / total - half as f64;
        Some((x as f64 + offset_x, y as f64 + offset_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame_has_no_peaks() {
        let finder = PeakFinder::new(10.0, 3);
        let frame = Array2::<f64>::zeros((32, 32));
        let peaks = finder.find_peaks(&frame);
        assert!(peaks.x.is_empty());
        assert!(peaks.y.is_empty());
        assert!(peaks.intensity.is_empty());
    }

    #[test]
    fn test_isolated_pixel() {
        let finder = PeakFinder::new(10.0, 3);
        let mut frame = Array2::<f64>::zeros((32, 32));
        frame[[15, 20]] = 100.0;
        let peaks = finder.find_peaks(&frame);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks.x[0], 15.0);
        assert_eq!(peaks.y[0], 20.0);
        assert_eq!(peaks.intensity[0], 100.0);
    }

    #[test]
    fn test_pixel_below_threshold_ignored() {
        let finder = PeakFinder::new(10.0, 3);
        let mut frame = Array2::<f64>::zeros((32, 32));
        frame[[15, 20]] = 10.0; // Not strictly above the threshold
        let peaks = finder.find_peaks(&frame);
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_subpixel_refinement_moves_toward_true_center() {
        let finder = PeakFinder::new(1.0, 3);
        // Gaussian-like bump with its true center off the pixel grid
        let true_x = 16.3;
        let true_y = 14.7;
        let mut frame = Array2::<f64>::zeros((32, 32));
        for ((x, y), value) in frame.indexed_iter_mut() {
            let dx = x as f64 - true_x;
            let dy = y as f64 - true_y;
            *value = 100.0 * (-(dx * dx + dy * dy) / 4.0).exp();
        }
        let peaks = finder.find_peaks(&frame);
        assert_eq!(peaks.len(), 1);
        // The brightest pixel is (16, 15); refinement must beat it
        let integer_dist = (16.0 - true_x).hypot(15.0 - true_y);
        let refined_dist = (peaks.x[0] - true_x).hypot(peaks.y[0] - true_y);
        assert!(refined_dist < integer_dist);
    }

    #[test]
    fn test_runaway_guard_returns_empty() {
        let finder = PeakFinder::new(0.5, 3);
        // A constant frame above threshold makes every pixel a candidate
        let frame = Array2::<f64>::ones((110, 110));
        let peaks = finder.find_peaks(&frame);
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_plateau_yields_candidate_per_pixel() {
        let finder = PeakFinder::new(10.0, 3);
        let mut frame = Array2::<f64>::zeros((32, 32));
        frame[[15, 20]] = 100.0;
        frame[[15, 21]] = 100.0;
        let peaks = finder.find_peaks(&frame);
        assert_eq!(peaks.len(), 2);
    }

    #[test]
    fn test_peak_at_low_edge_is_unrefined() {
        let finder = PeakFinder::new(10.0, 3);
        let mut frame = Array2::<f64>::zeros((32, 32));
        frame[[0, 0]] = 100.0;
        let peaks = finder.find_peaks(&frame);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks.x[0], 0.0);
        assert_eq!(peaks.y[0], 0.0);
    }

    #[test]
    fn test_intensity_is_pixel_value_not_recomputed() {
        let finder = PeakFinder::new(1.0, 1);
        let mut frame = Array2::<f64>::zeros((16, 16));
        frame[[8, 8]] = 50.0;
        frame[[8, 9]] = 40.0; // Pulls the center of mass off-pixel
        let peaks = finder.find_peaks(&frame);
        assert_eq!(peaks.len(), 1);
        assert!(peaks.y[0] > 8.0);
        assert_eq!(peaks.intensity[0], 50.0);
    }
}
