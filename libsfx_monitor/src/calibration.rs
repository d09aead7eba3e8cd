use std::path::Path;

use ndarray::Array2;

use super::config::Config;
use super::error::{CalibrationError, CorrectionError};

/// The per-run calibration arrays: a dark reference plus optional mask and
/// gain map, all in the detector's slab shape.
///
/// Loaded once at the start of a run and immutable afterwards. The mask and
/// gain map are multiplicative; when absent the identity is used.
#[derive(Debug, Clone)]
pub struct CalibrationData {
    pub dark: Array2<f64>,
    pub mask: Option<Array2<f64>>,
    pub gain_map: Option<Array2<f64>>,
}

impl CalibrationData {
    /// Load the calibration arrays named in the config from their HDF5 files.
    ///
    /// The darkcal is required; mask and gain map are loaded only when a path
    /// is configured. A missing file or dataset is fatal.
    pub fn load(config: &Config) -> Result<Self, CalibrationError> {
        let dark = Self::load_slab(&config.darkcal_path, &config.darkcal_group)?;

        let mask = match &config.mask_path {
            Some(path) => Some(Self::load_slab(
                path,
                config.mask_group.as_deref().unwrap_or("data"),
            )?),
            None => None,
        };

        let gain_map = match &config.gain_map_path {
            Some(path) => Some(Self::load_slab(
                path,
                config.gain_map_group.as_deref().unwrap_or("data"),
            )?),
            None => None,
        };

        Ok(Self {
            dark,
            mask,
            gain_map,
        })
    }

    /// The detector slab shape, dictated by the dark reference.
    pub fn slab_shape(&self) -> (usize, usize) {
        self.dark.dim()
    }

    /// Read a single 2D array from an HDF5 file at the given dataset path.
    fn load_slab(path: &Path, group: &str) -> Result<Array2<f64>, CalibrationError> {
        if !path.exists() {
            return Err(CalibrationError::BadFilePath(path.to_path_buf()));
        }
        let file = hdf5::File::open(path)?;
        let dataset = file.dataset(group)?;
        Ok(dataset.read_2d::<f64>()?)
    }
}

/// Applies flat-field correction (dark subtraction with optional mask and
/// gain map) to raw frames.
///
/// The correction is `(frame * mask - dark) * gain_map`, with mask and gain
/// map defaulting to 1. Masking happens before the dark subtraction, so
/// masked pixels come out at `-dark * gain` rather than 0. Downstream
/// consumers rely on that exact output, so the order of operations is load
/// bearing. Owns its calibration data for the lifetime of the run.
#[derive(Debug, Clone)]
pub struct DarkcalCorrector {
    dark: Array2<f64>,
    mask: Option<Array2<f64>>,
    gain_map: Option<Array2<f64>>,
}

impl DarkcalCorrector {
    /// Create a corrector, validating that every calibration array matches
    /// the darkcal shape.
    pub fn new(calibration: CalibrationData) -> Result<Self, CalibrationError> {
        let dark_shape = calibration.dark.dim();
        if let Some(mask) = &calibration.mask {
            if mask.dim() != dark_shape {
                return Err(CalibrationError::MismatchedShape(
                    "mask",
                    mask.dim(),
                    dark_shape,
                ));
            }
        }
        if let Some(gain_map) = &calibration.gain_map {
            if gain_map.dim() != dark_shape {
                return Err(CalibrationError::MismatchedShape(
                    "gain map",
                    gain_map.dim(),
                    dark_shape,
                ));
            }
        }
        Ok(Self {
            dark: calibration.dark,
            mask: calibration.mask,
            gain_map: calibration.gain_map,
        })
    }

    /// The slab shape this corrector accepts.
    pub fn slab_shape(&self) -> (usize, usize) {
        self.dark.dim()
    }

    /// Apply the correction, producing a new frame.
    ///
    /// The input is never mutated; a frame of the wrong shape is rejected.
    pub fn correct(&self, frame: &Array2<f64>) -> Result<Array2<f64>, CorrectionError> {
        if frame.dim() != self.dark.dim() {
            return Err(CorrectionError::MismatchedFrameShape(
                frame.dim(),
                self.dark.dim(),
            ));
        }

        let mut corrected = frame.to_owned();
        if let Some(mask) = &self.mask {
            corrected *= mask;
        }
        corrected -= &self.dark;
        if let Some(gain_map) = &self.gain_map {
            corrected *= gain_map;
        }
        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration(
        dark: Array2<f64>,
        mask: Option<Array2<f64>>,
        gain_map: Option<Array2<f64>>,
    ) -> CalibrationData {
        CalibrationData {
            dark,
            mask,
            gain_map,
        }
    }

    #[test]
    fn test_dark_subtraction_only() {
        let dark = Array2::from_elem((4, 4), 1.5);
        let corrector = DarkcalCorrector::new(calibration(dark, None, None)).unwrap();
        let frame = Array2::from_elem((4, 4), 10.0);
        let corrected = corrector.correct(&frame).unwrap();
        assert_eq!(corrected, Array2::from_elem((4, 4), 8.5));
    }

    #[test]
    fn test_mask_applied_before_dark_subtraction() {
        let dark = Array2::from_elem((2, 2), 3.0);
        let mut mask = Array2::from_elem((2, 2), 1.0);
        mask[[0, 0]] = 0.0;
        let mut gain_map = Array2::from_elem((2, 2), 2.0);
        gain_map[[1, 1]] = 4.0;
        let corrector =
            DarkcalCorrector::new(calibration(dark, Some(mask), Some(gain_map))).unwrap();

        let frame = Array2::from_elem((2, 2), 10.0);
        let corrected = corrector.correct(&frame).unwrap();
        // Masked pixel lands at -dark * gain, not 0
        assert_eq!(corrected[[0, 0]], -6.0);
        assert_eq!(corrected[[0, 1]], 14.0);
        assert_eq!(corrected[[1, 1]], 28.0);
    }

    #[test]
    fn test_mask_only() {
        let dark = Array2::from_elem((2, 2), 3.0);
        let mut mask = Array2::from_elem((2, 2), 1.0);
        mask[[1, 0]] = 0.0;
        let corrector = DarkcalCorrector::new(calibration(dark, Some(mask), None)).unwrap();
        let frame = Array2::from_elem((2, 2), 10.0);
        let corrected = corrector.correct(&frame).unwrap();
        assert_eq!(corrected[[1, 0]], -3.0);
        assert_eq!(corrected[[0, 0]], 7.0);
    }

    #[test]
    fn test_gain_map_only() {
        let dark = Array2::from_elem((3, 3), 1.0);
        let gain_map = Array2::from_elem((3, 3), 0.5);
        let corrector = DarkcalCorrector::new(calibration(dark, None, Some(gain_map))).unwrap();
        let frame = Array2::from_elem((3, 3), 5.0);
        let corrected = corrector.correct(&frame).unwrap();
        assert_eq!(corrected, Array2::from_elem((3, 3), 2.0));
    }

    #[test]
    fn test_mismatched_mask_rejected_at_construction() {
        let dark = Array2::<f64>::zeros((4, 4));
        let mask = Array2::<f64>::ones((4, 5));
        assert!(DarkcalCorrector::new(calibration(dark, Some(mask), None)).is_err());
    }

    #[test]
    fn test_mismatched_frame_rejected() {
        let dark = Array2::<f64>::zeros((4, 4));
        let corrector = DarkcalCorrector::new(calibration(dark, None, None)).unwrap();
        let frame = Array2::<f64>::zeros((5, 4));
        assert!(corrector.correct(&frame).is_err());
    }

    #[test]
    fn test_input_frame_is_not_mutated() {
        let dark = Array2::from_elem((2, 2), 1.0);
        let corrector = DarkcalCorrector::new(calibration(dark, None, None)).unwrap();
        let frame = Array2::from_elem((2, 2), 4.0);
        let _ = corrector.correct(&frame).unwrap();
        assert_eq!(frame, Array2::from_elem((2, 2), 4.0));
    }
}
