use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ConfigError;

/// Structure representing the monitor configuration. Contains pathing, run
/// information, and the pipeline parameters.
/// Configs are serializable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub frame_path: PathBuf,
    pub output_path: PathBuf,
    pub darkcal_path: PathBuf,
    pub darkcal_group: String,
    pub mask_path: Option<PathBuf>,
    pub mask_group: Option<String>,
    pub gain_map_path: Option<PathBuf>,
    pub gain_map_group: Option<String>,
    pub threshold: f64,
    pub window_size: usize,
    pub accumulated_shots: usize,
    pub laser_on_event_codes: Option<Vec<u32>>,
    pub min_peaks_for_hit: usize,
    pub first_run_number: i32,
    pub last_run_number: i32,
    pub n_threads: i32,
}

impl Default for Config {
    /// Generate a new Config object. All fields will be empty/invalid
    fn default() -> Self {
        Self {
            frame_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            darkcal_path: PathBuf::from("None"),
            darkcal_group: String::from("data"),
            mask_path: None,
            mask_group: None,
            gain_map_path: None,
            gain_map_group: None,
            threshold: 0.0,
            window_size: 0,
            accumulated_shots: 0,
            laser_on_event_codes: None,
            min_peaks_for_hit: 0,
            first_run_number: 0,
            last_run_number: 0,
            n_threads: 1,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check if a specific run exists by evaluating the existence of its
    /// frame directory
    pub fn does_run_exist(&self, run_number: i32) -> bool {
        let run_dir: PathBuf = self.frame_path.join(self.get_run_str(run_number));
        run_dir.exists()
    }

    /// Get the path to a run's frame directory
    pub fn get_run_directory(&self, run_number: i32) -> Result<PathBuf, ConfigError> {
        let run_dir: PathBuf = self.frame_path.join(self.get_run_str(run_number));
        if run_dir.exists() {
            Ok(run_dir)
        } else {
            Err(ConfigError::BadFilePath(run_dir))
        }
    }

    /// Get the path to the aggregate output file for a run
    pub fn get_output_file_name(&self, run_number: i32) -> Result<PathBuf, ConfigError> {
        let output_file_path: PathBuf = self
            .output_path
            .join(format!("{}.h5", self.get_run_str(run_number)));
        if self.output_path.exists() {
            Ok(output_file_path)
        } else {
            Err(ConfigError::BadFilePath(self.output_path.clone()))
        }
    }

    /// Construct the run string using the beamtime directory format
    fn get_run_str(&self, run_number: i32) -> String {
        format!("run_{run_number:0>4}")
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }

    /// The center-of-mass window half-width must be positive and odd
    pub fn is_window_size_valid(&self) -> bool {
        self.window_size > 0 && self.window_size % 2 == 1
    }

    pub fn is_accumulated_shots_valid(&self) -> bool {
        self.accumulated_shots >= 1
    }

    pub fn has_mask(&self) -> bool {
        self.mask_path.is_some()
    }

    pub fn has_gain_map(&self) -> bool {
        self.gain_map_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_round_trip() {
        let mut config = Config::default();
        config.threshold = 250.0;
        config.window_size = 3;
        config.accumulated_shots = 50;
        config.laser_on_event_codes = Some(vec![40, 41]);
        let yaml_str = serde_yaml::to_string(&config).unwrap();
        let parsed = serde_yaml::from_str::<Config>(&yaml_str).unwrap();
        assert_eq!(parsed.threshold, 250.0);
        assert_eq!(parsed.window_size, 3);
        assert_eq!(parsed.accumulated_shots, 50);
        assert_eq!(parsed.laser_on_event_codes, Some(vec![40, 41]));
    }

    #[test]
    fn test_validity_helpers() {
        let mut config = Config::default();
        assert!(config.is_n_threads_valid());
        assert!(!config.is_window_size_valid());
        assert!(!config.is_accumulated_shots_valid());

        config.n_threads = 0;
        config.window_size = 4;
        config.accumulated_shots = 10;
        assert!(!config.is_n_threads_valid());
        assert!(!config.is_window_size_valid());
        assert!(config.is_accumulated_shots_valid());

        config.window_size = 5;
        assert!(config.is_window_size_valid());
    }
}
