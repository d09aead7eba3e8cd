use std::sync::mpsc::Sender;

use super::accumulator::{FrameAverager, PeakAccumulator};
use super::aggregate_writer::AggregateWriter;
use super::calibration::{CalibrationData, DarkcalCorrector};
use super::config::Config;
use super::error::ProcessorError;
use super::frame_source::{FrameSource, Hdf5FrameSource};
use super::laser_status::LaserStatusClassifier;
use super::peak_finder::PeakFinder;
use super::worker_status::{BarColor, WorkerStatus};

/// The main loop of sfx_monitor.
///
/// This takes in a config (and progress monitor) and runs the full
/// correction, peak finding, and accumulation pipeline over one run of
/// frame data. Frames that fail correction are logged and skipped; the run
/// keeps going.
pub fn process_run(
    config: &Config,
    run_number: i32,
    tx: &Sender<WorkerStatus>,
    worker_id: &usize,
) -> Result<(), ProcessorError> {
    let run_dir = config.get_run_directory(run_number)?;
    let mut source = Hdf5FrameSource::new(&run_dir);
    source.open()?;
    log::info!(
        "Total run size: {} across {} frames",
        human_bytes::human_bytes(source.total_data_size() as f64),
        source.frame_count()
    );

    let calibration = CalibrationData::load(config)?;
    let slab_shape = calibration.slab_shape();
    let corrector = DarkcalCorrector::new(calibration)?;
    let peak_finder = PeakFinder::new(config.threshold, config.window_size);
    let laser_status = LaserStatusClassifier::new(config.laser_on_event_codes.clone());
    let mut peak_accumulator = PeakAccumulator::new(config.accumulated_shots);
    let mut frame_averager = FrameAverager::new(config.accumulated_shots, slab_shape);
    let mut writer = AggregateWriter::new(&config.get_output_file_name(run_number)?)?;

    let total_data_size = source.total_data_size();
    let flush_frac: f32 = 0.01;
    let flush_val = (total_data_size as f64 * flush_frac as f64) as u64;
    let mut reported_bytes: u64 = 0;

    let mut n_events: u64 = 0;
    let mut n_hits: u64 = 0;
    let mut hit_rate: f32 = 0.0;
    let mut batch_counter: u64 = 0;
    let mut average_counter: u64 = 0;

    log::info!("Processing frame data...");
    tx.send(WorkerStatus::new(
        0.0,
        0.0,
        run_number,
        *worker_id,
        BarColor::CYAN,
    ))?;
    loop {
        let event = match source.next_event()? {
            Some(event) => event,
            //If the source returns none, there is no more data to be read
            None => break,
        };
        n_events += 1;

        if source.bytes_consumed() - reported_bytes > flush_val {
            reported_bytes = source.bytes_consumed();
            tx.send(WorkerStatus::new(
                reported_bytes as f32 / total_data_size as f32,
                hit_rate,
                run_number,
                *worker_id,
                BarColor::CYAN,
            ))?;
        }

        let corrected = match corrector.correct(&event.data) {
            Ok(corrected) => corrected,
            Err(e) => {
                log::warn!("Skipping frame {}: {e}", n_events - 1);
                continue;
            }
        };

        let peaks = peak_finder.find_peaks(&corrected);
        let laser_on = laser_status.is_on(&event.event_codes);

        if peaks.len() >= config.min_peaks_for_hit && !peaks.is_empty() {
            n_hits += 1;
        }
        hit_rate = n_hits as f32 / n_events as f32;

        if let Some(batch) = peak_accumulator.accumulate(&peaks) {
            writer.write_peak_batch(&batch, &batch_counter)?;
            batch_counter += 1;
        }

        // Only pump-off frames contribute to the reference average
        if !laser_on {
            match frame_averager.accumulate(&corrected) {
                Ok(Some(average)) => {
                    writer.write_average_frame(average, &average_counter)?;
                    average_counter += 1;
                }
                Ok(None) => (),
                Err(e) => log::warn!("Frame {} not averaged: {e}", n_events - 1),
            }
        }
    }

    if peak_accumulator.shots_in_accumulator() != 0 {
        log::info!(
            "Discarding a partial peak batch of {} shots at end of run.",
            peak_accumulator.shots_in_accumulator()
        );
    }
    if frame_averager.frames_in_average() != 0 {
        log::info!(
            "Discarding a partial average of {} frames at end of run.",
            frame_averager.frames_in_average()
        );
    }

    source.close()?;
    writer.close()?;

    tx.send(WorkerStatus::new(
        1.0,
        hit_rate,
        run_number,
        *worker_id,
        BarColor::CYAN,
    ))?;
    log::info!(
        "Done with frame data: {} events, {} hits ({:.1}% hit rate).",
        n_events,
        n_hits,
        hit_rate * 100.0
    );
    Ok(())
}

/// The function to be called by a separate thread (typically the UI).
/// Allows multiple runs to be processed
pub fn process(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<(), ProcessorError> {
    for run in config.first_run_number..(config.last_run_number + 1) {
        if config.does_run_exist(run) {
            log::info!("Processing run {}...", run);
            process_run(&config, run, &tx, &worker_id)?;
            log::info!("Finished processing run {}.", run);
        } else {
            log::info!("Run {} does not exist, skipping...", run);
        }
    }
    Ok(())
}

/// Process a subset of runs
pub fn process_subset(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<i32>,
) -> Result<(), ProcessorError> {
    for run in subset {
        if config.does_run_exist(run) {
            log::info!("Processing run {}...", run);
            process_run(&config, run, &tx, &worker_id)?;
            log::info!("Finished processing run {}.", run);
        } else {
            log::info!("Run {} does not exist, skipping...", run);
        }
    }
    Ok(())
}

/// Divide a run range in to a set of subranges (per thread/worker)
pub fn create_subsets(config: &Config) -> Vec<Vec<i32>> {
    let mut subsets: Vec<Vec<i32>> = vec![Vec::new(); config.n_threads as usize];
    let n_subsets = subsets.len();

    for (idx, run) in (config.first_run_number..(config.last_run_number + 1)).enumerate() {
        subsets[idx % n_subsets].push(run)
    }

    subsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_subsets_deals_runs_round_robin() {
        let mut config = Config::default();
        config.first_run_number = 0;
        config.last_run_number = 4;
        config.n_threads = 2;
        let subsets = create_subsets(&config);
        assert_eq!(subsets.len(), 2);
        assert_eq!(subsets[0], vec![0, 2, 4]);
        assert_eq!(subsets[1], vec![1, 3]);
    }

    #[test]
    fn test_create_subsets_leaves_extra_workers_empty() {
        let mut config = Config::default();
        config.first_run_number = 1;
        config.last_run_number = 2;
        config.n_threads = 3;
        let subsets = create_subsets(&config);
        assert_eq!(subsets.iter().filter(|s| !s.is_empty()).count(), 2);
    }
}
