use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use libsfx_monitor::config::Config;
use libsfx_monitor::process::{create_subsets, process_subset};
use libsfx_monitor::worker_status::WorkerStatus;

fn make_template_config(path: &Path) {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config).unwrap();
    let mut file = File::create(path).expect("Could create template config file!");
    file.write_all(yaml_str.as_bytes())
        .expect("Failed to write yaml data to file!");
}

fn main() {
    // Create a cli
    let matches = Command::new("sfx_monitor_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    // Parse the cli
    let config_path = PathBuf::from(matches.get_one::<String>("path").expect("We require args"));

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );

        make_template_config(&config_path);
        log::info!("Done.");
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Frame Path: {}", config.frame_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!("Darkcal Path: {}", config.darkcal_path.to_string_lossy());
    log::info!(
        "Peak Threshold: {} Window Size: {}",
        config.threshold,
        config.window_size
    );
    log::info!("Accumulated Shots: {}", config.accumulated_shots);
    log::info!(
        "First Run: {} Last Run: {}",
        config.first_run_number,
        config.last_run_number
    );

    if !config.is_n_threads_valid() {
        log::error!("Number of workers must be at least 1!");
        return;
    }
    if !config.is_window_size_valid() {
        log::error!("The center-of-mass window size must be positive and odd!");
        return;
    }
    if !config.is_accumulated_shots_valid() {
        log::error!("The number of accumulated shots must be at least 1!");
        return;
    }

    // One progress bar per worker, keyed by worker id
    let mut bars: Vec<Option<ProgressBar>> = vec![None; config.n_threads as usize];
    let bar_style = ProgressStyle::with_template("{prefix} [{bar:40.cyan}] {pos}% {msg}")
        .expect("Could not create progress bar style!");

    // Spawn the workers!
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let mut workers = Vec::new();
    for (idx, subset) in create_subsets(&config).into_iter().enumerate() {
        // Dont make empty workers
        if subset.is_empty() {
            continue;
        }
        let conf = config.clone();
        let worker_tx = tx.clone();
        let bar = pb_manager.add(ProgressBar::new(100));
        bar.set_style(bar_style.clone());
        bar.set_prefix(format!("Worker {idx}"));
        bars[idx] = Some(bar);
        workers.push(std::thread::spawn(move || {
            process_subset(conf, worker_tx, idx, subset)
        }));
    }
    // Drop our sender so the receive loop ends when the workers hang up
    drop(tx);

    while let Ok(status) = rx.recv() {
        if let Some(bar) = &bars[status.worker_id] {
            bar.set_position((status.progress * 100.0) as u64);
            bar.set_message(format!(
                "run {} hit rate {:.1}%",
                status.run_number,
                status.hit_rate * 100.0
            ));
        }
    }

    for worker in workers {
        match worker.join() {
            Ok(result) => match result {
                Ok(_) => log::info!("Worker complete"),
                Err(e) => log::error!("Processor error: {e}"),
            },
            Err(_) => log::error!("An error occured joining one of the workers!"),
        }
    }

    for bar in bars.into_iter().flatten() {
        bar.finish();
    }

    log::info!("Done.");
}
