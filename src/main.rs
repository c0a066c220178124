use chrono::Local;
use clap::Parser;
use crossbeam_channel::{tick, unbounded, Receiver};
use spectrum_tail::{
    args::{convert_filter, Args},
    monitoring::PipelineStats,
    playback::TickOutcome,
    Aggregator, Collector, Command, Config, DashboardView, Monitor, PlaybackController,
    SweepQueue,
};
use std::{
    io::BufRead,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};
use tracing::{info, warn};

/// Stand-in for the dashboard: log what it would draw
fn present(view: &DashboardView) {
    if let Some(latest) = &view.latest {
        let rec = &latest.record;
        info!(
            file = %rec.source_file().display(),
            sweep = %format!("{}/{}", rec.sweep_index() + 1, rec.total_sweeps()),
            points = rec.frequencies().len(),
            "Spectrum @ {} | peak {:.2} dBm at {:.3} MHz | avg {:.2} dBm | total {:.2} dBm",
            rec.raw_timestamp(),
            latest.stats.peak_dbm,
            latest.stats.peak_mhz,
            latest.stats.average_dbm,
            latest.integrated.dbm
        );
    }
    if let Some(summary) = &view.summary {
        info!(
            samples = summary.count,
            "Window: current {:.2} avg {:.2} min {:.2} max {:.2} range {:.2} dB over {:.1} min",
            summary.current,
            summary.average,
            summary.min,
            summary.max,
            summary.range(),
            summary.span.num_milliseconds() as f64 / 60_000.0
        );
    }
}

/// A line typed at the console: a playback control or a request to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleInput {
    Control(Command),
    Quit,
}

fn parse_console(line: &str) -> Result<ConsoleInput, String> {
    match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => Ok(ConsoleInput::Quit),
        other => other.parse().map(ConsoleInput::Control),
    }
}

/// Read console input from stdin, one per line
fn spawn_console() -> Receiver<ConsoleInput> {
    let (sender, receiver) = unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_console(&line) {
                Ok(input) => {
                    if sender.send(input).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{} (try p, r or q)", e),
            }
        }
    });
    receiver
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .init();
    let config = Config::from(&args);

    std::fs::create_dir_all(&config.data_dir)?;
    info!(
        dir = %config.data_dir.display(),
        window_min = config.window.as_secs() / 60,
        poll_ms = config.poll_interval.as_millis() as u64,
        tick_ms = config.tick_interval.as_millis() as u64,
        capacity = config.capacity,
        "Real-time spectrum monitor"
    );

    // Shared state
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Release))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    }
    let stats = Arc::new(PipelineStats::default());
    let queue = Arc::new(SweepQueue::new(config.capacity, stats.clone()));
    let playback = Arc::new(PlaybackController::new(queue.clone()));

    // Start tailing on its own thread
    let collector = Collector::new(&config, queue.clone());
    let collector_handle = {
        let shutdown = shutdown.clone();
        thread::spawn(move || collector.run(shutdown))
    };

    // Consume on a fixed tick, independent of the collector
    let mut monitor = Monitor::new(
        Aggregator::new(config.window, stats.clone()),
        queue,
        playback.clone(),
    );
    let commands = spawn_console();
    let ticker = tick(config.tick_interval);
    while !shutdown.load(Ordering::Acquire) {
        let _ = ticker.recv();
        // Controls land before the tick so they take effect within one tick
        for input in commands.try_iter() {
            match input {
                ConsoleInput::Control(Command::TogglePlay) => {
                    playback.toggle_play();
                }
                ConsoleInput::Control(Command::Reset) => {
                    playback.reset();
                }
                ConsoleInput::Quit => shutdown.store(true, Ordering::Release),
            }
        }
        if let TickOutcome::Updated(_) = monitor.tick(Local::now().naive_local()) {
            present(&monitor.view());
        }
    }

    info!("Shutting down gracefully...");
    let _ = collector_handle.join();
    info!(stats = ?stats.snapshot(), "Monitor stopped");
    Ok(())
}
