//! Gesture Stream CLI
//!
//! Command-line interface for managing keypoint datasets and
//! demonstrating stabilized prediction with mock inputs.

use clap::{Parser, Subcommand};
use gesture_stream::{
    capture::{
        Camera, CaptureSession, FileConfig, LandmarkExtractor, MockCamera, MockExtractor,
    },
    classifier::ScriptedClassifier,
    dataset::{DatasetStats, DatasetValidator},
    metrics::{MetricsRegistry, MetricsSnapshot},
    prediction::{Prediction, Predictor},
    store::SequenceStore,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(
    name = "gesture-stream",
    version,
    about = "Keypoint dataset management and gesture prediction"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset root (overrides the configuration file)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show sequence counts per label
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the dataset is ready for training
    Validate,
    /// List labels
    Labels,
    /// Rename a label
    RenameLabel { old: String, new: String },
    /// Delete a label and all of its sequences
    DeleteLabel { label: String },
    /// Delete one sequence
    DeleteSequence { label: String, index: u32 },
    /// Rewrite legacy per-frame sequences into the consolidated layout
    Consolidate,
    /// Record sequences from the mock camera (Ctrl-C stops between frames)
    Capture {
        label: String,
        /// Sequences to record (defaults to capture.sequences_per_label)
        #[arg(long)]
        count: Option<usize>,
        /// Seed for the synthetic landmark generator
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Synthetic gesture pose to record
        #[arg(long, default_value_t = 0)]
        gesture: usize,
    },
    /// Run the predictor on mock input with a scripted classifier
    Demo {
        /// Frames to process
        #[arg(long, default_value_t = 150)]
        frames: usize,
        /// Print Prometheus metrics when finished
        #[arg(long)]
        metrics: bool,
    },
    /// Run the demo pipeline live and export its metrics over HTTP
    #[cfg(feature = "metrics")]
    Serve {
        /// Listen port (overrides metrics.port)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(root) = &cli.dataset {
        config.dataset.root = root.clone();
    }

    info!(
        "Gesture Stream v{} (dataset: {})",
        gesture_stream::VERSION,
        config.dataset.root.display()
    );

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Command, config: &FileConfig) -> CliResult {
    let store = SequenceStore::new(config.store_config());

    match command {
        Command::Stats { json } => stats(&store, json),
        Command::Validate => {
            let summary = DatasetValidator::new(config.validation.clone()).validate(&store)?;
            println!("{}", summary.message);
            Ok(())
        }
        Command::Labels => {
            for label in store.list_labels()? {
                println!("{}", label);
            }
            Ok(())
        }
        Command::RenameLabel { old, new } => {
            store.rename_label(&old, &new)?;
            println!("Renamed '{}' to '{}'", old, new);
            Ok(())
        }
        Command::DeleteLabel { label } => {
            store.delete_label(&label)?;
            println!("Deleted label '{}'", label);
            Ok(())
        }
        Command::DeleteSequence { label, index } => {
            store.delete(&label, index)?;
            println!("Deleted {}/{}", label, index);
            Ok(())
        }
        Command::Consolidate => {
            let report = store.consolidate_all()?;
            println!(
                "Migrated {} sequences ({} already consolidated, {} abandoned saves removed)",
                report.migrated, report.unchanged, report.swept
            );
            for (label, index, reason) in &report.failed {
                println!("  failed {}/{}: {}", label, index, reason);
            }
            Ok(())
        }
        Command::Capture {
            label,
            count,
            seed,
            gesture,
        } => capture(&store, config, &label, count, seed, gesture),
        Command::Demo { frames, metrics } => demo(config, frames, metrics),
        #[cfg(feature = "metrics")]
        Command::Serve { port } => serve(&store, config, port),
    }
}

fn stats(store: &SequenceStore, json: bool) -> CliResult {
    let stats = DatasetStats::compute(store)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    for (label, count) in &stats.labels {
        println!("{:<24} {:>6}", label, count);
    }
    println!(
        "{} labels, {} sequences",
        stats.total_labels, stats.total_sequences
    );
    Ok(())
}

fn capture(
    store: &SequenceStore,
    config: &FileConfig,
    label: &str,
    count: Option<usize>,
    seed: u64,
    gesture: usize,
) -> CliResult {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))?;

    let mut extractor = MockExtractor::new(store.shape().keypoints, seed);
    extractor.set_gesture(gesture);

    let count = config.capture.capture_count(count);
    let mut session = CaptureSession::new(MockCamera::new(), extractor, store, config.capture.clone())
        .with_stop_flag(stop);
    let report = session.record(label, count)?;
    session.finish();

    if report.cancelled {
        warn!(saved = report.saved.len(), "Capture interrupted");
    }
    println!(
        "Saved {} sequences for '{}' ({} frames without a hand)",
        report.saved.len(),
        label,
        report.empty_frames
    );
    Ok(())
}

/// Mock camera and extractor feeding a predictor with a scripted model.
struct DemoPipeline {
    camera: MockCamera,
    extractor: MockExtractor,
    predictor: Predictor,
}

impl DemoPipeline {
    fn new(config: &FileConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let shape = config.dataset.shape();
        let labels: Vec<String> = ["Hello", "Thanks", "Yes"].iter().map(|s| s.to_string()).collect();

        // Each gesture is held long enough to stabilize, then a few
        // ambiguous frames and one failure lead into the next.
        let mut classifier = ScriptedClassifier::new(labels.len()).cycling();
        for class in 0..labels.len() {
            let next = (class + 1) % labels.len();
            classifier = classifier
                .then_repeat(class, 0.93, 25)
                .then_repeat(next, 0.55, 3)
                .then_fail("dropped frame");
        }

        let mut predictor = Predictor::new(config.prediction.clone(), shape)?;
        predictor.load_model(Box::new(classifier), labels)?;

        let mut camera = MockCamera::new();
        camera.open(&config.capture)?;
        let extractor = MockExtractor::new(shape.keypoints, 7).with_dropout(0.05);

        Ok(Self {
            camera,
            extractor,
            predictor,
        })
    }

    /// Runs one frame through the pipeline. `None` when capture failed.
    fn step(&mut self) -> Option<Prediction> {
        match self.camera.capture() {
            Ok(frame) => Some(self.predictor.predict(self.extractor.extract(&frame))),
            Err(e) => {
                warn!("Frame capture failed: {}", e);
                None
            }
        }
    }

    fn finish(mut self) -> Predictor {
        self.camera.close();
        let stats = self.predictor.session_stats();
        info!(
            frames = stats.frames,
            stable = stats.stable_emissions,
            failures = stats.adapter_failures,
            "Demo finished"
        );
        self.predictor
    }
}

fn demo(config: &FileConfig, frames: usize, print_metrics: bool) -> CliResult {
    let mut pipeline = DemoPipeline::new(config)?;

    let mut shown: Option<String> = None;
    for i in 0..frames {
        if let Some(Prediction::Stable {
            label, confidence, ..
        }) = pipeline.step()
        {
            if shown.as_deref() != Some(label.as_str()) {
                println!("frame {:>4}: {} ({:.2})", i, label, confidence);
                shown = Some(label);
            }
        }
    }

    let predictor = pipeline.finish();
    println!("{}", serde_json::to_string_pretty(predictor.session_stats())?);

    if print_metrics {
        let registry = MetricsRegistry::new()?;
        registry.update(&MetricsSnapshot::from_components(&predictor, None));
        print!("{}", registry.encode()?);
    }
    Ok(())
}

/// Runs the demo pipeline at the capture frame rate and exports the live
/// session over HTTP until Ctrl-C.
#[cfg(feature = "metrics")]
fn serve(store: &SequenceStore, config: &FileConfig, port: Option<u16>) -> CliResult {
    use gesture_stream::metrics::{MetricsServer, MetricsServerConfig};
    use std::time::Duration;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))?;

    let mut server_config = MetricsServerConfig::from(&config.metrics);
    if let Some(port) = port {
        server_config.bind_addr.set_port(port);
    }
    let server = MetricsServer::new(server_config, MetricsRegistry::new()?);
    let state = server.state();
    println!("Serving session metrics on http://{}/metrics", server.bind_addr());

    let runtime = tokio::runtime::Runtime::new()?;
    let server_task = runtime.spawn(server.run());

    let dataset = match DatasetStats::compute(store) {
        Ok(stats) => Some(stats),
        Err(e) => {
            warn!("Dataset statistics unavailable: {}", e);
            None
        }
    };

    let mut pipeline = DemoPipeline::new(config)?;
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(config.capture.fps.max(1)));
    while !stop.load(Ordering::SeqCst) && !server_task.is_finished() {
        pipeline.step();
        let snapshot = MetricsSnapshot::from_components(&pipeline.predictor, dataset.as_ref());
        state.blocking_write().update(snapshot);
        std::thread::sleep(frame_interval);
    }
    pipeline.finish();

    if server_task.is_finished() {
        runtime.block_on(server_task)??;
    }
    runtime.shutdown_background();
    Ok(())
}
