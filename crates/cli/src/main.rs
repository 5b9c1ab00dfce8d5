//! SHARP cache side-channel simulator CLI.
//!
//! This binary drives the simulator in three modes. It performs:
//! 1. **Trace run:** Replay a text trace of victim events against the hierarchy.
//! 2. **Synthetic run:** Attack a square-and-multiply victim for a given key, optionally repeated and merged.
//! 3. **Sweep:** Repeat the synthetic attack across spy activation probabilities.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::{fs, process};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sharpsim_core::attack::{KeyScore, RecoveredKey, merge_partial_keys, parse_bits};
use sharpsim_core::config::Config;
use sharpsim_core::sim::trace;
use sharpsim_core::{RunReport, Simulator, SquareMultiply};

#[derive(Parser, Debug)]
#[command(
    name = "sharpsim",
    author,
    version,
    about = "SHARP cache hierarchy and side-channel attack simulator",
    long_about = "Replay victim traces or attack a synthetic square-and-multiply victim through a private L2 and a SHARP-managed shared L3.\n\nLogging is controlled with RUST_LOG (default: warn).\n\nExamples:\n  sharpsim run --trace victim.trace\n  sharpsim synth --key 1011001 --repeat 5\n  sharpsim sweep --key 1011001 --config shared.json"
)]
struct Cli {
    /// Report sections to print (summary, alarms, memory, attack); all when omitted.
    #[arg(long, global = true, value_delimiter = ',')]
    sections: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a text trace.
    Run {
        /// Trace file (`I <addr>`, `R <addr> [core]`, `W <addr> [core]`).
        #[arg(short, long)]
        trace: PathBuf,

        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Attack a synthetic square-and-multiply victim.
    Synth {
        /// Secret exponent as a 0/1 string, most significant bit first.
        #[arg(short, long)]
        key: String,

        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Independent runs (seeds `seed..seed+n`) merged into one key.
        #[arg(long, default_value_t = 1)]
        repeat: u64,
    },

    /// Sweep the activation probability from 0.01 to 0.99 in steps of 0.02.
    Sweep {
        /// Secret exponent as a 0/1 string, most significant bit first.
        #[arg(short, long)]
        key: String,

        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the results as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// One point of a probability sweep.
#[derive(Debug, Serialize)]
struct SweepPoint {
    probability: f64,
    correct_bits: usize,
    key_bits: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { trace, config } => cmd_run(&trace, config.as_deref(), &cli.sections),
        Commands::Synth {
            key,
            config,
            repeat,
        } => cmd_synth(&key, config.as_deref(), repeat, &cli.sections),
        Commands::Sweep { key, config, json } => cmd_sweep(&key, config.as_deref(), json),
    }
}

/// Loads the JSON configuration at `path`, or the defaults.
///
/// Exits with code 1 when the file cannot be read or parsed.
fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config {}: {}", path.display(), e);
        process::exit(1);
    });
    let config = Config::from_json(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing config {}: {}", path.display(), e);
        process::exit(1);
    });
    debug!(path = %path.display(), ?config, "loaded configuration");
    config
}

fn load_key(key: &str) -> Vec<bool> {
    match parse_bits(key) {
        Ok(bits) if !bits.is_empty() => bits,
        Ok(_) => {
            eprintln!("Error: --key must contain at least one bit");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Runs one synthetic attack and returns its report.
fn attack(config: Config, key: &[bool]) -> RunReport {
    let victim = SquareMultiply::new(key.to_vec(), &config.attack);
    Simulator::new(config)
        .and_then(|sim| sim.run(victim.events()))
        .unwrap_or_else(|e| {
            eprintln!("[!] Simulation failed: {e}");
            process::exit(1);
        })
}

fn cmd_run(trace_path: &Path, config: Option<&Path>, sections: &[String]) {
    let config = load_config(config);
    let events = trace::read_trace(trace_path).unwrap_or_else(|e| {
        eprintln!("Error reading trace {}: {}", trace_path.display(), e);
        process::exit(1);
    });

    println!("[*] Trace: {} ({} events)", trace_path.display(), events.len());
    let report = Simulator::new(config)
        .and_then(|sim| sim.run(events))
        .unwrap_or_else(|e| {
            eprintln!("[!] Simulation failed: {e}");
            process::exit(1);
        });
    report.print_sections(sections);
}

fn cmd_synth(key: &str, config: Option<&Path>, repeat: u64, sections: &[String]) {
    let config = load_config(config);
    let original = load_key(key);
    let repeat = repeat.max(1);

    let mut keys: Vec<RecoveredKey> = Vec::new();
    let mut last = None;
    for run in 0..repeat {
        let mut run_config = config.clone();
        run_config.seed = config.seed.wrapping_add(run);
        let report = attack(run_config, &original);
        println!("[*] Run {run}: {}", report.key);
        keys.push(report.key.clone());
        last = Some(report);
    }

    if let Some(report) = last {
        report.print_sections(sections);
    }

    let merged = merge_partial_keys(&keys);
    for position in &merged.conflicts {
        println!("Conflict at position {position}");
    }
    let score = KeyScore::aligned(&merged.key, &original);
    println!("Combined Full Key: {}", merged.key);
    println!("Original Key:      {key}");
    println!("Hits: {}", score.hits);
    println!("Duplicates: {}", score.duplicates);
    println!("Errors: {}", score.errors);
    println!("Unknowns in combined full key: {}", merged.key.unknowns());
    if score.overrun > 0 {
        println!("LONG {}", score.overrun);
    }
    println!(
        "Positional correct bits: {}/{}",
        KeyScore::positional_matches(&merged.key, &original),
        original.len()
    );
}

fn cmd_sweep(key: &str, config: Option<&Path>, json: bool) {
    let config = load_config(config);
    let original = load_key(key);

    let points: Vec<SweepPoint> = (1..100)
        .step_by(2)
        .map(|percent| {
            let probability = f64::from(percent) / 100.0;
            let mut run_config = config.clone();
            run_config.attack.activation_probability = probability;
            let report = attack(run_config, &original);
            SweepPoint {
                probability,
                correct_bits: KeyScore::positional_matches(&report.key, &original),
                key_bits: original.len(),
            }
        })
        .collect();

    if json {
        match serde_json::to_string_pretty(&points) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error encoding sweep: {e}");
                process::exit(1);
            }
        }
        return;
    }
    for point in &points {
        println!("{:.2} --> {}", point.probability, point.correct_bits);
    }
}
