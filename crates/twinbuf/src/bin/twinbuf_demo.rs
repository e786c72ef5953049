//! # TWINBUF Demo
//!
//! Headless orbit simulation on a worker thread, edited by a scripted
//! editor on the main thread.
//!
//! ```bash
//! twinbuf_demo --cycles 600
//! twinbuf_demo --config twinbuf.toml
//! RUST_LOG=twinbuf=debug twinbuf_demo --cycles 120 --unthrottled
//! ```

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use twinbuf::core::DoubleBufferStore;
use twinbuf::demo::{Orbit, OrbitKeys, OrbitSimulation, ScriptedEditor};
use twinbuf::{RunConfig, Runtime};

fn print_usage() {
    println!("Usage: twinbuf_demo [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>        Load a TOML run configuration");
    println!("  -n, --cycles <NUM>         Stop after NUM sync cycles (default: 600)");
    println!("  -u, --unthrottled          Run worker and editor without pacing");
    println!("  -h, --help                 Show this help");
}

fn initialise_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Parsed command line.
#[derive(Debug, Default, PartialEq, Eq)]
struct Cli {
    config_path: Option<String>,
    cycles: Option<u64>,
    unthrottled: bool,
    help: bool,
}

/// Parses everything after the program name. Returns the offending
/// argument as an error message.
fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut cli = Cli::default();

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--config" | "-c" => {
                let Some(path) = args.get(i + 1) else {
                    return Err(format!("{flag} requires a path"));
                };
                cli.config_path = Some(path.clone());
                i += 1;
            }
            "--cycles" | "-n" => {
                let Some(value) = args.get(i + 1) else {
                    return Err(format!("{flag} requires a number"));
                };
                match value.parse() {
                    Ok(cycles) => cli.cycles = Some(cycles),
                    Err(_) => return Err(format!("Invalid cycle count: {value}")),
                }
                i += 1;
            }
            "--unthrottled" | "-u" => cli.unthrottled = true,
            "--help" | "-h" => cli.help = true,
            other => return Err(format!("Unknown argument: {other}")),
        }
        i += 1;
    }

    Ok(cli)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    if cli.help {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let mut config = match cli.config_path {
        Some(path) => match RunConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("✗ FATAL: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => RunConfig {
            max_cycles: Some(600),
            ..RunConfig::default()
        },
    };
    if let Some(cycles) = cli.cycles {
        config.max_cycles = Some(cycles);
    }
    if cli.unthrottled {
        config.tick_rate_hz = 0;
        config.editor_fps = 0;
    }

    initialise_tracing(&config.log_level);

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                    TWINBUF ORBIT DEMO                            ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Tick rate:   {} Hz", config.tick_rate_hz);
    println!("  Editor FPS:  {}", config.editor_fps);
    println!("  Max cycles:  {:?}", config.max_cycles);
    println!();

    let runtime = match Runtime::new(config) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("✗ FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };

    let live = Orbit::default();
    let mut store = DoubleBufferStore::new(&live);
    let keys = OrbitKeys::declare(&mut store);
    let editor = ScriptedEditor::new(keys);

    let report = match runtime.run(live, store, OrbitSimulation::default(), editor) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("✗ FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("┌─ RUN ──────────────────────────────────────────────────────────┐");
    println!("│ Sync Cycles:        {}", report.cycles);
    println!("│ Editor Frames:      {} ({} drawn)", report.frames, report.draws);
    println!("│ Region Overlaps:    {}", report.overlaps);
    println!("│ Reversals:          {}", report.view.reversals());
    println!("│ Zoom Edits:         {}", report.view.zooms());
    println!("│ Trail Clears:       {}", report.view.clears());
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!("┌─ STORE ────────────────────────────────────────────────────────┐");
    println!("│ Merges:             {}", report.store_stats.merges);
    println!("│ Pushed to Live:     {}", report.store_stats.pushed_to_live);
    println!("│ Pushed to Shadow:   {}", report.store_stats.pushed_to_shadow);
    println!("│ Mirrored:           {}", report.store_stats.mirrored);
    println!("│ Tasks Run:          {}", report.store_stats.tasks_run);
    println!("│ Ephemeral Released: {}", report.store_stats.released);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    report.timing.print_summary();

    if let Some(frame) = report.view.last_drawn() {
        println!();
        println!(
            "  Last frame #{}: angle {:.3} rad, zoom {:.2}, {} trail points",
            frame.frame, frame.angle, frame.zoom, frame.trail_points
        );
    }

    if report.overlaps > 0 {
        eprintln!("✗ Regions were entered concurrently");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
