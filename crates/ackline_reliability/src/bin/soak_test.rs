//! # ACKLINE Soak Test
//!
//! Runs two endpoints against each other over simulated lossy links and
//! checks that no packet is ever acked without being delivered.
//!
//! Logging goes through `RUST_LOG` (default `info`).

use std::process::ExitCode;
use std::time::Instant;

use ackline_reliability::{
    LinkStats, NetworkConditions, ProtocolConfig, SoakConfig, SoakHarness, SoakReport,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         ACKLINE SOAK TEST                                        ║");
    println!("║         DELIVERY TRACKING UNDER LOSS                             ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config = SoakConfig::default();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--iterations" | "-n" => {
                if i + 1 < args.len() {
                    config.iterations = args[i + 1].parse().unwrap_or(config.iterations);
                    i += 1;
                }
            }
            "--seed" | "-s" => {
                if i + 1 < args.len() {
                    config.seed = args[i + 1].parse().unwrap_or(config.seed);
                    i += 1;
                }
            }
            "--network" | "-w" => {
                if i + 1 < args.len() {
                    match NetworkConditions::preset(&args[i + 1]) {
                        Some(conditions) => config.conditions = conditions,
                        None => {
                            eprintln!("unknown network preset '{}'", args[i + 1]);
                            return ExitCode::from(2);
                        }
                    }
                    i += 1;
                }
            }
            "--loss" | "-l" => {
                if i + 1 < args.len() {
                    config.conditions.packet_loss_percent = args[i + 1]
                        .parse::<u8>()
                        .map_or(config.conditions.packet_loss_percent, |p| p.min(100));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: soak_test [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --iterations <NUM>     Ticks to run (default: 10000)");
                println!("  -s, --seed <SEED>          Link RNG seed (default: 24301)");
                println!("  -w, --network <PRESET>     perfect | good | average | poor (default: average)");
                println!("  -l, --loss <PERCENT>       Override packet loss percentage");
                println!("  -c, --config <FILE>        Protocol config TOML file");
                println!("  -h, --help                 Show this help");
                return ExitCode::SUCCESS;
            }
            other => {
                eprintln!("ignoring unknown argument '{other}'");
            }
        }
        i += 1;
    }

    if let Some(path) = config_path {
        match ProtocolConfig::load(&path) {
            Ok(protocol) => config.protocol = protocol,
            Err(e) => {
                eprintln!("failed to load {path}: {e}");
                return ExitCode::from(2);
            }
        }
    }

    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Iterations:         {}", config.iterations);
    println!("│ Seed:               {}", config.seed);
    println!(
        "│ Network:            {}% loss, {}% duplicate, {}% reorder",
        config.conditions.packet_loss_percent,
        config.conditions.duplicate_percent,
        config.conditions.out_of_order_percent
    );
    println!("│ Protocol ID:        {:#010x}", config.protocol.protocol_id);
    println!("│ Max Packet Size:    {} bytes", config.protocol.max_packet_size);
    println!("│ Window Size:        {}", config.protocol.sliding_window_size);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let start = Instant::now();
    let report = match SoakHarness::new(config).and_then(SoakHarness::run) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("soak aborted: {e}");
            return ExitCode::FAILURE;
        }
    };
    let elapsed = start.elapsed();

    print_report(&report);
    println!("│ Elapsed:            {:.2?}", elapsed);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    if report.passed() {
        println!("✓ PASSED");
        ExitCode::SUCCESS
    } else {
        println!("✗ FAILED");
        ExitCode::FAILURE
    }
}

fn print_report(report: &SoakReport) {
    println!("┌─ RESULTS ───────────────────────────────────────────────────────┐");
    println!("│ Iterations:         {}", report.iterations);
    for (name, counters, link) in [
        ("A", &report.a, &report.link_ab),
        ("B", &report.b, &report.link_ba),
    ] {
        println!(
            "│ Endpoint {name}:         written {} / read {} / acked {} / discarded {}",
            counters.packets_written,
            counters.packets_read,
            counters.packets_acked,
            counters.packets_discarded
        );
        println!("│ Link from {name}:        {}", describe_link(link));
    }
    println!("│ False Acks:         {}", report.false_acks);
    println!("│ Payload Mismatches: {}", report.payload_mismatches);
}

fn describe_link(stats: &LinkStats) -> String {
    let loss = if stats.sent == 0 {
        0.0
    } else {
        stats.dropped as f64 * 100.0 / stats.sent as f64
    };
    format!(
        "sent {} / dropped {} ({loss:.1}%) / dup {} / reordered {}",
        stats.sent, stats.dropped, stats.duplicated, stats.reordered
    )
}
