//! Binary entry point: logging setup, command dispatch, error rendering.

mod cli;
mod drive;
mod error_fmt;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Returns the appender guard when file logging is on; the caller must keep
/// it alive so buffered lines flush at exit.
fn init_tracing(
    json: bool,
    level: &str,
    logging: &vcu_config::Logging,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(filter.boxed());
    if json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(fmt::layer().with_writer(std::io::stderr).boxed());
    }

    let mut guard = None;
    if let Some(path) = logging.file.as_deref() {
        let p = std::path::Path::new(path);
        let dir = p.parent().filter(|d| !d.as_os_str().is_empty());
        let name = p.file_name().map_or("vcu.log".into(), |n| n.to_os_string());
        let dir = dir.unwrap_or_else(|| std::path::Path::new("."));
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, g) = tracing_appender::non_blocking(appender);
        guard = Some(g);
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        );
    }

    tracing_subscriber::registry().with(layers).init();
    guard
}

fn run() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    let _ = cli::JSON_MODE.set(args.json);

    // The identifier contract needs no config at all.
    if matches!(args.cmd, Commands::Contract) {
        let _guard = init_tracing(args.json, &args.log_level, &vcu_config::Logging::default());
        println!("{}", serde_json::to_string_pretty(&drive::contract_json())?);
        return Ok(());
    }

    let cfg = drive::load_config(
        &args.config,
        args.throttle_map.as_deref(),
        args.brake_map.as_deref(),
    )?;
    let _guard = init_tracing(args.json, &args.log_level, &cfg.logging);

    match args.cmd {
        Commands::Drive { duration_ms, stats } => {
            let summary = drive::run_drive(&cfg, duration_ms)?;
            if stats {
                if args.json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "car_status": format!("{:?}", summary.car_status),
                            "overruns": summary.overruns,
                            "tx_errors": summary.tx_errors,
                        })
                    );
                } else {
                    eprintln!("\n--- Session Stats ---");
                    eprintln!("Final car status: {:?}", summary.car_status);
                    eprintln!("Scheduler overruns: {}", summary.overruns);
                    eprintln!("Transmit errors: {}", summary.tx_errors);
                    eprintln!("---------------------\n");
                }
            }
            Ok(())
        }
        Commands::CheckConfig => {
            if args.json {
                println!("{}", serde_json::json!({ "config": "ok" }));
            } else {
                println!("config ok");
            }
            Ok(())
        }
        Commands::SelfCheck => {
            drive::self_check(&cfg)?;
            if args.json {
                println!("{}", serde_json::json!({ "self_check": "ok" }));
            } else {
                println!("self check ok");
            }
            Ok(())
        }
        Commands::Contract => unreachable!("handled above"),
    }
}

fn main() {
    if let Err(err) = run() {
        let json = cli::JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}
