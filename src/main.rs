use clap::Parser;
use log::{error, info, warn};
use netmon::configuration::config::Config;
use netmon::configuration::types::SinkKind;
use netmon::controller::controller_handler::Controller;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netmon")]
#[command(version)]
#[command(about = "Raw frame capture with layer classification and replay/backup routing")]
struct Args {
    /// Interface to capture from
    interface: Option<String>,

    /// TOML configuration file
    #[arg(long, env = "NETMON_CONFIG")]
    config: Option<PathBuf>,

    /// Capture deadline in seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Source IPv4 address filter, prompted for when absent
    #[arg(long)]
    src_filter: Option<String>,

    /// Destination IPv4 address filter, prompted for when absent
    #[arg(long)]
    dst_filter: Option<String>,

    /// Re-inject replayed frames on this interface instead of discarding them
    #[arg(long)]
    replay_interface: Option<String>,

    /// Also write the summary as JSON to this file
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(_) => line.trim().to_string(),
        Err(e) => {
            warn!("Unable to read from stdin: {}", e);
            String::new()
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Importing configuration from {}", path.display());
            Config::from_file(path).unwrap_or_else(|e| {
                error!("Unable to import configuration from file: {}", e);
                std::process::exit(1);
            })
        }
        None => Config::default(),
    };

    // A missing interface is not treated as an error
    let Some(interface) = args.interface.clone().or_else(|| config.interface.clone()) else {
        println!("Usage: sudo netmon <interface> [OPTIONS]");
        return;
    };

    if let Some(secs) = args.duration_secs {
        config.capture_duration_secs = secs;
    }
    if let Some(replay_interface) = args.replay_interface {
        config.replay.sink = SinkKind::Interface;
        config.replay.interface = replay_interface;
    }
    if let Some(filter) = args.src_filter {
        config.admission.source_filter = filter;
    } else if config.admission.source_filter.is_empty() {
        config.admission.source_filter = prompt("Enter source IP filter (blank=all): ");
    }
    if let Some(filter) = args.dst_filter {
        config.admission.destination_filter = filter;
    } else if config.admission.destination_filter.is_empty() {
        config.admission.destination_filter = prompt("Enter destination IP filter (blank=all): ");
    }

    let controller = Controller::new(config).unwrap_or_else(|e| {
        error!("Unable to create a controller instance: {}, exiting...", e);
        std::process::exit(1);
    });

    let run = match controller.run(&interface).await {
        Ok(run) => run,
        Err(e) => {
            error!("Capture aborted: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n{}", run.report);

    if let Some(path) = args.summary_json {
        if let Err(e) = run.report.write_json(&path) {
            error!("Unable to write summary to {}: {}", path.display(), e);
        }
    }
}
