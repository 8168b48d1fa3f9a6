use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use asciilink::transport::PortTarget;
use asciilink::{MonotonicClock, SessionConfig, SlaveSession, TextStore};
use clap::Parser;
use log::{error, info};

/// Default log filter; frame hex dumps are logged by the library at debug.
const LOG_FILTER: &str = "info,asciilink=debug";

/// Slave end of an ASCII line: keeps one text buffer that masters write and read.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port: device path, tcp:<host:port>, unix:<path> or vsock:<cid>:<port>
    #[arg(long)]
    port: PortTarget,

    /// Own address
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=255))]
    addr: u8,

    /// Longest silence allowed inside a frame, in seconds
    #[arg(long, default_value_t = 0.05, value_parser = parse_gap)]
    char_gap: f64,
}

fn parse_gap(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&secs) {
        Ok(secs)
    } else {
        Err("must be between 0 and 1 seconds".to_string())
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(LOG_FILTER)).init();
    let args = Args::parse();

    let transport = match args.port.open() {
        Ok(transport) => transport,
        Err(e) => {
            error!("cannot open {}: {e}", args.port);
            return ExitCode::from(2);
        }
    };

    let dispatcher = match TextStore::new().dispatcher() {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let config = SessionConfig::new().with_inter_char_timeout(Duration::from_secs_f64(args.char_gap));
    let mut slave = SlaveSession::new(args.addr, transport, MonotonicClock::new(), dispatcher, config);

    // Runs until the process is killed or the port fails.
    let stop = AtomicBool::new(false);
    info!("serving address {} on {}", args.addr, args.port);
    match slave.run(&stop) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let stats = slave.stats();
            error!(
                "port failed after {} frames ({} replies): {e}",
                stats.frames_received, stats.replies_sent
            );
            ExitCode::FAILURE
        }
    }
}
