use std::process::ExitCode;

use asciilink::app::cli_config;
use asciilink::transport::PortTarget;
use asciilink::{MasterSession, MonotonicClock};
use clap::{Parser, ValueEnum};
use log::{error, info};

/// Default log filter; frame hex dumps are logged by the library at debug.
const LOG_FILTER: &str = "info,asciilink=debug";

/// Master end of an ASCII line: writes text to, or reads text from, a slave.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port: device path, tcp:<host:port>, unix:<path> or vsock:<cid>:<port>
    #[arg(long)]
    port: PortTarget,

    /// Slave address, 0 for broadcast
    #[arg(long)]
    addr: u8,

    #[arg(long, value_enum)]
    cmd: Command,

    /// Text to send with `--cmd write`
    #[arg(long, required_if_eq("cmd", "write"))]
    text: Option<String>,

    /// Response timeout per attempt, in seconds
    #[arg(long, default_value_t = 1.0, value_parser = seconds_up_to::<10>)]
    timeout: f64,

    /// Retransmissions after the first attempt
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=5))]
    retries: u8,

    /// Longest silence allowed inside a frame, in seconds
    #[arg(long, default_value_t = 0.05, value_parser = seconds_up_to::<1>)]
    char_gap: f64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Read,
    Write,
}

fn seconds_up_to<const MAX: u32>(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=f64::from(MAX)).contains(&secs) {
        Ok(secs)
    } else {
        Err(format!("must be between 0 and {MAX} seconds"))
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
    info!("opened {}", args.port);

    let config = cli_config(args.timeout, args.retries, args.char_gap);
    let mut master = MasterSession::new(transport, MonotonicClock::new(), config);

    let outcome = match args.cmd {
        Command::Write => {
            let text = args.text.as_deref().unwrap_or_default();
            master.write_text(args.addr, text).map(|()| {
                info!("wrote {} bytes to address {}", text.len(), args.addr);
            })
        }
        Command::Read => master.read_text(args.addr).map(|text| {
            println!("{}", String::from_utf8_lossy(&text));
        }),
    };

    let stats = master.stats();
    info!(
        "requests: {}, retransmissions: {}, timeouts: {}",
        stats.requests, stats.retransmissions, stats.timeouts
    );

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("request failed: {e}");
            ExitCode::FAILURE
        }
    }
}
