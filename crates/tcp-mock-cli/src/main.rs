mod net;
mod sink;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tcp_mock_abstract::{Channel, MockConfig, MockConfigOverride};
use tcp_mock_core::{Endpoint, Exchange, ExchangeTrace, Outcome, RandomSequence, Role, duplex, perform};

use crate::sink::DualSink;

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulate TCP connection open and close exchanges")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Load settings from a TOML file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server host the client connects to.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Port the server listens on and the client connects to.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Seed initial sequence numbers for a reproducible run.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Segment log file (defaults to client.out / server.out in the log directory).
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write a JSON trace of every segment handled.
    #[arg(long, global = true)]
    trace_out: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to a server and run the initiator side.
    Client {
        #[arg(value_enum, ignore_case = true)]
        action: Action,
    },
    /// Accept one client and run the responder side.
    Server {
        #[arg(value_enum, ignore_case = true)]
        action: Action,
    },
    /// Run both sides in this process over an in-memory stream.
    Loopback {
        #[arg(value_enum, ignore_case = true)]
        action: Action,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Action {
    /// Simulate opening a TCP connection
    Open,
    /// Simulate closing a TCP connection
    Close,
}

impl From<Action> for Exchange {
    fn from(action: Action) -> Self {
        match action {
            Action::Open => Exchange::Open,
            Action::Close => Exchange::Close,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!("tcp-mock starting…");

    let config = args.resolve_config()?;

    match args.command {
        Command::Client { action } => {
            let stream = net::connect(&config.host, config.port)?;
            let log_file = args.log_file_for(&config, Role::Initiator);
            let (result, trace) =
                run_role(action.into(), Role::Initiator, &mut &stream, &config, &log_file)?;
            net::hang_up(&stream);
            if let Some(path) = &args.trace_out {
                write_trace(path, &trace)?;
            }
            result?;
        }
        Command::Server { action } => {
            let stream = net::accept_one(config.port)?;
            let log_file = args.log_file_for(&config, Role::Responder);
            let (result, trace) =
                run_role(action.into(), Role::Responder, &mut &stream, &config, &log_file)?;
            net::hang_up(&stream);
            if let Some(path) = &args.trace_out {
                write_trace(path, &trace)?;
            }
            result?;
        }
        Command::Loopback { action } => run_loopback(&args, action.into(), &config)?,
    }

    Ok(())
}

impl Args {
    fn resolve_config(&self) -> Result<MockConfig> {
        let mut config = MockConfig::default();
        if let Some(path) = &self.config {
            load_config(path)?.apply_to(&mut config);
        }

        MockConfigOverride {
            host: self.host.clone(),
            port: self.port,
            seed: self.seed,
            ..Default::default()
        }
        .apply_to(&mut config);
        Ok(config)
    }

    fn log_file_for(&self, config: &MockConfig, role: Role) -> PathBuf {
        if let Some(path) = &self.log_file {
            return path.clone();
        }
        let name = match role {
            Role::Initiator => "client.out",
            Role::Responder => "server.out",
        };
        config.log_dir.join(name)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one side of an exchange with segment dumps going to the console and `log_file`.
/// The outer error is a logging failure; the inner one is the exchange itself.
fn run_role(
    exchange: Exchange,
    role: Role,
    channel: &mut dyn Channel,
    config: &MockConfig,
    log_file: &Path,
) -> Result<(Result<Outcome>, ExchangeTrace)> {
    let (local_port, peer_port) = match role {
        Role::Initiator => (config.client_port, config.server_port),
        Role::Responder => (config.server_port, config.client_port),
    };

    let mut observer = (DualSink::create(log_file)?, ExchangeTrace::new());
    let mut sequence = RandomSequence::new(config.seed);
    let result = {
        let mut endpoint =
            Endpoint::new(channel, &mut observer, &mut sequence, local_port, peer_port);
        perform(exchange, role, &mut endpoint)
    };

    let (sink, trace) = observer;
    sink.finish()
        .with_context(|| format!("Failed to write segment log {}", log_file.display()))?;

    let result = result.with_context(|| format!("{exchange} exchange failed as {role}"));
    if result.is_ok() && role == Role::Responder {
        match exchange {
            Exchange::Open => println!("all good: we are now connected."),
            Exchange::Close => println!("all good. we have disconnected."),
        }
    }
    Ok((result, trace))
}

#[derive(Serialize)]
struct LoopbackTrace<'a> {
    initiator: &'a ExchangeTrace,
    responder: &'a ExchangeTrace,
}

fn run_loopback(args: &Args, exchange: Exchange, config: &MockConfig) -> Result<()> {
    let (mut client_end, mut server_end) = duplex();

    let mut server_config = config.clone();
    server_config.seed = config.seed.map(|seed| seed.wrapping_add(1));
    let server_log = config.log_dir.join("server.out");
    let server = thread::spawn(move || {
        run_role(exchange, Role::Responder, &mut server_end, &server_config, &server_log)
    });

    let client_log = args.log_file_for(config, Role::Initiator);
    let client = run_role(exchange, Role::Initiator, &mut client_end, config, &client_log);
    // Hang up so a responder still waiting sees end-of-stream.
    drop(client_end);

    let server = server
        .join()
        .map_err(|_| anyhow::anyhow!("responder thread panicked"))?;

    let (client_result, client_trace) = client?;
    let (server_result, server_trace) = server?;

    if let Some(path) = &args.trace_out {
        write_trace(
            path,
            &LoopbackTrace {
                initiator: &client_trace,
                responder: &server_trace,
            },
        )?;
    }

    client_result?;
    server_result?;
    Ok(())
}

fn load_config(path: &Path) -> Result<MockConfigOverride> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: MockConfigOverride =
        toml::from_str(&content).context("Failed to parse config file")?;
    Ok(config)
}

fn write_trace<T: Serialize>(path: &Path, trace: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(trace).context("Failed to serialize exchange trace")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_case_insensitively() {
        let args = Args::try_parse_from(["tcp-mock", "client", "OPEN"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Client {
                action: Action::Open
            }
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(Args::try_parse_from(["tcp-mock", "server", "reset"]).is_err());
        assert!(Args::try_parse_from(["tcp-mock"]).is_err());
    }

    #[test]
    fn flags_override_config_defaults() {
        let args =
            Args::try_parse_from(["tcp-mock", "client", "close", "--port", "9999", "--seed", "5"])
                .unwrap();
        let config = args.resolve_config().unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn log_file_defaults_follow_role() {
        let args = Args::try_parse_from(["tcp-mock", "loopback", "open"]).unwrap();
        let config = MockConfig {
            log_dir: PathBuf::from("logs"),
            ..Default::default()
        };
        assert_eq!(
            args.log_file_for(&config, Role::Initiator),
            PathBuf::from("logs/client.out")
        );
        assert_eq!(
            args.log_file_for(&config, Role::Responder),
            PathBuf::from("logs/server.out")
        );
    }

    #[test]
    fn config_file_is_toml() {
        let parsed: MockConfigOverride =
            toml::from_str("host = \"example.org\"\nserver_port = 8080\n").unwrap();
        let mut config = MockConfig::default();
        parsed.apply_to(&mut config);
        assert_eq!(config.host, "example.org");
        assert_eq!(config.server_port, 8080);
        assert!(toml::from_str::<MockConfigOverride>("bogus = 1").is_err());
    }
}
