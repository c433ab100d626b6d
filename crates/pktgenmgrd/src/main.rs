//! pktgenctl - configure and drive one packet generator application
//!
//! Programs the application from a TOML file plus command-line overrides,
//! starts it and then accepts interactive commands on stdin.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pktgen_table::SimulatedDevice;
use pktgen_types::{DevPort, PortRange};
use pktgenmgrd::command::ReplCommand;
use pktgenmgrd::config_file::{PktgenctlConfig, DEFAULT_CONFIG_PATH};
use pktgenmgrd::frames::{describe_expected_frames, expected_frame_count};
use pktgenmgrd::{AppId, GeneratorConfig, GeneratorManager, PktgenError, TriggerKind};

/// Packet generator control tool
#[derive(Parser, Debug)]
#[command(name = "pktgenctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Application id
    #[arg(short = 'a', long)]
    app_id: Option<AppId>,

    /// Source port of the generator
    #[arg(short = 'p', long)]
    port: Option<DevPort>,

    /// Trigger (one_shot, periodic, port_down, recirculation, deparser, pfc)
    #[arg(short = 't', long)]
    trigger: Option<String>,

    /// Target packet rate; derives the timer
    #[arg(long)]
    target_pps: Option<u64>,

    /// Send as fast as possible
    #[arg(long)]
    max_throughput: bool,

    /// Generator port range, e.g. 68-71 or 0-7
    #[arg(long)]
    generator_ports: Option<PortRange>,

    /// Skip read-back of programmed application entries
    #[arg(long)]
    no_verify: bool,

    /// Log level (trace, debug, info, warn, error); overrides RUST_LOG
    #[arg(short = 'l', long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut PktgenctlConfig) {
        if let Some(app_id) = self.app_id {
            config.app.app_id = app_id;
        }
        if let Some(port) = self.port {
            config.app.port = port;
        }
        if let Some(trigger) = &self.trigger {
            config.app.trigger = trigger.clone();
        }
        if self.target_pps.is_some() {
            config.app.target_pps = self.target_pps;
        }
        if self.max_throughput {
            config.app.max_throughput = true;
        }
        if let Some(range) = self.generator_ports {
            config.device.generator_port_min = range.min;
            config.device.generator_port_max = range.max;
        }
        if self.no_verify {
            config.device.verify_writes = false;
        }
    }
}

/// Initializes tracing/logging subsystem
fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn print_report(mgr: &GeneratorManager, app_id: AppId) -> Result<()> {
    let counters = mgr.get_report(app_id)?;
    println!("{}", serde_json::to_string_pretty(&counters)?);
    Ok(())
}

/// Frames shown by the `frames` command.
const FRAME_PREVIEW_LEN: usize = 8;

/// The application driven by this session.
struct Session {
    app_id: AppId,
    pipe_id: u8,
    trigger: TriggerKind,
    generator: GeneratorConfig,
}

fn print_frames(session: &Session) {
    if !session.trigger.is_timer() {
        println!("{} applications carry no timer header", session.trigger);
        return;
    }
    match describe_expected_frames(
        &session.generator,
        session.pipe_id,
        session.app_id,
        FRAME_PREVIEW_LEN,
    ) {
        Ok(lines) => {
            println!("{} frames per trigger", expected_frame_count(&session.generator));
            for line in lines {
                println!("{}", line);
            }
        }
        Err(e) => {
            debug!("No expected frames for application {}: {}", session.app_id, e);
            println!("{}", e);
        }
    }
}

/// Runs one interactive command. Returns false when the loop should end.
fn dispatch(mgr: &GeneratorManager, session: &Session, command: ReplCommand) -> Result<bool> {
    let app_id = session.app_id;
    let outcome = match command {
        ReplCommand::Report => return print_report(mgr, app_id).map(|()| true),
        ReplCommand::Start => mgr.start(app_id),
        ReplCommand::Stop => mgr.stop(app_id),
        ReplCommand::Port => {
            println!("{}", mgr.get_app_port(app_id)?);
            return Ok(true);
        }
        ReplCommand::Frames => {
            print_frames(session);
            return Ok(true);
        }
        ReplCommand::Quit => return Ok(false),
    };

    match outcome {
        Ok(()) => println!("{}: {}", command, mgr.app_state(app_id).as_str()),
        // already logged by the manager; keep the session going
        Err(e) if e.is_misuse() => println!("{}", e),
        Err(e) => return Err(e.into()),
    }
    Ok(true)
}

async fn repl(mgr: &GeneratorManager, session: &Session) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", ReplCommand::HELP);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    debug!("stdin closed");
                    return Ok(());
                };
                match line.parse::<ReplCommand>() {
                    Ok(command) => {
                        if !dispatch(mgr, session, command)? {
                            return Ok(());
                        }
                    }
                    Err(message) => println!("{}", message),
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for ctrl-c")?;
                warn!("Received SIGINT, leaving");
                return Ok(());
            }
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = PktgenctlConfig::load_or_default(&args.config)?;
    args.apply(&mut config);
    config.validate()?;

    let app_id = config.app.app_id;
    let port = config.app.port;
    let trigger = config.app.trigger()?;
    let generator = config.app.generator_config()?;
    let pipe_id = config.pipe_id()?;

    info!(
        "Application {} on port {} (pipe {}), trigger {}, {} x {} packets of {} bytes",
        app_id,
        port,
        pipe_id,
        trigger,
        generator.batch_count(),
        generator.packets_per_batch(),
        generator.packet_length_bytes()
    );
    match generator.rate_pps() {
        Some(pps) => info!("Timer {} ns, {:.3} packets/s", generator.timer_nanosec(), pps),
        None => info!("Timer 0 ns, maximum throughput"),
    }
    if trigger.is_timer() {
        debug!("Each trigger should emit {} frames", expected_frame_count(&generator));
    }

    let device = Arc::new(SimulatedDevice::new());
    let mgr = GeneratorManager::new(device, config.device.manager_config()?);

    mgr.set_app(app_id, port, &generator, trigger)?;
    print_report(&mgr, app_id)?;
    mgr.start(app_id)?;

    let session = Session {
        app_id,
        pipe_id,
        trigger,
        generator,
    };
    let result = repl(&mgr, &session).await;

    if mgr.is_running(app_id) {
        match mgr.stop(app_id) {
            Ok(()) => info!("Stopped application {} on exit", app_id),
            Err(e) => error!("Failed to stop application {} on exit: {}", app_id, e),
        }
    }
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log_level.as_deref()) {
        eprintln!("pktgenctl: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<PktgenError>() {
                Some(err) if err.is_fatal() => error!("Device state diverged: {:#}", e),
                _ => error!("pktgenctl failed: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
