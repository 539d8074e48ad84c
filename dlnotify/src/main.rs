use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::{after, bounded, never, select, Receiver};
use tracing_subscriber::EnvFilter;

use dlnotify::backend;
use dlnotify::prelude::*;

/// Reports DeckLink devices as they are attached and removed.
#[derive(Parser, Debug)]
#[command(name = "dlnotify", version, about)]
struct Args {
    /// DeckLink API library to load (Linux / macOS)
    #[arg(long, env = "DECKLINK_API_PATH", value_name = "PATH")]
    library: Option<PathBuf>,

    /// Factory symbol to try, in order. Repeatable; defaults to the known SDK versions
    #[arg(long = "factory-symbol", value_name = "SYMBOL")]
    factory_symbols: Vec<String>,

    /// Use an in-process simulated bus with this many devices attached
    #[arg(long, value_name = "DEVICES")]
    simulate: Option<usize>,

    /// Make the simulated driver reject InstallDeviceNotifications with E_FAIL
    #[arg(long, hide = true, requires = "simulate")]
    #[cfg_attr(not(feature = "simulation"), allow(dead_code))]
    simulate_install_failure: bool,

    /// How device events are printed
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Stop after this many seconds. ENTER still quits early; end of input does not
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Log filter, e.g. "debug" or "dlnotify_core=trace"
    #[arg(long, env = "RUST_LOG", value_name = "FILTER", default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help / --version 也走这里，它们应当以 0 退出
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logging(&args.log_level);

    let mut printer = EventPrinter::stdio(args.format);
    let _ = printer.status("Starting...");

    let status = match run(&args, &mut printer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{e:?}");
            let _ = printer.status(&format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    };

    let _ = printer.status("Finished.");
    status
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("invalid log filter {filter:?}: {e}");
        EnvFilter::new("warn")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn select_driver(args: &Args) -> Result<Box<dyn Driver>> {
    if let Some(devices) = args.simulate {
        #[cfg(feature = "simulation")]
        {
            let failure = args.simulate_install_failure.then_some(HResult::E_FAIL);
            return Ok(backend::create_simulated_driver(devices, failure));
        }

        #[cfg(not(feature = "simulation"))]
        {
            anyhow::bail!("--simulate {devices}: this build has no simulation support");
        }
    }

    let mut config = DiscoveryConfig::new().factory_symbols(args.factory_symbols.iter().cloned());
    if let Some(path) = &args.library {
        config = config.library_path(path.clone());
    }
    tracing::debug!(?config, "selecting platform backend");
    Ok(backend::create_driver(&config)?)
}

fn run<O: io::Write, E: io::Write>(args: &Args, printer: &mut EventPrinter<O, E>) -> Result<()> {
    let driver = select_driver(args)?;
    tracing::debug!(backend = driver.name(), "creating IDeckLinkDiscovery");
    let discovery = driver.create_discovery()?;

    let (notifier, events) = ChannelNotifier::new();
    let registration = discovery.install(Box::new(notifier))?;

    printer.status(
        "IDeckLinkDiscovery::InstallDeviceNotifications succeeded.\n\nPress ENTER to quit.",
    )?;

    let stdin = spawn_stdin_watch();
    let mut stdin_open = true;
    let deadline = match args.timeout {
        Some(secs) => after(Duration::from_secs(secs)),
        None => never(),
    };

    loop {
        let watch = if stdin_open { stdin.clone() } else { never() };
        select! {
            recv(events) -> event => match event {
                Ok(event) => printer.event(&event)?,
                Err(_) => break,
            },
            recv(watch) -> signal => match signal {
                Ok(StdinSignal::Line) => break,
                // 有 --timeout 时，stdin 关闭 (服务、cron、CI) 不结束会话
                _ if args.timeout.is_some() => {
                    tracing::debug!("stdin closed, waiting for the timeout");
                    stdin_open = false;
                }
                _ => break,
            },
            recv(deadline) -> _ => {
                tracing::info!("timeout reached");
                break;
            }
        }
    }

    // 退出前把已排队的事件打印完
    for event in events.try_iter() {
        printer.event(&event)?;
    }

    let stats = registration.uninstall()?;
    for event in events.try_iter() {
        printer.event(&event)?;
    }
    drop(discovery);

    printer.summary(&stats)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StdinSignal {
    /// ENTER
    Line,
    /// EOF or a read error
    Closed,
}

fn spawn_stdin_watch() -> Receiver<StdinSignal> {
    let (tx, rx) = bounded(1);
    let spawned = thread::Builder::new()
        .name("dlnotify-stdin".into())
        .spawn(move || {
            let mut line = String::new();
            let signal = match io::stdin().lock().read_line(&mut line) {
                Ok(0) => StdinSignal::Closed,
                Ok(_) => StdinSignal::Line,
                Err(e) => {
                    tracing::warn!("reading stdin failed: {e}");
                    StdinSignal::Closed
                }
            };
            let _ = tx.send(signal);
        });
    match spawned {
        Ok(_) => rx,
        Err(e) => {
            // 没有 stdin 线程时只能依靠 --timeout 或 Ctrl-C 退出
            tracing::warn!("could not watch stdin: {e}");
            never()
        }
    }
}
