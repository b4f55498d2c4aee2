//! Record Scanner CLI
//!
//! Loads a `name,hp,mp,attack,defense` CSV through the asynchronous,
//! manually managed pipeline, or through the managed reference parser for
//! comparison.
//!
//! # Output Format
//!
//! Records requested with `--show` are logged and written to stdout as
//! `Name : <name>, HP : <hp>, MP : <mp>, Attack : <attack>, Defense : <defense>`.
//!
//! Statistics are written to stderr upon completion:
//! `records=N file_bytes=N bytes_read=N polls=N backend=B read_us=N parse_us=N`
//!
//! # Exit Codes
//!
//! - `0`: Success
//! - `1`: Load failure, malformed input, or a `compare` mismatch
//! - `2`: Invalid arguments or configuration error

use clap::{Parser, Subcommand};
use record_scanner::{
    read_managed, AsyncFileReader, LoadError, LoaderConfig, ReadBackend, ReadStatus, Tick,
    UnmanagedLoader,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "record-scanner")]
#[command(about = "Asynchronous unmanaged CSV record loader", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load through the asynchronous unmanaged pipeline.
    Load {
        /// Data file (default: $RECORD_SCANNER_DATA or Sample_full.csv).
        path: Option<PathBuf>,
        /// auto, uring, aio, or blocking.
        #[arg(long)]
        backend: Option<ReadBackend>,
        /// Host tick interval between polls.
        #[arg(long, default_value_t = 1)]
        tick_ms: u64,
        /// Record index to display after loading (repeatable).
        #[arg(long = "show")]
        show: Vec<usize>,
    },
    /// Load through the managed line-split reference parser.
    Managed { path: Option<PathBuf> },
    /// Load both ways and compare field by field.
    Compare {
        path: Option<PathBuf>,
        #[arg(long)]
        backend: Option<ReadBackend>,
    },
    /// Read asynchronously and print the raw text up to the terminator.
    Dump {
        path: Option<PathBuf>,
        #[arg(long)]
        backend: Option<ReadBackend>,
    },
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = match LoaderConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid environment: {err}");
            return ExitCode::from(2);
        }
    };

    match cli.cmd {
        Command::Load {
            path,
            backend,
            tick_ms,
            show,
        } => {
            apply(&mut config, path, backend);
            load(config, Duration::from_millis(tick_ms), &show)
        }
        Command::Managed { path } => {
            apply(&mut config, path, None);
            managed(config)
        }
        Command::Compare { path, backend } => {
            apply(&mut config, path, backend);
            compare(config)
        }
        Command::Dump { path, backend } => {
            apply(&mut config, path, backend);
            dump(config)
        }
    }
}

fn apply(config: &mut LoaderConfig, path: Option<PathBuf>, backend: Option<ReadBackend>) {
    if let Some(path) = path {
        config.path = path;
    }
    if let Some(backend) = backend {
        config.read.backend = backend;
    }
}

/// Issues the read and ticks until the load finishes.
fn drive(loader: &mut UnmanagedLoader, tick: Duration) -> Result<usize, LoadError> {
    loader.read_data()?;
    loop {
        match loader.update()? {
            Tick::Loaded { records } => return Ok(records),
            Tick::Pending => thread::sleep(tick),
            Tick::Idle => return Ok(loader.table().len()),
        }
    }
}

fn new_loader(config: LoaderConfig) -> Result<UnmanagedLoader, ExitCode> {
    UnmanagedLoader::new(config).map_err(|err| {
        eprintln!("invalid configuration: {err}");
        ExitCode::from(2)
    })
}

fn load(config: LoaderConfig, tick: Duration, show: &[usize]) -> ExitCode {
    let mut loader = match new_loader(config) {
        Ok(loader) => loader,
        Err(code) => return code,
    };
    let records = match drive(&mut loader, tick) {
        Ok(records) => records,
        // Already logged at the failure point.
        Err(_) => return ExitCode::FAILURE,
    };

    if let Some(&bad) = show.iter().find(|&&index| index >= records) {
        eprintln!("--show {bad} is out of range ({records} records)");
        return ExitCode::from(2);
    }
    let mut out = io::stdout().lock();
    for &index in show {
        let line = loader.show_data(index);
        if writeln!(out, "{line}").is_err() {
            return ExitCode::FAILURE;
        }
    }

    let stats = loader.stats();
    eprintln!(
        "records={} file_bytes={} bytes_read={} polls={} backend={} read_us={} parse_us={}",
        stats.records,
        stats.file_len,
        stats.bytes_read,
        stats.polls,
        stats.backend.unwrap_or_default(),
        stats.read_elapsed.unwrap_or_default().as_micros(),
        stats.parse_elapsed.unwrap_or_default().as_micros(),
    );
    loader.release();
    ExitCode::SUCCESS
}

fn managed(config: LoaderConfig) -> ExitCode {
    let start = Instant::now();
    match read_managed(&config.path) {
        Ok(records) => {
            let elapsed = start.elapsed();
            info!(records = records.len(), "complete managed read");
            eprintln!(
                "records={} elapsed_us={}",
                records.len(),
                elapsed.as_micros()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(path = %config.path.display(), %err, "managed read failed");
            ExitCode::FAILURE
        }
    }
}

fn compare(config: LoaderConfig) -> ExitCode {
    let path = config.path.clone();
    let mut loader = match new_loader(config) {
        Ok(loader) => loader,
        Err(code) => return code,
    };
    if drive(&mut loader, Duration::from_millis(1)).is_err() {
        return ExitCode::FAILURE;
    }
    let managed = match read_managed(&path) {
        Ok(records) => records,
        Err(err) => {
            error!(path = %path.display(), %err, "managed read failed");
            return ExitCode::FAILURE;
        }
    };

    let table = loader.table();
    if managed.len() != table.len() {
        eprintln!(
            "mismatch: unmanaged={} managed={} records",
            table.len(),
            managed.len()
        );
        return ExitCode::FAILURE;
    }
    if let Some((index, (m, r))) = managed
        .iter()
        .zip(table)
        .enumerate()
        .find(|(_, (m, r))| !m.same_fields(r))
    {
        eprintln!("mismatch at record {index}: unmanaged=({r}) managed={m:?}");
        return ExitCode::FAILURE;
    }

    eprintln!("records={} identical=true", table.len());
    ExitCode::SUCCESS
}

fn dump(config: LoaderConfig) -> ExitCode {
    let reader = match AsyncFileReader::new(config.read) {
        Ok(reader) => reader,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };
    let mut handle = match reader.begin_read(&config.path) {
        Ok(handle) => handle,
        Err(err) => {
            error!(path = %config.path.display(), %err, "read error");
            return ExitCode::FAILURE;
        }
    };
    while handle.poll() == ReadStatus::Pending {
        thread::sleep(Duration::from_millis(1));
    }

    if let Some(failure) = handle.failure().cloned() {
        error!(path = %config.path.display(), %failure, "read error");
        handle.dispose().release();
        return ExitCode::FAILURE;
    }

    let mut buffer = handle.dispose();
    let bytes = buffer.as_slice();
    let text = &bytes[..memchr::memchr(0, bytes).unwrap_or(bytes.len())];
    let written = io::stdout().lock().write_all(text);
    buffer.release();
    info!("complete");
    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
