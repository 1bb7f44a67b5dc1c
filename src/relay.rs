//! Main relay loop
//!
//! Opens the selected input channel once, then captures jobs one after the
//! other: capture to a spool file, translate, show the operator what was
//! filtered out, and upload on request. Translation failures keep the raw
//! spool around for triage and move on to the next job.

use crate::cli::{Cli, InputKind};
use crate::storage;
use m1bridge_communication::{
    CaptureOutcome, CaptureSession, FdTransport, LineChannel, SerialTransport,
    SubprocessTransport, TcpTransport, Transport,
};
use m1bridge_core::{ChannelError, Config, Result};
use m1bridge_device::{M1Device, MaterialThickness};
use m1bridge_translator::GcodeTranslator;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// What the operator wants done with a captured job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Upload,
    Keep,
    Delete,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let translator_settings = cli.translator_settings(&config);
    let device = M1Device::new(cli.device_settings(&config))?;

    let mut channel = open_channel(&cli)?;
    loop {
        let spool = storage::next_output_path(&cli.output_dir)?;
        let mut session = CaptureSession::new(&mut channel, config.capture.clone());
        let job = match session.run(&spool) {
            Ok(CaptureOutcome::Completed(job)) => job,
            Ok(CaptureOutcome::Discarded { line_count }) => {
                tracing::info!(line_count, "short job discarded, waiting for the next one");
                continue;
            }
            Err(e) if e.is_channel_closed() => {
                tracing::info!("sender disconnected");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // Auto-measuring has to happen before translation; once the job is
        // translated its Z values are already in device space.
        let thickness = match device.resolve_thickness(cli.thickness()) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "thickness measurement failed, keeping raw spool");
                continue;
            }
        };

        let mut translator = GcodeTranslator::new(translator_settings.clone());
        translator.set_material_thickness(thickness);
        let translated = match translator.translate_file(&job.spool) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    spool = %job.spool.display(),
                    "translation failed, keeping raw spool for triage"
                );
                continue;
            }
        };

        report_filtered(translator.filtered_lines());
        let action = if cli.non_interactive() {
            Action::Upload
        } else {
            prompt_action()?
        };
        match action {
            Action::Upload => {
                // The artifact is already translated; the uploader's own
                // translation pass is a no-op on it.
                match device.upload_gcode_file(
                    &translated,
                    MaterialThickness::FromGcode,
                    translator_settings.clone(),
                ) {
                    Ok(_) => tracing::info!(job = %translated.display(), "job uploaded"),
                    Err(e) => tracing::error!(error = %e, "upload failed, files kept"),
                }
            }
            Action::Keep => {
                tracing::info!(
                    spool = %job.spool.display(),
                    translated = %translated.display(),
                    "files kept"
                );
            }
            Action::Delete => {
                remove_file(&job.spool);
                remove_file(&translated);
            }
        }
    }
}

fn open_channel(cli: &Cli) -> Result<LineChannel> {
    let transport: Box<dyn Transport> = match cli.input() {
        InputKind::Tcp(port) => Box::new(TcpTransport::listen(port)?),
        InputKind::Serial(port) => Box::new(SerialTransport::open(&port, cli.baud)?),
        InputKind::Bridge(command) => {
            let mut parts = command.split_whitespace();
            let program = parts.next().ok_or_else(|| ChannelError::UnsupportedTransport {
                kind: "empty bridge command".to_string(),
            })?;
            let args: Vec<String> = parts.map(str::to_string).collect();
            Box::new(SubprocessTransport::spawn(program, &args)?)
        }
        InputKind::Stdio => Box::new(FdTransport::stdio()?),
    };
    Ok(LineChannel::new(transport))
}

fn report_filtered(filtered: &BTreeSet<String>) {
    if filtered.is_empty() {
        return;
    }
    println!("Commands filtered out of the job:");
    for line in filtered {
        println!("  {line}");
    }
}

fn prompt_action() -> anyhow::Result<Action> {
    let stdin = std::io::stdin();
    loop {
        print!("Upload job to the cutter? [y]es / [n]o, keep files / [d]elete files: ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        if stdin.read_line(&mut answer)? == 0 {
            // Stdin is gone; keep the files.
            return Ok(Action::Keep);
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(Action::Upload),
            "n" | "no" | "" => return Ok(Action::Keep),
            "d" | "delete" => return Ok(Action::Delete),
            other => println!("Did not understand {other:?}, please answer y, n or d."),
        }
    }
}

fn remove_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "could not delete file");
    }
}
