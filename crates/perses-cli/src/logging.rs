use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, MakeWriter},
    prelude::*,
};

/// Routes console log lines through the UI manager so they do not tear progress bars.
#[derive(Clone)]
pub struct UiWriter {
    sender: mpsc::Sender<UiEvent>,
}

impl UiWriter {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }
}

impl io::Write for UiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = String::from_utf8_lossy(buf).trim_end().to_string();
        if line.is_empty() {
            return Ok(buf.len());
        }
        // UI closed or saturated; fall back to plain stderr.
        if let Err(e) = self.sender.try_send(UiEvent::Log(line))
            && let UiEvent::Log(msg) = e.into_inner()
        {
            eprintln!("{}", msg);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for UiWriter {
    type Writer = UiWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::OFF
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

pub fn setup_logging(
    verbosity: u8,
    quiet: bool,
    log_file: &Option<PathBuf>,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    let console_layer = fmt::layer()
        .with_writer(UiWriter::new(ui_sender))
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(level_filter(verbosity, quiet))
        .with(console_layer);

    let init_result = if let Some(path) = log_file {
        let file = File::create(path).map_err(CliError::Io)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true);

        subscriber.with(file_layer).try_init()
    } else {
        subscriber.try_init()
    };

    init_result.map_err(|e| CliError::Other(anyhow::anyhow!("Failed to set up logging: {}", e)))
}
