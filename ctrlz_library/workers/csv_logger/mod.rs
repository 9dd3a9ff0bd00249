use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use ctrlz_core::error::{CtrlzError, CtrlzResult};
use ctrlz_core::{ChannelSet, CycleInfo, FromConfig, SchedulerHandle, TaskInfo, Worker};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

const DROP_REPORT_EVERY: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvLoggerConfig {
    /// Directory the log file is created in
    #[serde(rename = "LogPath")]
    pub log_path: PathBuf,
    /// Flush to disk every this many rows
    #[serde(rename = "WriteBackFrequency")]
    pub write_back_frequency: usize,
    /// Rows buffered between the control thread and the writer
    #[serde(rename = "QueueCapacity")]
    pub queue_capacity: usize,
    /// Channels to record, in column order. Empty records every channel.
    #[serde(rename = "Channels")]
    pub channels: Vec<String>,
}

impl Default for CsvLoggerConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("./"),
            write_back_frequency: 1000,
            queue_capacity: 4096,
            channels: Vec::new(),
        }
    }
}

impl CsvLoggerConfig {
    pub fn validate(&self) -> CtrlzResult<()> {
        if self.write_back_frequency == 0 {
            return Err(CtrlzError::config("WriteBackFrequency must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(CtrlzError::config("QueueCapacity must be at least 1"));
        }
        Ok(())
    }
}

struct Row {
    tick: u64,
    values: Vec<f64>,
}

/// CSV Logger Worker - records channels to disk off the control thread
///
/// `cycle_end()` snapshots the configured channels into a row and hands it to
/// a bounded queue without blocking. A writer thread owned by the worker
/// drains the queue into `<LogPath>/<YYYY-MM-DD-HH-MM-SS>.csv`. When the
/// writer falls behind, rows are dropped and counted rather than stalling
/// the cycle.
pub struct CsvLoggerWorker<S: ChannelSet> {
    handle: SchedulerHandle<S>,
    config: CsvLoggerConfig,
    columns: Vec<usize>,
    header: Vec<String>,
    sender: Option<Sender<Row>>,
    writer: Option<JoinHandle<io::Result<u64>>>,
    log_file: Option<PathBuf>,
    dropped: u64,
    scratch: Vec<f64>,
}

impl<S: ChannelSet> CsvLoggerWorker<S> {
    /// Resolve the configured channel names. Unknown names fail here, before
    /// any file is created.
    pub fn new(handle: SchedulerHandle<S>, config: CsvLoggerConfig) -> CtrlzResult<Self> {
        config.validate()?;

        let data = handle.data_center();
        let columns = if config.channels.is_empty() {
            data.descriptors().iter().map(|d| d.index).collect()
        } else {
            config
                .channels
                .iter()
                .map(|name| data.index_of(name))
                .collect::<CtrlzResult<Vec<_>>>()?
        };

        let mut header = vec!["tick".to_string()];
        for &index in &columns {
            if let Some(descriptor) = data.descriptor(index) {
                header.extend(descriptor.column_names());
            }
        }

        Ok(Self {
            handle,
            config,
            columns,
            header,
            sender: None,
            writer: None,
            log_file: None,
            dropped: 0,
            scratch: Vec::new(),
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Path of the file being written, once `create()` succeeded
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Rows lost because the queue was full or the writer had stopped
    pub fn dropped_rows(&self) -> u64 {
        self.dropped
    }

    fn open_log_file(&self) -> io::Result<(PathBuf, File)> {
        fs::create_dir_all(&self.config.log_path)?;
        let stamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S").to_string();

        // Two loggers started within the same second get distinct files
        let mut attempt = 0;
        loop {
            let file_name = if attempt == 0 {
                format!("{}.csv", stamp)
            } else {
                format!("{}-{}.csv", stamp, attempt)
            };
            let path = self.config.log_path.join(file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }

    fn record_drop(&mut self) {
        self.dropped += 1;
        if self.dropped == 1 || self.dropped % DROP_REPORT_EVERY == 0 {
            log::warn!(
                "CsvLoggerWorker: writer is behind, {} rows dropped so far",
                self.dropped
            );
        }
    }
}

fn write_rows(
    mut out: BufWriter<File>,
    header: Vec<String>,
    rows: Receiver<Row>,
    write_back: usize,
) -> io::Result<u64> {
    writeln!(out, "{}", header.join(","))?;

    let mut written = 0u64;
    let mut since_flush = 0usize;
    for row in rows {
        write!(out, "{}", row.tick)?;
        for value in &row.values {
            write!(out, ",{}", value)?;
        }
        writeln!(out)?;

        written += 1;
        since_flush += 1;
        if since_flush >= write_back {
            out.flush()?;
            since_flush = 0;
        }
    }
    out.flush()?;
    Ok(written)
}

impl<S: ChannelSet> FromConfig<S> for CsvLoggerWorker<S> {
    fn from_config(handle: SchedulerHandle<S>, config: &serde_json::Value) -> CtrlzResult<Self> {
        let cfg: CsvLoggerConfig = if config.is_null() {
            CsvLoggerConfig::default()
        } else {
            serde_json::from_value(config.clone())?
        };
        Self::new(handle, cfg)
    }
}

impl<S: ChannelSet> Worker for CsvLoggerWorker<S> {
    fn name(&self) -> &str {
        "CsvLoggerWorker"
    }

    fn create(&mut self, task: &TaskInfo) -> CtrlzResult<()> {
        let (path, file) = self.open_log_file()?;
        let (tx, rx) = channel::bounded(self.config.queue_capacity);
        let header = self.header.clone();
        let write_back = self.config.write_back_frequency;

        let writer = thread::Builder::new()
            .name(format!("ctrlz-csv-{}", task.name))
            .spawn(move || write_rows(BufWriter::new(file), header, rx, write_back))?;

        log::info!("CsvLoggerWorker: logging {} columns to {}", self.header.len(), path.display());
        self.sender = Some(tx);
        self.writer = Some(writer);
        self.log_file = Some(path);
        Ok(())
    }

    fn run(&mut self, _cycle: &CycleInfo<'_>) {}

    fn cycle_end(&mut self, cycle: &CycleInfo<'_>) {
        let Some(sender) = self.sender.as_ref() else {
            return;
        };

        let data = self.handle.data_center();
        self.scratch.clear();
        for &index in &self.columns {
            if let Err(e) = data.export(index, &mut self.scratch) {
                log::error!("CsvLoggerWorker: {}", e);
                return;
            }
        }

        let row = Row {
            tick: cycle.tick,
            values: self.scratch.clone(),
        };
        match sender.try_send(row) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => self.record_drop(),
        }
    }

    fn destroy(&mut self, _task: &TaskInfo) {
        // Closing the queue lets the writer drain what is left and exit
        self.sender = None;

        let Some(writer) = self.writer.take() else {
            return;
        };
        match writer.join() {
            Ok(Ok(rows)) => log::info!(
                "CsvLoggerWorker: wrote {} rows, dropped {}",
                rows,
                self.dropped
            ),
            Ok(Err(e)) => log::error!("CsvLoggerWorker: write failed: {}", e),
            Err(_) => log::error!("CsvLoggerWorker: writer thread panicked"),
        }
    }
}
