use std::{
    fs,
    fs::File,
    io,
    io::prelude::Write as _,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
    thread,
    time::SystemTime,
};

use log::{LevelFilter, Log, SetLoggerError};
use thiserror::Error;

const LOG_PATH: &str = "./logs/";

#[derive(Debug, Error)]
pub enum LoggerInitErr {
    #[error("unable to create the log file")]
    Io(#[from] io::Error),
    #[error(transparent)]
    SetLogger(#[from] SetLoggerError),
}

/// installs a [`Logger`] writing to `./logs/` as the global logger
pub fn init(hostname: impl AsRef<str>, max_level: LevelFilter) -> Result<(), LoggerInitErr> {
    log::set_boxed_logger(Box::new(Logger::new(LOG_PATH, hostname, max_level)?))?;
    log::set_max_level(max_level);
    Ok(())
}

/// appends records to a file named after the server and the time the logger was created
pub struct Logger {
    max_level: LevelFilter,
    path: PathBuf,
    log_file: Mutex<File>,
}

impl Logger {
    pub fn new(
        log_folder: impl AsRef<Path>,
        hostname: impl AsRef<str>,
        max_level: LevelFilter,
    ) -> io::Result<Self> {
        let folder = log_folder.as_ref();
        fs::create_dir_all(folder)?;
        let path = folder.join(format!(
            "{}-{}.txt",
            hostname.as_ref(),
            humantime::format_rfc3339_seconds(SystemTime::now())
        ));
        Ok(Self {
            log_file: Mutex::new(File::options().create(true).append(true).open(&path)?),
            path,
            max_level,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> MutexGuard<'_, File> {
        // a panic while writing leaves the file usable
        self.log_file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let _ = self.file().write_fmt(format_args!(
            "[{}] [{:<5}] [{:?}] {}\n",
            humantime::format_rfc3339_millis(SystemTime::now()),
            record.level(),
            thread::current().id(),
            record.args(),
        ));
    }

    fn flush(&self) {
        let _ = self.file().flush();
    }
}
