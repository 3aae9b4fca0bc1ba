use std::path::PathBuf;

use flexi_logger::{
    Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, colored_default_format,
    detailed_format,
};

use crate::Error;

/// Where the agent writes its log.
#[derive(Debug, Clone)]
pub enum LogTarget {
    /// Interactive commands.
    Stdout,
    /// Background worker: rotating files in this directory.
    Directory(PathBuf),
}

/// Default log directory for the background worker.
pub fn default_log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webnotes")
        .join("logs")
}

/// Start logging. The returned handle must be kept alive for file output.
pub fn init(target: &LogTarget) -> Result<LoggerHandle, Error> {
    let logger = Logger::try_with_env_or_str("info")?;
    let handle = match target {
        LogTarget::Stdout => logger.format(colored_default_format).log_to_stdout().start()?,
        LogTarget::Directory(dir) => logger
            .log_to_file(FileSpec::default().directory(dir).basename("webnotes-agent"))
            .format_for_files(detailed_format)
            .rotate(
                Criterion::Size(1024 * 1024),
                Naming::Numbers,
                Cleanup::KeepLogFiles(5),
            )
            .start()?,
    };
    Ok(handle)
}
