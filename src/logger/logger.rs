use anyhow::{Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

pub struct LogConfig {
    pub filter: String,
    pub file: Option<String>,
}

type FileLayer = fmt::Layer<Registry, DefaultFields, Format, NonBlocking>;
type FileSlot = reload::Layer<Option<FileLayer>, Registry>;

pub struct Logger {
    filter_handle: reload::Handle<EnvFilter, Layered<FileSlot, Registry>>,
    file_handle: reload::Handle<Option<FileLayer>, Registry>,
    file_guard: Option<WorkerGuard>,
}

impl Logger {
    /// Console output at `info` until the configured filter is loaded. The
    /// file slot stays empty until a log file is configured.
    pub fn new_bootstrap() -> Self {
        let (file_slot, file_handle) = reload::Layer::new(None);
        let (filter, filter_handle) = reload::Layer::new(EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(file_slot)
            .with(filter)
            .with(fmt::layer())
            .init();

        Self {
            filter_handle,
            file_handle,
            file_guard: None,
        }
    }

    pub fn reload_from_config(&mut self, config: &LogConfig) -> Result<()> {
        let filter = EnvFilter::try_new(&config.filter).map_err(|e| anyhow!(e))?;
        self.filter_handle.reload(filter).map_err(|e| anyhow!(e))?;

        if let Some(path) = &config.file {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            self.file_handle.reload(Some(layer)).map_err(|e| anyhow!(e))?;
            // Replacing the guard flushes whatever the previous file still had queued.
            self.file_guard = Some(guard);
        }
        Ok(())
    }
}

fn split_log_path(path: &str) -> Result<(PathBuf, String)> {
    let path = Path::new(path);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name.to_string()))
}

/// Non-blocking writer appending to `path`; events are written by a
/// background worker that lives as long as the returned guard.
fn file_writer(path: &str) -> Result<(NonBlocking, WorkerGuard)> {
    let (dir, name) = split_log_path(path)?;
    fs::create_dir_all(&dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(&dir)
        .map_err(|e| anyhow!(e))?;
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case::bare_name("broker.log", ".", "broker.log")]
    #[case::relative("logs/broker.log", "logs", "broker.log")]
    #[case::absolute("/var/log/broker/broker.log", "/var/log/broker", "broker.log")]
    fn log_path_is_split_into_dir_and_name(
        #[case] path: &str,
        #[case] dir: &str,
        #[case] name: &str,
    ) {
        let (d, n) = split_log_path(path).unwrap();

        assert_eq!(d, PathBuf::from(dir));
        assert_eq!(n, name);
    }

    #[test]
    fn log_path_without_file_name_is_rejected() {
        assert!(split_log_path("/").is_err());
        assert!(split_log_path("logs/..").is_err());
    }

    #[test]
    fn file_writer_appends_once_guard_is_dropped() {
        let dir = std::env::temp_dir().join(format!("grpc-broker-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("broker.log");
        let path_str = path.to_str().unwrap();

        let (mut writer, guard) = file_writer(path_str).unwrap();
        writer.write_all(b"first line\n").unwrap();
        drop(guard);
        let (mut writer, guard) = file_writer(path_str).unwrap();
        writer.write_all(b"second line\n").unwrap();
        drop(guard);

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "first line\nsecond line\n");
        fs::remove_dir_all(&dir).unwrap();
    }
}
