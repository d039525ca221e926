//! LoggerWithRedaction (C14): level filter, PII redaction before the
//! sink, and a rotating file writer (spec §4.13).
//!
//! Grounded on the teacher's `server/src/main.rs::init_tracing`
//! (`tracing_subscriber::registry()` + `EnvFilter` + a `fmt` layer,
//! optionally JSON) layered with a redacting `MakeWriter` wrapper and
//! the custom `RotatingFileWriter` from `rotation.rs`.

pub mod redact;
pub mod rotation;

use std::io;
use std::path::PathBuf;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use redact::redact;
pub use rotation::{RotationPolicy, RotatingFileWriter};

/// Environment-driven configuration (spec §6: "log level; log
/// directory" are environment variables).
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub log_dir: Option<PathBuf>,
    pub rotation: RotationPolicy,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false, log_dir: None, rotation: RotationPolicy::default() }
    }
}

impl LoggingConfig {
    /// `CASTBOT_LOG_LEVEL`, `CASTBOT_LOG_DIR`, `CASTBOT_LOG_JSON`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = std::env::var("CASTBOT_LOG_LEVEL") {
            config.level = level;
        }
        if let Ok(dir) = std::env::var("CASTBOT_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Ok(json) = std::env::var("CASTBOT_LOG_JSON") {
            config.json = json == "1" || json.eq_ignore_ascii_case("true");
        }
        config
    }
}

/// Wraps any `MakeWriter` so every formatted line is passed through
/// [`redact`] before it reaches the underlying sink.
struct RedactingMakeWriter<M>(M);

struct RedactingWriter<W>(W);

impl<W: io::Write> io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let redacted = redact(&text);
        self.0.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter(self.0.make_writer())
    }
}

/// Holds the `tracing-appender` worker guard (or rotation file handle)
/// alive for the process lifetime; dropping it stops log flushing.
pub enum LoggingGuard {
    None,
    RotatingFile(std::sync::Arc<RotatingFileWriter>),
}

/// Initializes the global `tracing` subscriber per `config`. Returns a
/// guard that must be kept alive for the duration of the process.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, io::Error> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("castbot={}", config.level).into());

    let registry = tracing_subscriber::registry().with(env_filter);

    match &config.log_dir {
        Some(dir) => {
            let writer = std::sync::Arc::new(RotatingFileWriter::new(dir, "castbot", config.rotation.clone())?);
            let redacting = RedactingMakeWriter(writer.clone());
            let fmt_layer = if config.json {
                tracing_subscriber::fmt::layer().json().with_writer(redacting).boxed()
            } else {
                tracing_subscriber::fmt::layer().with_writer(redacting).boxed()
            };
            registry.with(fmt_layer).init();
            Ok(LoggingGuard::RotatingFile(writer))
        }
        None => {
            let redacting = RedactingMakeWriter(io::stdout);
            let fmt_layer = if config.json {
                tracing_subscriber::fmt::layer().json().with_writer(redacting).boxed()
            } else {
                tracing_subscriber::fmt::layer().with_writer(redacting).boxed()
            };
            registry.with(fmt_layer).init();
            Ok(LoggingGuard::None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_info_and_stdout() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.log_dir.is_none());
        assert!(!config.json);
    }

    #[test]
    fn redacting_writer_strips_email_before_inner_write() {
        let mut buf = Vec::new();
        {
            let mut writer = RedactingWriter(&mut buf);
            io::Write::write_all(&mut writer, b"user user@example.com logged in\n").unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "user [EMAIL] logged in\n");
    }
}
