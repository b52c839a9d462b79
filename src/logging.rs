use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const FALLBACK_LEVEL: &str = "info";

/// Filter directive for a configured level, or the fallback when it does not parse
pub fn level_directive(level: &str) -> &str {
    match EnvFilter::builder().parse(level) {
        Ok(_) if !level.trim().is_empty() => level,
        _ => FALLBACK_LEVEL,
    }
}

/// Send tracing output to `path`; stdout belongs to the terminal UI.
///
/// `RUST_LOG` takes precedence over `level`. Calling this twice is harmless,
/// the first subscriber stays installed.
pub fn init_tracing(level: &str, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level)));

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_filter(filter),
        )
        .try_init();

    match installed {
        Ok(()) => info!(path = %path.display(), "Logging initialized; override level with RUST_LOG"),
        Err(err) => warn!("Tracing subscriber already installed: {err}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive_accepts_valid_levels() {
        assert_eq!(level_directive("debug"), "debug");
        assert_eq!(level_directive("echotype=trace,warn"), "echotype=trace,warn");
    }

    #[test]
    fn test_level_directive_falls_back() {
        assert_eq!(level_directive(""), FALLBACK_LEVEL);
        assert_eq!(level_directive("echotype=loud"), FALLBACK_LEVEL);
    }

    #[test]
    fn test_init_tracing_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("echotype.log");
        init_tracing("debug", &path).unwrap();
        assert!(path.exists());
    }
}
