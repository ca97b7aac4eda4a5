use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unparsable. Covers the aggregation code
/// in `energy_client` so data-quality warnings reach the log.
const DEFAULT_DIRECTIVES: &str = "warn,energy_logger=info,energy_client=info";

/// `RUST_LOG` as given, otherwise `DEFAULT_DIRECTIVES`.
pub fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn init_tracing() {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(rust_log.as_deref()))
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemoryStore;
    use energy_client::{
        db::{consumption_queries, ReadingStore},
        domain::Reading,
    };
    use std::{
        io,
        sync::{Arc, Mutex},
    };
    use time::macros::datetime;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn capture<F: FnOnce()>(rust_log: Option<&str>, f: F) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter(rust_log))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        out.text()
    }

    #[test]
    fn default_filter_shows_aggregation_warnings() {
        let logs = capture(None, || {
            let store = MemoryStore::default();
            store
                .append(&Reading::new(datetime!(2024-01-05 10:00:00 UTC), 50.0))
                .unwrap();
            store
                .append(&Reading::new(datetime!(2024-01-05 11:00:00 UTC), 1.0))
                .unwrap();
            consumption_queries::monthly_consumption(&store).unwrap();
        });

        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("negative consumption"), "{logs}");
    }

    #[test]
    fn default_filter_hides_debug() {
        let logs = capture(None, || tracing::debug!("debug detail"));
        assert!(!logs.contains("debug detail"));
    }

    #[test]
    fn rust_log_replaces_defaults() {
        let logs = capture(Some("energy_logger=debug"), || {
            tracing::debug!("debug detail");
        });
        assert!(logs.contains("debug detail"), "{logs}");
    }

    #[test]
    fn blank_rust_log_falls_back_to_defaults() {
        let logs = capture(Some("  "), || tracing::info!("info line"));
        assert!(logs.contains("info line"), "{logs}");
    }
}
