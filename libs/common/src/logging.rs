use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. `RUST_LOG` wins over the configured level.
///
/// `env_file` is whatever [`crate::load_dotenv`] found; it is logged once the
/// subscriber is up.
pub fn init_tracing(level: &str, env_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    report_env_file(env_file);
}

fn report_env_file(env_file: Option<&Path>) {
    match env_file {
        Some(path) => tracing::info!("Loaded environment from {}", path.display()),
        None => tracing::debug!("No .env file loaded"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use tracing::Level;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured(env_file: Option<&Path>) -> String {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || report_env_file(env_file));
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn loaded_env_file_is_logged() {
        let output = captured(Some(Path::new("/srv/participant-manager/.env")));
        assert!(output.contains("INFO"));
        assert!(output.contains("Loaded environment from /srv/participant-manager/.env"));
    }

    #[test]
    fn missing_env_file_is_a_debug_line() {
        let output = captured(None);
        assert!(output.contains("DEBUG"));
        assert!(output.contains("No .env file loaded"));
    }
}
