use lazy_static::lazy_static;
use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::RwLock;

use crate::error::{NalError, Result};

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::new());
}

const DEFAULT_MAX_SEI_PAYLOAD_SIZE: usize = 1 << 20;
const DEFAULT_MAX_SEI_MESSAGES: usize = 256;
const DEFAULT_MAX_MARKING_OPERATIONS: usize = 1024;

/// Parser limits.
///
/// Values come from the defaults, then `NALKIT_*` environment variables,
/// then `./nalkit.toml` or `./nalkit_config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Largest SEI payload size accepted by the extractor, in bytes.
    pub max_sei_payload_size: usize,
    /// Largest number of SEI messages extracted from one NAL unit.
    pub max_sei_messages: usize,
    /// Cap on entries in the sentinel-terminated slice header loops
    /// (reference list modifications and memory management operations).
    pub max_marking_operations: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_sei_payload_size: DEFAULT_MAX_SEI_PAYLOAD_SIZE,
            max_sei_messages: DEFAULT_MAX_SEI_MESSAGES,
            max_marking_operations: DEFAULT_MAX_MARKING_OPERATIONS,
        }
    }
}

impl Config {
    fn new() -> Self {
        let mut config = Config::default();

        if let Some(v) = env_usize("NALKIT_MAX_SEI_PAYLOAD_SIZE") {
            config.max_sei_payload_size = v;
        }
        if let Some(v) = env_usize("NALKIT_MAX_SEI_MESSAGES") {
            config.max_sei_messages = v;
        }
        if let Some(v) = env_usize("NALKIT_MAX_MARKING_OPERATIONS") {
            config.max_marking_operations = v;
        }

        let config_paths = ["./nalkit.toml", "./nalkit_config.toml"];
        for path in &config_paths {
            match config.apply_file(path) {
                Ok(()) => {}
                Err(NalError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("ignoring {}: {}", path, e),
            }
        }

        config
    }

    /// Applies the `key = value` lines of a config file. Failing to open or
    /// read it is [`NalError::Io`].
    pub fn apply_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut file = File::open(path)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        self.apply_toml_lines(&content);
        Ok(())
    }

    /// Applies `key = value` lines on top of the current values. Unknown
    /// keys and unparsable values are ignored.
    pub fn apply_toml_lines(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            let Ok(value) = value.parse::<usize>() else {
                log::warn!("ignoring config value for {}: {:?}", key.trim(), value);
                continue;
            };
            match key.trim() {
                "max_sei_payload_size" => self.max_sei_payload_size = value,
                "max_sei_messages" => self.max_sei_messages = value,
                "max_marking_operations" => self.max_marking_operations = value,
                other => log::debug!("unknown config key {}", other),
            }
        }
    }

    /// Returns a copy of the process-wide configuration.
    pub fn current() -> Config {
        match CONFIG.read() {
            Ok(config) => *config,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Rebuilds the shared config from defaults, environment and `nalkit.toml`.
    pub fn reload() {
        let new_config = Config::new();
        if let Ok(mut config) = CONFIG.write() {
            *config = new_config;
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let value = env::var(name).ok()?;
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not an unsigned integer", name, value);
            None
        }
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# nalkit configuration
# Limits applied while parsing untrusted streams.

max_sei_payload_size = 1048576
max_sei_messages = 256
max_marking_operations = 1024
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toml_lines_override_defaults() {
        let mut config = Config::default();
        config.apply_toml_lines(
            "# comment\nmax_sei_messages = 4\nmax_sei_payload_size = \"64\"\nbogus = 1\nmax_marking_operations = x\n",
        );
        assert_eq!(config.max_sei_messages, 4);
        assert_eq!(config.max_sei_payload_size, 64);
        assert_eq!(config.max_marking_operations, DEFAULT_MAX_MARKING_OPERATIONS);
    }

    #[test]
    fn test_template_round_trip() {
        let dir = std::env::temp_dir().join(format!("nalkit-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("nalkit.toml");
        let _ = std::fs::remove_file(&path);

        create_default_config_template(&path).unwrap();
        let mut config = Config {
            max_sei_payload_size: 0,
            max_sei_messages: 0,
            max_marking_operations: 0,
        };
        config.apply_file(&path).unwrap();
        assert_eq!(config, Config::default());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_file_errors_are_io() {
        let dir = std::env::temp_dir().join(format!("nalkit-missing-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nalkit.toml");

        let mut config = Config::default();
        match config.apply_file(&path) {
            Err(NalError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected an io error, got {:?}", other),
        }
        assert_eq!(config, Config::default());

        assert!(matches!(
            create_default_config_template(&path),
            Err(NalError::Io(_))
        ));
        assert!(!path.exists());
    }
}
