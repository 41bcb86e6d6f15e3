use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct FeldsparConfig {
    #[serde(default = "defaults::control_port")]
    pub control_port: u16,
    #[serde(default = "defaults::max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "defaults::queue_timeout_ms")]
    pub queue_timeout_ms: u64,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::log_ring_capacity")]
    pub log_ring_capacity: usize,
    #[serde(default)]
    pub log_file: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn control_port() -> u16 {
        21
    }

    pub fn max_sessions() -> usize {
        4
    }

    pub fn queue_timeout_ms() -> u64 {
        50
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn log_ring_capacity() -> usize {
        return 1 << 12; // 4096
    }
}

impl Default for FeldsparConfig {
    fn default() -> Self {
        Self {
            control_port: defaults::control_port(),
            max_sessions: defaults::max_sessions(),
            queue_timeout_ms: defaults::queue_timeout_ms(),
            log_level: defaults::log_level(),
            log_ring_capacity: defaults::log_ring_capacity(),
            log_file: None,
        }
    }
}

impl FeldsparConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let feldspar_config: FeldsparConfig = toml::from_str(&toml_to_str)?;
        Ok(feldspar_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: FeldsparConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.control_port, 21);
        assert_eq!(cfg.max_sessions, 4);
        assert_eq!(cfg.queue_timeout_ms, 50);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.log_file, None);
    }

    #[test]
    fn explicit_fields_win() {
        let cfg: FeldsparConfig = toml::from_str(
            "control_port = 2121\nmax_sessions = 2\nlog_file = \"/tmp/feldspar.log\"\n",
        )
        .unwrap();
        assert_eq!(cfg.control_port, 2121);
        assert_eq!(cfg.max_sessions, 2);
        assert_eq!(cfg.log_file.as_deref(), Some("/tmp/feldspar.log"));
    }
}
