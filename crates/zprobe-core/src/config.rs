use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ZprobeError, ZprobeResult};

/// Top-level configuration (loaded from zprobe.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZprobeConfig {
    pub codec: CodecConfig,
    pub compress: CompressConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Force availability caching on or off (unset: decided by the host environment)
    pub cache_availability: Option<bool>,
    /// Treat this process as running inside a plugin/module host
    pub plugin_host: bool,
}

impl CodecConfig {
    /// Whether availability caching should start enabled.
    ///
    /// An explicit `cache_availability` always wins. Otherwise caching is on
    /// unless a plugin host was detected or configured.
    pub fn caching_enabled(&self, host_detected: bool) -> bool {
        match self.cache_availability {
            Some(explicit) => explicit,
            None => !(host_detected || self.plugin_host),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    /// zstd compression level (default: 3)
    pub level: i32,
    /// Copy buffer size in bytes (default: 64 KiB)
    pub buffer_size: usize,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            level: 3,
            buffer_size: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ZprobeConfig {
    /// Load configuration from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> ZprobeResult<Self> {
        if !path.exists() {
            tracing::debug!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| ZprobeError::Config(format!("parsing {}: {e}", path.display())))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> ZprobeResult<Self> {
        toml::from_str(toml_str).map_err(|e| ZprobeError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[codec]
cache_availability = false
plugin_host = true

[compress]
level = 19
buffer_size = 8192

[log]
level = "debug"
format = "json"
"#;
        let config = ZprobeConfig::parse(toml_str).unwrap();

        assert_eq!(config.codec.cache_availability, Some(false));
        assert!(config.codec.plugin_host);
        assert_eq!(config.compress.level, 19);
        assert_eq!(config.compress.buffer_size, 8192);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config = ZprobeConfig::parse("").unwrap();

        assert_eq!(config.codec.cache_availability, None);
        assert!(!config.codec.plugin_host);
        assert_eq!(config.compress.level, 3);
        assert_eq!(config.compress.buffer_size, 64 * 1024);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[compress]
level = 7
"#;
        let config = ZprobeConfig::parse(toml_str).unwrap();

        // Overridden
        assert_eq!(config.compress.level, 7);
        // Defaults
        assert_eq!(config.compress.buffer_size, 64 * 1024);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        let err = ZprobeConfig::parse("[compress]\nlevel = \"high\"\n").unwrap_err();
        assert!(matches!(err, ZprobeError::Config(_)));
    }

    #[test]
    fn test_caching_enabled_resolution() {
        let auto = CodecConfig::default();
        assert!(auto.caching_enabled(false));
        assert!(!auto.caching_enabled(true));

        let hosted = CodecConfig {
            cache_availability: None,
            plugin_host: true,
        };
        assert!(!hosted.caching_enabled(false));

        let forced_on = CodecConfig {
            cache_availability: Some(true),
            plugin_host: true,
        };
        assert!(forced_on.caching_enabled(true));

        let forced_off = CodecConfig {
            cache_availability: Some(false),
            plugin_host: false,
        };
        assert!(!forced_off.caching_enabled(false));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ZprobeConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.compress.level, 3);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[codec]\ncache_availability = true").unwrap();

        let config = ZprobeConfig::load(file.path()).unwrap();
        assert_eq!(config.codec.cache_availability, Some(true));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = ZprobeConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = ZprobeConfig::parse(&toml_str).unwrap();

        assert_eq!(config.compress.level, parsed.compress.level);
        assert_eq!(config.log.format, parsed.log.format);
        assert_eq!(config.codec.cache_availability, parsed.codec.cache_availability);
    }
}
