// Toolchain configuration: where the external compilers live

use crate::error::ToolchainError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Locations of the external toolchain pieces plus runtime knobs.
///
/// Every external dependency is an explicit path injected here at
/// construction time. There is no implicit working-directory lookup:
/// a missing tool is diagnosed against the configured path, which also
/// makes absence trivially testable by pointing a field at a
/// nonexistent file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Knitscript compiler executable (produces knitout).
    #[serde(default = "default_knitscript_bin")]
    pub knitscript_bin: PathBuf,

    /// Node.js binary used to run the dat compiler script.
    #[serde(default = "default_node_bin")]
    pub node_bin: PathBuf,

    /// The knitout-to-dat compiler script.
    #[serde(default = "default_dat_script")]
    pub dat_script: PathBuf,

    /// Directory receiving a copy of every produced artifact.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Wall-clock limit for a single external compiler run, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_knitscript_bin() -> PathBuf {
    PathBuf::from("knit-script")
}

fn default_node_bin() -> PathBuf {
    PathBuf::from("node")
}

fn default_dat_script() -> PathBuf {
    PathBuf::from("knitout-to-dat.js")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            knitscript_bin: default_knitscript_bin(),
            node_bin: default_node_bin(),
            dat_script: default_dat_script(),
            artifacts_dir: default_artifacts_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ToolchainConfig {
    /// Load configuration from a TOML file, falling back to defaults
    /// when the file does not exist, then apply `PURL_*` environment
    /// overrides.
    pub fn load(config_path: &Path) -> Result<Self, ToolchainError> {
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path).map_err(|e| {
                ToolchainError::Configuration(format!(
                    "failed to read {}: {}",
                    config_path.display(),
                    e
                ))
            })?;
            toml::from_str(&content).map_err(|e| {
                ToolchainError::Configuration(format!(
                    "failed to parse {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        } else {
            tracing::info!("configuration file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply environment-style overrides from a lookup function. Split
    /// out from [`load`](Self::load) so tests can substitute the
    /// process environment.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ToolchainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("PURL_KNITSCRIPT_BIN") {
            self.knitscript_bin = PathBuf::from(v);
        }
        if let Some(v) = var("PURL_NODE_BIN") {
            self.node_bin = PathBuf::from(v);
        }
        if let Some(v) = var("PURL_DAT_SCRIPT") {
            self.dat_script = PathBuf::from(v);
        }
        if let Some(v) = var("PURL_ARTIFACTS_DIR") {
            self.artifacts_dir = PathBuf::from(v);
        }
        if let Some(v) = var("PURL_TIMEOUT_SECS") {
            self.timeout_secs = v.parse().map_err(|_| {
                ToolchainError::Configuration(format!(
                    "PURL_TIMEOUT_SECS must be a whole number of seconds, got: {}",
                    v
                ))
            })?;
        }
        Ok(())
    }

    /// Subprocess timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let config = ToolchainConfig::load(&temp_dir.path().join("purl.toml")).unwrap();
        assert_eq!(config.node_bin, PathBuf::from("node"));
        assert_eq!(config.dat_script, PathBuf::from("knitout-to-dat.js"));
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("purl.toml");
        std::fs::write(
            &path,
            r#"
dat_script = "/opt/knitout/knitout-to-dat.js"
timeout_secs = 30
"#,
        )
        .unwrap();

        let config = ToolchainConfig::load(&path).unwrap();
        assert_eq!(
            config.dat_script,
            PathBuf::from("/opt/knitout/knitout-to-dat.js")
        );
        assert_eq!(config.timeout_secs, 30);
        // Unset fields keep their defaults
        assert_eq!(config.knitscript_bin, PathBuf::from("knit-script"));
    }

    #[test]
    fn test_overrides() {
        let mut config = ToolchainConfig::default();
        config
            .apply_overrides(|name| match name {
                "PURL_DAT_SCRIPT" => Some("/elsewhere/dat.js".to_string()),
                "PURL_TIMEOUT_SECS" => Some("7".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.dat_script, PathBuf::from("/elsewhere/dat.js"));
        assert_eq!(config.timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_bad_timeout_override() {
        let mut config = ToolchainConfig::default();
        let err = config
            .apply_overrides(|name| {
                (name == "PURL_TIMEOUT_SECS").then(|| "soon".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, ToolchainError::Configuration(_)));
    }

    #[test]
    fn test_bad_toml_is_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("purl.toml");
        std::fs::write(&path, "timeout_secs = \"lots\"").unwrap();

        let err = ToolchainConfig::load(&path).unwrap_err();
        assert!(matches!(err, ToolchainError::Configuration(_)));
    }
}
