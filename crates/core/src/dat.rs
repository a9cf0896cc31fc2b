// Knitout-to-dat compilation via the external Node.js script

use crate::config::ToolchainConfig;
use crate::error::ToolchainError;
use crate::process::{combined_output, ensure_input_file, run_with_timeout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Result of a successful dat compilation.
#[derive(Debug, Clone)]
pub struct DatOutput {
    /// The produced dat file.
    pub dat_path: PathBuf,
    /// Anything the compiler printed while succeeding.
    pub diagnostics: String,
}

/// Wrapper around the `knitout-to-dat.js` compiler.
///
/// The script and the node binary that runs it are located through
/// [`ToolchainConfig`]; the script's absence is a configuration error
/// reported before any subprocess is spawned.
pub struct DatCompiler {
    node_bin: PathBuf,
    script: PathBuf,
    timeout: Duration,
}

impl DatCompiler {
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            node_bin: config.node_bin.clone(),
            script: config.dat_script.clone(),
            timeout: config.timeout(),
        }
    }

    /// Whether the compiler script is present at its configured path.
    pub fn script_available(&self) -> bool {
        self.script.exists()
    }

    /// Configured location of the compiler script.
    pub fn script_path(&self) -> &Path {
        &self.script
    }

    /// Probe the node binary with `--version`. `None` means node is
    /// not installed at the configured path.
    pub async fn node_version(&self) -> Option<String> {
        let mut cmd = Command::new(&self.node_bin);
        cmd.arg("--version");
        let output = run_with_timeout(cmd, Duration::from_secs(10), "node")
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Compile `knitout` (a `.k` file) into a dat file at `dat_out`.
    ///
    /// Invoked as `node <script> <input.k> <output.dat>`. Failure
    /// output from the script is surfaced verbatim.
    pub async fn compile(
        &self,
        knitout: &Path,
        dat_out: &Path,
    ) -> Result<DatOutput, ToolchainError> {
        if !self.script_available() {
            return Err(ToolchainError::Configuration(format!(
                "dat compiler script not found at {}; install knitout-to-dat.js \
                 or point dat_script at it",
                self.script.display()
            )));
        }
        ensure_input_file(knitout, "k")?;

        let mut cmd = Command::new(&self.node_bin);
        cmd.arg(&self.script).arg(knitout).arg(dat_out);

        tracing::debug!(
            input = %knitout.display(),
            output = %dat_out.display(),
            "running dat compiler"
        );
        let output = run_with_timeout(cmd, self.timeout, "dat compiler").await?;

        if !output.status.success() {
            return Err(ToolchainError::Compilation(combined_output(&output)));
        }

        if !dat_out.exists() {
            return Err(ToolchainError::Execution(format!(
                "dat compiler exited successfully but produced no file at {}",
                dat_out.display()
            )));
        }

        Ok(DatOutput {
            dat_path: dat_out.to_path_buf(),
            diagnostics: combined_output(&output),
        })
    }
}

/// Default dat path for a knitout file: same name, `.dat` extension.
pub fn default_dat_path(knitout: &Path) -> PathBuf {
    knitout.with_extension("dat")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn write_executable(path: &Path, script: &str) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, script).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn compiler(node_bin: PathBuf, script: PathBuf) -> DatCompiler {
        let config = ToolchainConfig {
            node_bin,
            dat_script: script,
            ..Default::default()
        };
        DatCompiler::new(&config)
    }

    #[test]
    fn test_default_dat_path() {
        assert_eq!(
            default_dat_path(Path::new("/work/scarf.k")),
            PathBuf::from("/work/scarf.dat")
        );
    }

    #[tokio::test]
    async fn test_missing_script_is_configuration_error() {
        // Node binary deliberately bogus too: the script check must
        // fire before anything is spawned
        let dat = compiler(
            PathBuf::from("/no/such/node"),
            PathBuf::from("/no/such/knitout-to-dat.js"),
        );

        let err = dat
            .compile(Path::new("/tmp/in.k"), Path::new("/tmp/out.dat"))
            .await
            .unwrap_err();
        match err {
            ToolchainError::Configuration(msg) => {
                assert!(msg.contains("knitout-to-dat.js"))
            }
            other => panic!("expected configuration error, got: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_input_is_input_error() {
        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("knitout-to-dat.js");
        std::fs::write(&script, "// stub").unwrap();

        let dat = compiler(PathBuf::from("node"), script);
        let err = dat
            .compile(
                &temp_dir.path().join("missing.k"),
                &temp_dir.path().join("out.dat"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolchainError::Input(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rejection_surfaces_diagnostics_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        // Fake "node": ignores the script argument and rejects the input
        let node = temp_dir.path().join("node");
        write_executable(
            &node,
            "#!/bin/sh\necho 'ERROR: unsupported carrier 11 at line 4' >&2\nexit 1\n",
        );
        let script = temp_dir.path().join("knitout-to-dat.js");
        std::fs::write(&script, "// stub").unwrap();

        let input = temp_dir.path().join("bad.k");
        std::fs::write(&input, ";!knitout-2\n").unwrap();

        let err = compiler(node, script)
            .compile(&input, &temp_dir.path().join("bad.dat"))
            .await
            .unwrap_err();
        match err {
            ToolchainError::Compilation(msg) => {
                assert!(msg.contains("ERROR: unsupported carrier 11 at line 4"))
            }
            other => panic!("expected compilation error, got: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_compile() {
        let temp_dir = TempDir::new().unwrap();
        // Fake "node": $2 is the input, $3 the output
        let node = temp_dir.path().join("node");
        write_executable(&node, "#!/bin/sh\nprintf 'DAT' > \"$3\"\n");
        let script = temp_dir.path().join("knitout-to-dat.js");
        std::fs::write(&script, "// stub").unwrap();

        let input = temp_dir.path().join("scarf.k");
        std::fs::write(&input, ";!knitout-2\n").unwrap();
        let out = temp_dir.path().join("scarf.dat");

        let result = compiler(node, script).compile(&input, &out).await.unwrap();
        assert_eq!(result.dat_path, out);
        assert_eq!(std::fs::read(&out).unwrap(), b"DAT");
    }
}
