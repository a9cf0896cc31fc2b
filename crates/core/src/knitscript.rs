// Knitscript-to-knitout compilation behind a pluggable interface

use crate::config::ToolchainConfig;
use crate::error::ToolchainError;
use crate::process::{combined_output, ensure_input_file, run_with_timeout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Result of a successful knitscript compilation.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The produced knitout file.
    pub knitout_path: PathBuf,
    /// Anything the compiler printed while succeeding.
    pub diagnostics: String,
}

/// The knitscript-to-knitout binding.
///
/// Whether the compiler is a library or an external process is an
/// implementation detail hidden here; the gateway only sees this
/// trait. The shipped binding ([`KnitScriptCli`]) shells out, but a
/// linked-library binding would slot in without touching any tool.
#[async_trait::async_trait]
pub trait KnitoutCompiler: Send + Sync {
    /// Compile `source` (a `.ks` file) into a knitout file at
    /// `knitout_out`.
    async fn compile(
        &self,
        source: &Path,
        knitout_out: &Path,
    ) -> Result<CompileOutput, ToolchainError>;
}

/// Subprocess binding to the external `knit-script` executable.
///
/// Invoked as `knit-script <source.ks> <output.k>`.
pub struct KnitScriptCli {
    bin: PathBuf,
    timeout: Duration,
}

impl KnitScriptCli {
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            bin: config.knitscript_bin.clone(),
            timeout: config.timeout(),
        }
    }

    /// Probe the compiler with `--version`. `None` means the binary is
    /// missing or refused the flag.
    pub async fn version(&self) -> Option<String> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--version");
        let output = run_with_timeout(cmd, Duration::from_secs(10), "knitscript compiler")
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait::async_trait]
impl KnitoutCompiler for KnitScriptCli {
    async fn compile(
        &self,
        source: &Path,
        knitout_out: &Path,
    ) -> Result<CompileOutput, ToolchainError> {
        ensure_input_file(source, "ks")?;

        let mut cmd = Command::new(&self.bin);
        cmd.arg(source).arg(knitout_out);

        tracing::debug!(
            source = %source.display(),
            output = %knitout_out.display(),
            "running knitscript compiler"
        );
        let output = run_with_timeout(cmd, self.timeout, "knitscript compiler").await?;

        if !output.status.success() {
            return Err(ToolchainError::Compilation(combined_output(&output)));
        }

        // Some compiler failures exit zero but leave no output behind
        if !knitout_out.exists() {
            return Err(ToolchainError::Execution(format!(
                "knitscript compiler exited successfully but produced no file at {}",
                knitout_out.display()
            )));
        }

        Ok(CompileOutput {
            knitout_path: knitout_out.to_path_buf(),
            diagnostics: combined_output(&output),
        })
    }
}

/// Default knitout path for a source file: same name, `.k` extension.
pub fn default_knitout_path(source: &Path) -> PathBuf {
    source.with_extension("k")
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

    #[cfg(unix)]
    fn cli_with_bin(bin: PathBuf) -> KnitScriptCli {
        let config = ToolchainConfig {
            knitscript_bin: bin,
            ..Default::default()
        };
        KnitScriptCli::new(&config)
    }

    #[test]
    fn test_default_knitout_path() {
        assert_eq!(
            default_knitout_path(Path::new("/work/scarf.ks")),
            PathBuf::from("/work/scarf.k")
        );
    }

    #[tokio::test]
    async fn test_missing_source_skips_compiler() {
        // Binary does not exist either; an Input error proves the
        // compiler was never invoked
        let config = ToolchainConfig {
            knitscript_bin: PathBuf::from("/no/such/knit-script"),
            ..Default::default()
        };
        let cli = KnitScriptCli::new(&config);

        let err = cli
            .compile(Path::new("/no/such/pattern.ks"), Path::new("/tmp/out.k"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolchainError::Input(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_compile_produces_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let bin = temp_dir.path().join("knit-script");
        write_executable(&bin, "#!/bin/sh\ncp \"$1\" \"$2\"\n");

        let source = temp_dir.path().join("scarf.ks");
        std::fs::write(&source, "with Carrier as c1: knit loops;").unwrap();
        let out = temp_dir.path().join("scarf.k");

        let result = cli_with_bin(bin).compile(&source, &out).await.unwrap();
        assert_eq!(result.knitout_path, out);
        assert!(out.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compiler_failure_preserves_diagnostics() {
        let temp_dir = TempDir::new().unwrap();
        let bin = temp_dir.path().join("knit-script");
        write_executable(
            &bin,
            "#!/bin/sh\necho 'syntax error at line 2' >&2\nexit 1\n",
        );

        let source = temp_dir.path().join("bad.ks");
        std::fs::write(&source, "not knitscript").unwrap();

        let err = cli_with_bin(bin)
            .compile(&source, &temp_dir.path().join("bad.k"))
            .await
            .unwrap_err();
        match err {
            ToolchainError::Compilation(msg) => {
                assert!(msg.contains("syntax error at line 2"))
            }
            other => panic!("expected compilation error, got: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_without_output_is_execution_error() {
        let temp_dir = TempDir::new().unwrap();
        let bin = temp_dir.path().join("knit-script");
        write_executable(&bin, "#!/bin/sh\nexit 0\n");

        let source = temp_dir.path().join("scarf.ks");
        std::fs::write(&source, "").unwrap();

        let err = cli_with_bin(bin)
            .compile(&source, &temp_dir.path().join("scarf.k"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolchainError::Execution(_)));
    }
}
