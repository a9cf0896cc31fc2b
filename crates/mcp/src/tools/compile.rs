// Compilation tools: knitscript -> knitout -> dat

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_boolean, json_schema_object, json_schema_string, Tool};
use anyhow::{Context, Result};
use purl_core::artifacts::copy_to_artifacts;
use purl_core::dat::default_dat_path;
use purl_core::knitscript::default_knitout_path;
use purl_core::{DatCompiler, KnitoutCompiler, ToolchainError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Map a toolchain failure into an MCP tool response, keeping the
/// external compiler's diagnostic text intact.
fn toolchain_failure(err: &ToolchainError) -> CallToolResult {
    CallToolResult::failure(format!("{} [{}]", err, err.kind()))
}

fn json_result(value: serde_json::Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    CallToolResult::text(text)
}

/// Copy an artifact into the artifacts directory, recording the copy
/// path in the report. A failed copy is noted but never fails the call.
async fn record_artifact(
    report: &mut serde_json::Map<String, serde_json::Value>,
    artifacts_dir: &Path,
    key: &str,
    artifact: &Path,
) {
    match copy_to_artifacts(artifacts_dir, artifact).await {
        Ok(copy) => {
            report.insert(key.to_string(), copy.display().to_string().into());
        }
        Err(e) => {
            tracing::warn!(artifact = %artifact.display(), "artifact copy failed: {}", e);
            report.insert("artifact_copy_error".to_string(), e.to_string().into());
        }
    }
}

/// Shared knitscript -> knitout (-> dat) pipeline behind the
/// `compile_knitscript` and `save_and_compile` tools.
///
/// `record_source` additionally copies the source file itself into the
/// artifacts directory, for tools that created it on the caller's
/// behalf.
async fn compile_pipeline(
    compiler: &dyn KnitoutCompiler,
    dat: &DatCompiler,
    artifacts_dir: &Path,
    source: &Path,
    knitout_out: &Path,
    dat_out: Option<&Path>,
    record_source: bool,
) -> Result<CallToolResult> {
    let compiled = match compiler.compile(source, knitout_out).await {
        Ok(output) => output,
        Err(e) => return Ok(toolchain_failure(&e)),
    };

    let mut report = serde_json::Map::new();
    report.insert("success".to_string(), true.into());
    report.insert(
        "source_path".to_string(),
        source.display().to_string().into(),
    );
    if record_source {
        record_artifact(&mut report, artifacts_dir, "source_artifact", source).await;
    }
    report.insert(
        "knitout_path".to_string(),
        compiled.knitout_path.display().to_string().into(),
    );
    if !compiled.diagnostics.is_empty() {
        report.insert(
            "knitscript_output".to_string(),
            compiled.diagnostics.clone().into(),
        );
    }
    record_artifact(
        &mut report,
        artifacts_dir,
        "knitout_artifact",
        &compiled.knitout_path,
    )
    .await;

    if let Some(dat_out) = dat_out {
        let produced = match dat.compile(&compiled.knitout_path, dat_out).await {
            Ok(output) => output,
            Err(e) => return Ok(toolchain_failure(&e)),
        };
        report.insert(
            "dat_path".to_string(),
            produced.dat_path.display().to_string().into(),
        );
        if !produced.diagnostics.is_empty() {
            report.insert("dat_output".to_string(), produced.diagnostics.clone().into());
        }
        record_artifact(&mut report, artifacts_dir, "dat_artifact", &produced.dat_path).await;
    }

    Ok(json_result(report.into()))
}

/// Tool compiling a knitscript source file to knitout, optionally on
/// to dat in the same call.
pub struct CompileKnitscriptTool {
    compiler: Arc<dyn KnitoutCompiler>,
    dat: Arc<DatCompiler>,
    artifacts_dir: PathBuf,
}

impl CompileKnitscriptTool {
    pub fn new(
        compiler: Arc<dyn KnitoutCompiler>,
        dat: Arc<DatCompiler>,
        artifacts_dir: PathBuf,
    ) -> Self {
        Self {
            compiler,
            dat,
            artifacts_dir,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompileKnitscriptArgs {
    source_path: String,
    knitout_path: Option<String>,
    dat_path: Option<String>,
}

#[async_trait::async_trait]
impl Tool for CompileKnitscriptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "compile_knitscript".to_string(),
            description: "Compile a knitscript (.ks) source file to knitout (.k), and \
                          optionally on to the dat machine format in the same call."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "source_path": json_schema_string("Path to the .ks knitscript source file"),
                    "knitout_path": json_schema_string("Output path for the .k file (defaults to the source path with a .k extension)"),
                    "dat_path": json_schema_string("If set, also compile the produced knitout to a .dat file at this path")
                }),
                vec!["source_path"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: CompileKnitscriptArgs =
            serde_json::from_value(arguments).context("Invalid arguments for compile_knitscript")?;

        let source = PathBuf::from(&args.source_path);
        let knitout_out = args
            .knitout_path
            .map(PathBuf::from)
            .unwrap_or_else(|| default_knitout_path(&source));
        let dat_out = args.dat_path.map(PathBuf::from);

        compile_pipeline(
            self.compiler.as_ref(),
            &self.dat,
            &self.artifacts_dir,
            &source,
            &knitout_out,
            dat_out.as_deref(),
            false,
        )
        .await
    }
}

/// Tool compiling an existing knitout file to the dat machine format.
pub struct KnitoutToDatTool {
    dat: Arc<DatCompiler>,
    artifacts_dir: PathBuf,
}

impl KnitoutToDatTool {
    pub fn new(dat: Arc<DatCompiler>, artifacts_dir: PathBuf) -> Self {
        Self { dat, artifacts_dir }
    }
}

#[derive(Debug, Deserialize)]
struct KnitoutToDatArgs {
    knitout_path: String,
    dat_path: Option<String>,
}

#[async_trait::async_trait]
impl Tool for KnitoutToDatTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "knitout_to_dat".to_string(),
            description: "Compile a knitout (.k) file to the binary dat machine format \
                          using the external knitout-to-dat compiler."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "knitout_path": json_schema_string("Path to the .k knitout file"),
                    "dat_path": json_schema_string("Output path for the .dat file (defaults to the input path with a .dat extension)")
                }),
                vec!["knitout_path"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: KnitoutToDatArgs =
            serde_json::from_value(arguments).context("Invalid arguments for knitout_to_dat")?;

        let knitout = PathBuf::from(&args.knitout_path);
        let dat_out = args
            .dat_path
            .map(PathBuf::from)
            .unwrap_or_else(|| default_dat_path(&knitout));

        let produced = match self.dat.compile(&knitout, &dat_out).await {
            Ok(output) => output,
            Err(e) => return Ok(toolchain_failure(&e)),
        };

        let mut report = serde_json::Map::new();
        report.insert("success".to_string(), true.into());
        report.insert(
            "dat_path".to_string(),
            produced.dat_path.display().to_string().into(),
        );
        if !produced.diagnostics.is_empty() {
            report.insert("dat_output".to_string(), produced.diagnostics.clone().into());
        }
        record_artifact(
            &mut report,
            &self.artifacts_dir,
            "dat_artifact",
            &produced.dat_path,
        )
        .await;

        Ok(json_result(report.into()))
    }
}

/// Convenience tool: save knitscript content to a file, then run the
/// full compile pipeline on it.
pub struct SaveAndCompileTool {
    compiler: Arc<dyn KnitoutCompiler>,
    dat: Arc<DatCompiler>,
    artifacts_dir: PathBuf,
}

impl SaveAndCompileTool {
    pub fn new(
        compiler: Arc<dyn KnitoutCompiler>,
        dat: Arc<DatCompiler>,
        artifacts_dir: PathBuf,
    ) -> Self {
        Self {
            compiler,
            dat,
            artifacts_dir,
        }
    }
}

fn default_generate_dat() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SaveAndCompileArgs {
    file_path: String,
    content: String,
    #[serde(default = "default_generate_dat")]
    generate_dat: bool,
}

#[async_trait::async_trait]
impl Tool for SaveAndCompileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "save_and_compile".to_string(),
            description: "Save knitscript content to a .ks file, compile it to knitout, \
                          and optionally generate a dat file, in one step."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "file_path": json_schema_string("Path where the .ks file should be saved"),
                    "content": json_schema_string("Knitscript source content"),
                    "generate_dat": json_schema_boolean("Also compile the knitout to dat (default: true)")
                }),
                vec!["file_path", "content"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: SaveAndCompileArgs =
            serde_json::from_value(arguments).context("Invalid arguments for save_and_compile")?;

        let source = PathBuf::from(&args.file_path);
        if let Some(parent) = source.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return Ok(CallToolResult::failure(format!(
                        "failed to create {}: {}",
                        parent.display(),
                        e
                    )));
                }
            }
        }
        if let Err(e) = tokio::fs::write(&source, &args.content).await {
            return Ok(CallToolResult::failure(format!(
                "failed to write {}: {}",
                source.display(),
                e
            )));
        }

        let knitout_out = default_knitout_path(&source);
        let dat_out = args.generate_dat.then(|| default_dat_path(&knitout_out));

        compile_pipeline(
            self.compiler.as_ref(),
            &self.dat,
            &self.artifacts_dir,
            &source,
            &knitout_out,
            dat_out.as_deref(),
            true,
        )
        .await
    }
}
