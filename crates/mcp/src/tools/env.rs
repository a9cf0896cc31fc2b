// Environment diagnostics for the external toolchain

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, Tool};
use anyhow::Result;
use purl_core::{DatCompiler, KnitScriptCli, ToolchainConfig};
use std::sync::Arc;

/// Tool reporting whether the external toolchain pieces are installed.
///
/// Absences are fields in the report, never errors: the whole point of
/// the tool is to tell the caller what is missing.
pub struct CheckEnvironmentTool {
    knitscript: Arc<KnitScriptCli>,
    dat: Arc<DatCompiler>,
}

impl CheckEnvironmentTool {
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            knitscript: Arc::new(KnitScriptCli::new(config)),
            dat: Arc::new(DatCompiler::new(config)),
        }
    }
}

#[async_trait::async_trait]
impl Tool for CheckEnvironmentTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "check_environment".to_string(),
            description: "Check whether the knitscript compiler, Node.js, and the \
                          knitout-to-dat script are available."
                .to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        let node_version = self.dat.node_version().await;
        let knitscript_version = self.knitscript.version().await;

        let report = serde_json::json!({
            "node_available": node_version.is_some(),
            "node_version": node_version,
            "knitscript_available": knitscript_version.is_some(),
            "knitscript_version": knitscript_version,
            "dat_script_present": self.dat.script_available(),
            "dat_script_path": self.dat.script_path().display().to_string(),
        });

        let text = serde_json::to_string_pretty(&report).unwrap_or_else(|_| report.to_string());
        Ok(CallToolResult::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ToolContent;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_reports_absences_without_failing() {
        let config = ToolchainConfig {
            knitscript_bin: PathBuf::from("/no/such/knit-script"),
            node_bin: PathBuf::from("/no/such/node"),
            dat_script: PathBuf::from("/no/such/knitout-to-dat.js"),
            ..Default::default()
        };
        let tool = CheckEnvironmentTool::new(&config);

        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert!(result.is_error.is_none());

        let ToolContent::Text { text } = &result.content[0];
        let report: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(report["node_available"], false);
        assert_eq!(report["knitscript_available"], false);
        assert_eq!(report["dat_script_present"], false);
        assert_eq!(report["dat_script_path"], "/no/such/knitout-to-dat.js");
    }
}
