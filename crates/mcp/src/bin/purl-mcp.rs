// Standalone MCP server binary for the knitscript toolchain

use anyhow::Result;
use purl_core::{DatCompiler, KnitScriptCli, ToolchainConfig};
use purl_mcp::server::McpServer;
use purl_mcp::tools::*;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!("Purl MCP server starting...");

    let config_path =
        std::env::var("PURL_CONFIG").unwrap_or_else(|_| "purl.toml".to_string());
    let config = ToolchainConfig::load(&PathBuf::from(config_path))?;

    let compiler: Arc<dyn purl_core::KnitoutCompiler> = Arc::new(KnitScriptCli::new(&config));
    let dat = Arc::new(DatCompiler::new(&config));
    if !dat.script_available() {
        tracing::warn!(
            script = %dat.script_path().display(),
            "dat compiler script not found; knitout_to_dat calls will fail until it is installed"
        );
    }

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CompileKnitscriptTool::new(
        compiler.clone(),
        dat.clone(),
        config.artifacts_dir.clone(),
    )));
    registry.register(Arc::new(KnitoutToDatTool::new(
        dat.clone(),
        config.artifacts_dir.clone(),
    )));
    registry.register(Arc::new(SaveAndCompileTool::new(
        compiler,
        dat,
        config.artifacts_dir.clone(),
    )));
    registry.register(Arc::new(WriteFileTool));
    registry.register(Arc::new(CheckEnvironmentTool::new(&config)));

    tracing::info!("Registered {} tools", registry.list_schemas().len());

    let server = McpServer::new(registry);
    server.start().await?;

    Ok(())
}
