// Core toolchain layer for the purl MCP gateway

pub mod artifacts;
pub mod config;
pub mod dat;
pub mod error;
pub mod knitscript;
mod process;

pub use config::ToolchainConfig;
pub use dat::{DatCompiler, DatOutput};
pub use error::ToolchainError;
pub use knitscript::{CompileOutput, KnitScriptCli, KnitoutCompiler};
