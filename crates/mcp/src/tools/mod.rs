pub mod compile;
pub mod env;
pub mod workspace;
mod registry;

pub use compile::{CompileKnitscriptTool, KnitoutToDatTool, SaveAndCompileTool};
pub use env::CheckEnvironmentTool;
pub use registry::{
    json_schema_boolean, json_schema_object, json_schema_string, Tool, ToolRegistry,
};
pub use workspace::WriteFileTool;
