// MCP (Model Context Protocol) gateway for the knitscript toolchain
// Exposes the external compilers as tools for agent clients

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
