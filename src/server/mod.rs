//! MCP tool server over stdio
//!
//! Stdout carries nothing but protocol messages; logs go to stderr.

pub mod mcp;
pub mod tools;

pub use mcp::McpService;
pub use tools::ToolRegistry;
