//! Model Context Protocol server exposing the marketplace tools over stdio.

pub mod jsonrpc;
pub mod server;

pub use server::{McpServer, PROTOCOL_VERSION};
