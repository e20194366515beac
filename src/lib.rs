//! # pagebridge-mcp
//!
//! Browser automation bridge exposing a fixed catalog of page operations
//! (navigate, click, fill, screenshot, evaluate, cookies, ...) as
//! uniformly-shaped tool calls over two transports:
//!
//! - **stdio**: JSON-RPC 2.0 framed one message per line, the standard
//!   MCP transport for editor and assistant integrations.
//! - **http**: a small API with `/health`, `/tools` and `/execute`
//!   routes, gated by a shared `X-API-Key` secret.
//!
//! Both transports converge on one transport-agnostic core: the
//! [`tools::ToolRegistry`] dispatches every call against the single
//! shared browser page owned by [`session::Session`], which is launched
//! lazily on the first call that needs it. Tool failures never escape as
//! transport faults — they are returned as error envelopes
//! (`isError: true` with one text block).
//!
//! ## Usage with an MCP client
//!
//! ```json
//! {
//!   "servers": {
//!     "pagebridge": {
//!       "command": "pagebridge-mcp",
//!       "args": ["--mode", "stdio"],
//!       "env": {}
//!     }
//!   }
//! }
//! ```
//!
//! ## HTTP mode
//!
//! Configure with environment variables: `SERVER_MODE=http`, `PORT`,
//! `API_KEY` (requests must then carry `X-API-Key`), `ALLOWED_ORIGINS`
//! (comma-separated CORS origins).
//!
//! ## Trust model
//!
//! The `evaluate` tool executes caller-supplied JavaScript with full page
//! privileges; the API key is the only barrier on the network transport.
//! Deploy accordingly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod error;
mod handlers;
#[cfg(feature = "http")]
pub mod http;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;

pub use error::{Error, Result};
pub use protocol::{ContentItem, JsonRpcRequest, JsonRpcResponse, ToolCallResult};
pub use server::McpServer;
pub use session::Session;
pub use tools::ToolRegistry;
