//! # hipeac-mcp
//!
//! MCP (Model Context Protocol) server for the HiPEAC member directory.
//!
//! The server is strictly read-only. It exposes:
//!
//! - **Tools**: `get_metadata`, `search_members` and `find_experts`
//! - **Resources**: markdown listings of application areas, topics,
//!   institution types and membership types under `hipeac://metadata/`
//! - **Transports**: line-delimited JSON-RPC over stdio, or HTTP with an
//!   optional event stream
//!
//! ## Architecture
//!
//! ```text
//! AI Agent
//!       │
//!       │ MCP protocol (tools / resources)
//!       ▼
//! ┌──────────────────┐
//! │  McpServer       │
//! │  1. Dispatch     │
//! │  2. Decode args  │  ← typed requests
//! │  3. Directory    │  ← hipeac-directory
//! │  4. Render       │
//! └────────┬─────────┘
//!          │
//!          ▼
//!    DirectoryStore (MySQL)
//! ```
//!
//! ## Example Usage
//!
//! ```ignore
//! use hipeac_core::{DirectoryConfig, McpConfig};
//! use hipeac_directory::Directory;
//! use hipeac_mcp::McpServer;
//! use std::sync::Arc;
//!
//! let directory = Directory::new(store, DirectoryConfig::default());
//! let server = McpServer::new(McpConfig::default(), Arc::new(directory));
//! server.run().await?;
//! ```

pub mod error;
pub mod executor;
pub mod http_transport;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tool_definitions;
pub mod tools;

pub use error::McpError;
pub use executor::ToolExecutor;
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION,
    ResourceContents, ResourceDefinition, ToolAnnotations, ToolContent, ToolDefinition,
};
pub use resources::MetadataResource;
pub use server::McpServer;
pub use tools::ToolRegistry;
