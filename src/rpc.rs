//! Bare interface contract for the external compile-server boundary (spec
//! §6.4): method name constants, JSON-RPC 2.0 error codes, and request/
//! response shapes. No transport, framing, or process management lives
//! here — that is left to whatever embeds this crate behind a socket.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const METHOD_IDENTIFY: &str = "identify";
pub const METHOD_STOP: &str = "stop";
pub const METHOD_COMPILE: &str = "compile";

/// Reserved JSON-RPC 2.0 error codes (<https://www.jsonrpc.org/specification#error_object>).
pub const ERROR_PARSE: i64 = -32700;
pub const ERROR_INVALID_REQUEST: i64 = -32600;
pub const ERROR_METHOD_NOT_FOUND: i64 = -32601;
pub const ERROR_INVALID_PARAMS: i64 = -32602;
pub const ERROR_INTERNAL: i64 = -32603;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IdentifyResponse {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompileRequest {
    pub id: u64,
    pub source: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompileResponse {
    pub id: u64,
    /// S-expression rendering of the compiled result (spec §4.2).
    pub sxpr: String,
    pub errors: Vec<RpcErrorEntry>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RpcErrorEntry {
    pub position: usize,
    pub severity: String,
    pub message: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}
