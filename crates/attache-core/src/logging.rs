//! Structured logging schema for attache.
//!
//! Every `tracing` event in this crate carries the same identity fields so
//! log aggregation can filter by them:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `subsystem` | Always [`SUBSYSTEM`] |
//! | `component` | One of the `COMPONENT_*` values |
//! | `op` | One of the `OP_*` values |
//! | `source_kind` | "inline", "path", "url" or "none" |
//! | `path` / `url` | Location being read or fetched |
//! | `byte_len` | Bytes read, fetched or hashed |
//! | `mime_type` | Resolved or reported MIME type |
//! | `status` | HTTP status code |
//! | `duration_ms` | Wall-clock duration in milliseconds |
//! | `error` | Error message when an operation falls back |
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | WARN  | Recoverable oddity (non-success HTTP status, empty identifier) |
//! | DEBUG | I/O performed on behalf of a derivation |
//! | TRACE | Cache hits that skip I/O |

// ─── Identity values ───────────────────────────────────────────────────────

/// Value of the `subsystem` field.
pub const SUBSYSTEM: &str = "attache";

/// `component` of events from [`crate::Attachment`].
pub const COMPONENT_ATTACHMENT: &str = "attachment";

/// `component` of events from [`crate::HttpFetcher`].
pub const COMPONENT_FETCH: &str = "fetch";

/// `component` of events from [`crate::mime`].
pub const COMPONENT_MIME: &str = "mime";

// ─── Operation values ──────────────────────────────────────────────────────

pub const OP_ID: &str = "id";
pub const OP_RESOLVE_TYPE: &str = "resolve_type";
pub const OP_CONTENT_BYTES: &str = "content_bytes";
pub const OP_CONSTRUCT: &str = "construct";
pub const OP_HEAD: &str = "head";
pub const OP_GET: &str = "get";
pub const OP_SNIFF: &str = "sniff";
