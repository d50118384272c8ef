//! # attache-core
//!
//! Attachment references with lazy identifier, type and content resolution.
//!
//! An [`Attachment`] points at content held inline, on disk, or behind a
//! URL. From any of those it derives the same three things: a stable
//! SHA-256 based identifier, a MIME type, and the raw bytes.
//!
//! ```no_run
//! # async fn demo() -> attache_core::Result<()> {
//! use attache_core::Attachment;
//!
//! let attachment = Attachment::from_path("/srv/uploads/report.pdf");
//! let id = attachment.id().await?;
//! let mime = attachment.resolve_type().await?;
//! let encoded = attachment.base64_content().await?;
//! # let _ = (id, mime, encoded);
//! # Ok(())
//! # }
//! ```
//!
//! Events are emitted through `tracing` using the field schema in
//! [`logging`]. The crate never installs a subscriber.

pub mod attachment;
pub mod defaults;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod mime;
pub mod row;

// Re-export commonly used types at crate root
pub use attachment::{Attachment, AttachmentSource};
pub use defaults::FetchConfig;
pub use error::{Error, Result};
pub use fetch::{Fetch, HttpFetcher};
pub use row::{Row, RowValue};
