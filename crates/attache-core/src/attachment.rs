//! The attachment entity: a reference to content that may live inline, on
//! disk, or behind a URL.
//!
//! Three properties are derived on demand:
//!
//! | Property | Memoized | Source precedence |
//! |----------|----------|-------------------|
//! | [`Attachment::id`] | yes, per instance | inline → path → url |
//! | [`Attachment::resolve_type`] | no | explicit type, then path → url → inline |
//! | [`Attachment::content_bytes`] | no | inline → path → url |

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::fetch::{Fetch, HttpFetcher};
use crate::logging;
use crate::mime;
use crate::row::{Row, RowValue};

/// Where an attachment's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// Bytes already held in memory.
    Inline(Vec<u8>),
    /// A file on the local filesystem.
    Path(PathBuf),
    /// A remote HTTP(S) location.
    Url(String),
}

impl AttachmentSource {
    /// Short label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inline(_) => "inline",
            Self::Path(_) => "path",
            Self::Url(_) => "url",
        }
    }
}

/// A reference to a piece of binary content.
///
/// At most one [`AttachmentSource`] is authoritative for the identifier and
/// the content. When several are offered at construction (records,
/// deserialization) the highest-precedence one wins: inline content, then
/// path, then URL. The others are kept as secondary locations: type
/// resolution consults them and serialization writes them back.
///
/// The identifier is derived once and cached; concurrent first calls share a
/// single derivation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "AttachmentRecord", into = "AttachmentRecord")]
pub struct Attachment {
    mime_type: Option<String>,
    source: Option<AttachmentSource>,
    secondary: Vec<AttachmentSource>,
    id: OnceCell<String>,
}

impl PartialEq for Attachment {
    fn eq(&self, other: &Self) -> bool {
        self.mime_type == other.mime_type
            && self.source == other.source
            && self.secondary == other.secondary
            && self.id.get() == other.id.get()
    }
}

impl Attachment {
    /// An attachment with no source. Valid as data, but every derivation
    /// except [`Attachment::id`] fails on it.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(source: AttachmentSource) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self::new(AttachmentSource::Inline(content.into()))
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(AttachmentSource::Path(path.into()))
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(AttachmentSource::Url(url.into()))
    }

    /// Build from independently optional fields. The highest-precedence
    /// source becomes authoritative; the rest are kept as secondary
    /// locations.
    pub fn from_parts(
        mime_type: Option<String>,
        content: Option<Vec<u8>>,
        path: Option<PathBuf>,
        url: Option<String>,
        id: Option<String>,
    ) -> Self {
        let mut offered = content
            .map(AttachmentSource::Inline)
            .into_iter()
            .chain(path.map(AttachmentSource::Path))
            .chain(url.map(AttachmentSource::Url));
        let source = offered.next();
        let secondary: Vec<AttachmentSource> = offered.collect();

        if !secondary.is_empty() {
            debug!(
                subsystem = logging::SUBSYSTEM,
                component = logging::COMPONENT_ATTACHMENT,
                op = logging::OP_CONSTRUCT,
                source_kind = source.as_ref().map(AttachmentSource::kind),
                secondary = secondary.len(),
                "Multiple sources supplied; lower-precedence ones kept as secondary"
            );
        }

        Self {
            mime_type,
            source,
            secondary,
            id: OnceCell::new_with(id),
        }
    }

    /// Declare the MIME type explicitly. Detection never overrides it.
    pub fn with_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Seed the identifier, e.g. when it was stored alongside the record.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = OnceCell::new_with(Some(id.into()));
        self
    }

    /// Construct from a generic record, e.g. a database row.
    ///
    /// Recognized keys are `id`, `type`, `path`, `url` (text) and `content`
    /// (bytes). A key that is absent, null, or carries a different type is
    /// skipped and the field stays unset. Never fails; see
    /// [`Attachment::try_from_row`] for a strict variant.
    pub fn from_row(row: &Row) -> Self {
        let text = |key: &str| {
            row.get(key)
                .and_then(RowValue::as_text)
                .map(str::to_string)
        };
        let content = row
            .get("content")
            .and_then(RowValue::as_bytes)
            .map(<[u8]>::to_vec);

        Self::from_parts(
            text("type"),
            content,
            text("path").map(PathBuf::from),
            text("url"),
            text("id"),
        )
    }

    /// Like [`Attachment::from_row`], but a recognized key holding a value of
    /// the wrong type is an [`Error::InvalidField`]. Null still counts as
    /// absent.
    pub fn try_from_row(row: &Row) -> Result<Self> {
        fn text(row: &Row, key: &'static str) -> Result<Option<String>> {
            match row.get(key) {
                None | Some(RowValue::Null) => Ok(None),
                Some(RowValue::Text(s)) => Ok(Some(s.clone())),
                Some(other) => Err(Error::InvalidField {
                    key,
                    expected: "text",
                    actual: other.type_name(),
                }),
            }
        }

        let content = match row.get("content") {
            None | Some(RowValue::Null) => None,
            Some(RowValue::Bytes(b)) => Some(b.clone()),
            Some(other) => {
                return Err(Error::InvalidField {
                    key: "content",
                    expected: "bytes",
                    actual: other.type_name(),
                })
            }
        };

        Ok(Self::from_parts(
            text(row, "type")?,
            content,
            text(row, "path")?.map(PathBuf::from),
            text(row, "url")?,
            text(row, "id")?,
        ))
    }

    /// The explicitly declared MIME type, if any.
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// The authoritative source used for the identifier and the content.
    pub fn source(&self) -> Option<&AttachmentSource> {
        self.source.as_ref()
    }

    /// Every location set on this attachment, authoritative one first.
    pub fn sources(&self) -> impl Iterator<Item = &AttachmentSource> {
        self.source.iter().chain(self.secondary.iter())
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.sources().find_map(|source| match source {
            AttachmentSource::Inline(bytes) => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.sources().find_map(|source| match source {
            AttachmentSource::Path(path) => Some(path.as_path()),
            _ => None,
        })
    }

    pub fn url(&self) -> Option<&str> {
        self.sources().find_map(|source| match source {
            AttachmentSource::Url(url) => Some(url.as_str()),
            _ => None,
        })
    }

    /// The identifier if it has already been derived or supplied.
    pub fn cached_id(&self) -> Option<&str> {
        self.id.get().map(String::as_str)
    }

    fn source_kind(&self) -> &'static str {
        self.source.as_ref().map_or("none", AttachmentSource::kind)
    }

    // -------------------------------------------------------------------------
    // Identifier
    // -------------------------------------------------------------------------

    /// Stable content-derived identifier, computed once per instance.
    ///
    /// - inline bytes: hex SHA-256 of the bytes
    /// - path: hex SHA-256 of the file contents
    /// - url: hex SHA-256 of `{"url":"<url>"}`; no request is made
    /// - no source: the empty string
    ///
    /// A failed derivation caches nothing, so a later call retries.
    pub async fn id(&self) -> Result<&str> {
        if let Some(id) = self.id.get() {
            trace!(
                subsystem = logging::SUBSYSTEM,
                component = logging::COMPONENT_ATTACHMENT,
                op = logging::OP_ID,
                "Identifier cached"
            );
            return Ok(id.as_str());
        }
        let id = self.id.get_or_try_init(|| self.derive_id()).await?;
        Ok(id.as_str())
    }

    async fn derive_id(&self) -> Result<String> {
        let id = match &self.source {
            Some(AttachmentSource::Inline(bytes)) => sha256_hex(bytes),
            Some(AttachmentSource::Path(path)) => {
                let bytes = tokio::fs::read(path).await?;
                debug!(
                    subsystem = logging::SUBSYSTEM,
                    component = logging::COMPONENT_ATTACHMENT,
                    op = logging::OP_ID,
                    path = %path.display(),
                    byte_len = bytes.len(),
                    "Hashed file contents"
                );
                sha256_hex(&bytes)
            }
            Some(AttachmentSource::Url(url)) => sha256_hex(&url_key(url)?),
            None => {
                warn!(
                    subsystem = logging::SUBSYSTEM,
                    component = logging::COMPONENT_ATTACHMENT,
                    op = logging::OP_ID,
                    "Attachment has no source; caching empty identifier"
                );
                String::new()
            }
        };
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Type
    // -------------------------------------------------------------------------

    /// Resolve the MIME type using the process-wide [`HttpFetcher`].
    pub async fn resolve_type(&self) -> Result<String> {
        self.resolve_type_with(HttpFetcher::shared()).await
    }

    /// Resolve the MIME type. The explicit type wins; otherwise the file is
    /// sniffed, the URL's `Content-Type` is read via HEAD, or the inline bytes
    /// are sniffed, in that order across all locations set. Not cached.
    pub async fn resolve_type_with(&self, fetcher: &dyn Fetch) -> Result<String> {
        if let Some(ref mime_type) = self.mime_type {
            return Ok(mime_type.clone());
        }

        let (resolved, source_kind) = if let Some(path) = self.path() {
            (mime::detect_file(path).await?, "path")
        } else if let Some(url) = self.url() {
            (fetcher.head_content_type(url).await?, "url")
        } else if let Some(bytes) = self.content() {
            (mime::detect_bytes(bytes), "inline")
        } else {
            return Err(Error::NoType);
        };

        debug!(
            subsystem = logging::SUBSYSTEM,
            component = logging::COMPONENT_ATTACHMENT,
            op = logging::OP_RESOLVE_TYPE,
            source_kind,
            mime_type = %resolved,
            "Resolved type"
        );
        Ok(resolved)
    }

    // -------------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------------

    /// Fetch the raw bytes using the process-wide [`HttpFetcher`].
    pub async fn content_bytes(&self) -> Result<Cow<'_, [u8]>> {
        self.content_bytes_with(HttpFetcher::shared()).await
    }

    /// Fetch the raw bytes. Inline content is borrowed; files are read and
    /// URLs fetched on every call.
    pub async fn content_bytes_with(&self, fetcher: &dyn Fetch) -> Result<Cow<'_, [u8]>> {
        let bytes = match &self.source {
            Some(AttachmentSource::Inline(bytes)) => return Ok(Cow::Borrowed(bytes.as_slice())),
            Some(AttachmentSource::Path(path)) => tokio::fs::read(path).await?,
            Some(AttachmentSource::Url(url)) => fetcher.get_bytes(url).await?,
            None => return Err(Error::NoContent),
        };

        debug!(
            subsystem = logging::SUBSYSTEM,
            component = logging::COMPONENT_ATTACHMENT,
            op = logging::OP_CONTENT_BYTES,
            source_kind = self.source_kind(),
            byte_len = bytes.len(),
            "Loaded content"
        );
        Ok(Cow::Owned(bytes))
    }

    /// Standard (padded) base64 of [`Attachment::content_bytes`].
    pub async fn base64_content(&self) -> Result<String> {
        self.base64_content_with(HttpFetcher::shared()).await
    }

    pub async fn base64_content_with(&self, fetcher: &dyn Fetch) -> Result<String> {
        let bytes = self.content_bytes_with(fetcher).await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compact `{"url":"..."}` with `<`, `>`, `&`, U+2028 and U+2029 written as
/// `\uXXXX`, so identifiers match those stored by existing producers.
fn url_key(url: &str) -> Result<Vec<u8>> {
    let mut key = BTreeMap::new();
    key.insert("url", url);

    let mut buf = Vec::with_capacity(url.len() + 10);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, HtmlSafeFormatter);
    key.serialize(&mut serializer)?;
    Ok(buf)
}

struct HtmlSafeFormatter;

impl serde_json::ser::Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

// =============================================================================
// SERIALIZED FORM
// =============================================================================

/// Wire shape: every field optional and omitted when unset, content as
/// standard base64.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AttachmentRecord {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    content: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl From<AttachmentRecord> for Attachment {
    fn from(record: AttachmentRecord) -> Self {
        Self::from_parts(
            record.mime_type,
            record.content,
            record.path,
            record.url,
            record.id,
        )
    }
}

impl From<Attachment> for AttachmentRecord {
    fn from(attachment: Attachment) -> Self {
        let mut record = AttachmentRecord {
            mime_type: attachment.mime_type,
            id: attachment.id.into_inner(),
            ..Default::default()
        };
        for source in attachment.source.into_iter().chain(attachment.secondary) {
            match source {
                AttachmentSource::Inline(bytes) => record.content = Some(bytes),
                AttachmentSource::Path(path) => record.path = Some(path),
                AttachmentSource::Url(url) => record.url = Some(url),
            }
        }
        record
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}
