//! Static file origin.
//!
//! # Responsibilities
//! - Map the request path onto a location's root directory
//! - Describe the file as file-backed body units, never reading it here
//!
//! # Design Decisions
//! - Paths are taken verbatim; `..`, backslashes and NUL are refused
//! - The whole file is described up front in regions of `read_chunk_size`

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::filter::{Chunk, FileRegion, ResponseHead};
use crate::origin::{BodySource, OriginError, OriginResponse};

/// Serves files below a root directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    read_chunk_size: u64,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, read_chunk_size: u64) -> Self {
        Self {
            root: root.into(),
            read_chunk_size: read_chunk_size.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a request path to a file below the root.
    pub fn resolve(&self, uri_path: &str) -> Result<PathBuf, OriginError> {
        let mut path = self.root.clone();
        for segment in uri_path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(OriginError::Forbidden),
                s if s.contains('\\') || s.contains('\0') => return Err(OriginError::Forbidden),
                s => path.push(s),
            }
        }
        Ok(path)
    }

    pub async fn serve(&self, method: &Method, uri_path: &str) -> Result<OriginResponse, OriginError> {
        if method != Method::GET && method != Method::HEAD {
            return Err(OriginError::MethodNotAllowed);
        }

        let path = self.resolve(uri_path)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(OriginError::NotFound),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(OriginError::Forbidden)
            }
            Err(e) => return Err(OriginError::Io(e)),
        };
        if !metadata.is_file() {
            return Err(OriginError::NotFound);
        }

        let file = tokio::fs::File::open(&path).await.map_err(OriginError::Io)?;
        let file = Arc::new(file.into_std().await);
        let len = metadata.len();

        tracing::debug!(path = %path.display(), len, "Serving static file");

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type(&path)));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

        Ok(OriginResponse {
            head: ResponseHead::from_parts(StatusCode::OK, headers),
            body: file_runs(file, len, self.read_chunk_size),
            cache_status: None,
        })
    }
}

/// Describe `[0, len)` of `file` as one region per run; the final run also
/// carries the end marker.
pub fn file_runs(file: Arc<std::fs::File>, len: u64, chunk_size: u64) -> BodySource {
    let chunk_size = chunk_size.max(1);

    stream::unfold(Some(0u64), move |pos| {
        let file = file.clone();
        async move {
            let Some(pos) = pos else {
                return None;
            };
            let end = pos.saturating_add(chunk_size).min(len);

            let mut run = Vec::with_capacity(2);
            if end > pos {
                run.push(Chunk::File(FileRegion::new(file, pos, end)));
            }

            let next = if end >= len {
                run.push(Chunk::Last);
                None
            } else {
                Some(end)
            };

            Some((Ok::<_, std::io::Error>(run), next))
        }
    })
    .boxed()
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("flv") => "video/x-flv",
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("f4v") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("html") | Some("htm") => "text/html",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("xml") => "text/xml",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("swf") => "application/x-shockwave-flash",
        _ => "application/octet-stream",
    }
}
