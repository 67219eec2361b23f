//! Range-aware video byte streaming.
//!
//! A request resolves to a [`ServeWindow`] over the backing file, and the
//! bytes inside that window are delivered as bounded chunks by a
//! [`ByteRangeStream`] that owns the open file handle. Dropping the stream
//! (client gone, error, or completion) closes the file.

use std::io::{ErrorKind, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::Stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::core::error::{AppError, Result};
use crate::features::videos::services::VideoStore;
use crate::shared::constants::{FALLBACK_VIDEO_CONTENT_TYPE, VIDEO_CONTENT_TYPES};

/// What the client asked for in its `Range` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No header: serve the whole file with 200
    Full,
    /// `bytes=<start>-<end>`; either side may be missing
    Range { start: Option<u64>, end: Option<u64> },
    /// Header present but unusable: serve the whole file as a 206 range
    Malformed,
}

impl RangeRequest {
    /// Parse an optional `Range` header value.
    ///
    /// An unparsable start falls back to 0; an unparsable end, a missing
    /// `bytes=` unit or a missing `-` makes the header malformed. Only the
    /// first range of a multi-range header is considered.
    pub fn parse(header: Option<&str>) -> Self {
        let Some(raw) = header else {
            return RangeRequest::Full;
        };

        let Some(ranges) = raw.trim().strip_prefix("bytes=") else {
            return RangeRequest::Malformed;
        };

        let first = ranges.split(',').next().unwrap_or_default().trim();
        let Some((start_raw, end_raw)) = first.split_once('-') else {
            return RangeRequest::Malformed;
        };

        let start = start_raw.trim().parse::<u64>().ok();

        let end_raw = end_raw.trim();
        let end = if end_raw.is_empty() {
            None
        } else {
            match end_raw.parse::<u64>() {
                Ok(end) => Some(end),
                Err(_) => return RangeRequest::Malformed,
            }
        };

        RangeRequest::Range { start, end }
    }

    /// Resolve against the current file size.
    ///
    /// `end` is clamped to the last byte. A range that cannot be satisfied
    /// (start past end or past EOF) is downgraded to the full-file range,
    /// the same as a malformed header. An empty file is always served whole.
    pub fn resolve(self, total_size: u64) -> ServeWindow {
        if total_size == 0 {
            return ServeWindow::whole(0, false);
        }
        let last = total_size - 1;

        match self {
            RangeRequest::Full => ServeWindow::whole(total_size, false),
            RangeRequest::Malformed => ServeWindow::whole(total_size, true),
            RangeRequest::Range { start, end } => {
                let start = start.unwrap_or(0);
                let end = end.unwrap_or(last).min(last);
                if start > end {
                    return ServeWindow::whole(total_size, true);
                }
                ServeWindow {
                    start,
                    end,
                    total_size,
                    partial: true,
                }
            }
        }
    }
}

/// Inclusive byte window served for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeWindow {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
    /// 206 with `Content-Range` when true, 200 otherwise
    pub partial: bool,
}

impl ServeWindow {
    fn whole(total_size: u64, partial: bool) -> Self {
        Self {
            start: 0,
            end: total_size.saturating_sub(1),
            total_size,
            partial,
        }
    }

    /// Number of bytes in the window
    pub fn len(&self) -> u64 {
        if self.total_size == 0 {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}

/// Content type served for a stored file name. Unknown extensions fall back
/// to webm rather than failing.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    VIDEO_CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == extension)
        .map(|(_, content_type)| *content_type)
        .unwrap_or(FALLBACK_VIDEO_CONTENT_TYPE)
}

/// Bounded-chunk reader over one byte window of an open file.
///
/// Yields at most `chunk_size` bytes per item. If the file turns out shorter
/// than the window (truncated while streaming) the stream ends with an
/// `UnexpectedEof` error instead of silently sending fewer bytes than the
/// declared `Content-Length`.
pub struct ByteRangeStream {
    inner: ReaderStream<Take<File>>,
    remaining: u64,
    video_id: String,
}

impl ByteRangeStream {
    fn new(file: File, length: u64, chunk_size: usize, video_id: String) -> Self {
        Self {
            inner: ReaderStream::with_capacity(file.take(length), chunk_size),
            remaining: length,
            video_id,
        }
    }

    /// Bytes still to be delivered
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Stream for ByteRangeStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.remaining = this.remaining.saturating_sub(chunk.len() as u64);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                warn!("Read failed while streaming video {}: {}", this.video_id, e);
                this.remaining = 0;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) if this.remaining > 0 => {
                let missing = this.remaining;
                this.remaining = 0;
                Poll::Ready(Some(Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!(
                        "video {} ended {} bytes before the requested range",
                        this.video_id, missing
                    ),
                ))))
            }
            other => other,
        }
    }
}

impl Drop for ByteRangeStream {
    fn drop(&mut self) {
        if self.remaining() > 0 {
            debug!(
                "Stream for video {} closed with {} bytes unsent",
                self.video_id,
                self.remaining()
            );
        }
    }
}

/// An opened video ready to be written to the client
pub struct VideoStream {
    pub file_name: String,
    pub content_type: &'static str,
    pub window: ServeWindow,
    pub body: ByteRangeStream,
}

impl VideoStream {
    pub fn status(&self) -> StatusCode {
        if self.window.partial {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        }
    }

    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type),
        );
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.window.len()));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        if let Ok(disposition) =
            HeaderValue::from_str(&format!("inline; filename={}", self.file_name))
        {
            headers.insert(header::CONTENT_DISPOSITION, disposition);
        }

        if self.window.partial {
            if let Ok(range) = HeaderValue::from_str(&self.window.content_range()) {
                headers.insert(header::CONTENT_RANGE, range);
            }
        }

        headers
    }
}

impl IntoResponse for VideoStream {
    fn into_response(self) -> Response {
        let status = self.status();
        let headers = self.headers();
        (status, headers, Body::from_stream(self.body)).into_response()
    }
}

/// Serves stored videos, honoring HTTP byte-range requests
pub struct StreamingService {
    store: Arc<VideoStore>,
    chunk_size: usize,
}

impl StreamingService {
    pub fn new(store: Arc<VideoStore>, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Open a video for delivery.
    ///
    /// Unknown ids and records whose file is missing both surface as
    /// `NotFound` with the same message. The file size is read from the open
    /// handle, never from cached metadata.
    pub async fn open(&self, id: &str, range_header: Option<&str>) -> Result<VideoStream> {
        let record = self
            .store
            .find(id)
            .await
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

        let path = self.store.file_path(&record);
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "Video id={} has metadata but its file {} is missing; run reconciliation",
                    record.id,
                    path.display()
                );
                return Err(AppError::NotFound("Video not found".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let total_size = file.metadata().await?.len();
        let request = RangeRequest::parse(range_header);
        if request == RangeRequest::Malformed {
            debug!(
                "Malformed Range header {:?} for video {}, serving full range",
                range_header, record.id
            );
        }
        let window = request.resolve(total_size);

        if !window.is_empty() && window.start > 0 {
            file.seek(SeekFrom::Start(window.start)).await?;
        }

        debug!(
            "Streaming video {} bytes {}-{}/{} (partial={})",
            record.id, window.start, window.end, window.total_size, window.partial
        );

        Ok(VideoStream {
            content_type: content_type_for(&record.file_name),
            body: ByteRangeStream::new(file, window.len(), self.chunk_size, record.id),
            file_name: record.file_name,
            window,
        })
    }
}
