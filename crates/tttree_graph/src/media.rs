// SPDX-License-Identifier: MIT OR Apache-2.0
//! Asynchronous media loading for image, video and data input nodes.
//!
//! Decoding happens on a dedicated worker thread so a slow disk or a large
//! file never stalls a tick. The host polls [`MediaLoader::poll`] between
//! ticks and hands each [`LoadOutcome`] to [`crate::Graph::apply_load`].

use crate::node::NodeId;
use image::{DynamicImage, GenericImageView};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use url::Url;

/// Kind of displayable media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Still image
    Image,
    /// Video clip
    Video,
}

/// A decoded media resource.
///
/// Owned by the input node that loaded it; everything downstream holds an
/// `Arc` to the same instance.
pub struct MediaResource {
    /// Image or video
    pub kind: MediaKind,
    /// Resolved source locator handed to the presentation surface
    pub locator: String,
    /// Pixel dimensions, when known
    pub dimensions: Option<(u32, u32)>,
    image: Option<DynamicImage>,
}

impl MediaResource {
    /// Resource known only by its locator (no decoded pixels)
    pub fn with_locator(kind: MediaKind, locator: impl Into<String>) -> Self {
        Self {
            kind,
            locator: locator.into(),
            dimensions: None,
            image: None,
        }
    }

    /// Resource backed by a decoded image
    pub fn from_image(locator: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            kind: MediaKind::Image,
            locator: locator.into(),
            dimensions: Some(image.dimensions()),
            image: Some(image),
        }
    }

    /// Decoded pixels, for images
    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_ref()
    }

    /// A resource without a locator cannot be displayed
    pub fn is_ready(&self) -> bool {
        !self.locator.is_empty()
    }
}

impl fmt::Debug for MediaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaResource")
            .field("kind", &self.kind)
            .field("locator", &self.locator)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl PartialEq for MediaResource {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.locator == other.locator
    }
}

/// What a load request should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// Decode an image file
    Image,
    /// Validate a video container
    Video,
    /// Read a UTF-8 text file
    Text,
}

impl LoadKind {
    /// File extensions accepted for this kind
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Image => &["png", "jpg", "jpeg", "gif", "bmp", "ico", "tga", "webp", "hdr"],
            Self::Video => &["mp4", "m4v", "mov", "webm", "mkv", "ogv"],
            Self::Text => &["txt", "csv", "json", "md"],
        }
    }
}

/// Request for the worker
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Node that asked for the load
    pub node: NodeId,
    /// What to produce
    pub kind: LoadKind,
    /// Path or `file://` URL, exactly as the node stores it
    pub source: String,
}

/// Successfully loaded data
#[derive(Debug, Clone)]
pub enum Loaded {
    /// Image or video resource
    Media(Arc<MediaResource>),
    /// Text file contents
    Text {
        /// File contents
        text: String,
        /// File name without directory
        filename: String,
    },
}

/// Completion notification for one request
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Node that asked for the load
    pub node: NodeId,
    /// Source string of the request
    pub source: String,
    /// Loaded data or the reason it failed
    pub result: Result<Loaded, MediaError>,
}

/// Errors that can occur while loading media
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
    /// Source string is neither a path nor a file URL
    #[error("Invalid media source: {0}")]
    InvalidSource(String),
    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// File could not be decoded
    #[error("Failed to decode {path}: {reason}")]
    Decode {
        /// File that failed
        path: String,
        /// Decoder message
        reason: String,
    },
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// The worker thread is gone
    #[error("Media worker unavailable")]
    WorkerUnavailable,
}

/// Resolve a stored source string to a filesystem path.
pub fn source_to_path(source: &str) -> Result<PathBuf, MediaError> {
    if source.trim().is_empty() {
        return Err(MediaError::InvalidSource(source.to_string()));
    }
    match Url::parse(source) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|()| MediaError::InvalidSource(source.to_string())),
        // Windows drive letters parse as a one-letter scheme
        Ok(url) if url.scheme().len() > 1 => Err(MediaError::InvalidSource(source.to_string())),
        _ => Ok(PathBuf::from(source)),
    }
}

/// Resolve a path to the `file://` locator published to subscribers.
pub fn path_to_locator(path: &Path) -> Result<String, MediaError> {
    let absolute = path
        .canonicalize()
        .map_err(|e| MediaError::Io(e.to_string()))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| MediaError::InvalidSource(path.display().to_string()))
}

/// Background loader for media and data files
pub struct MediaLoader {
    /// Channel for sending load requests
    request_tx: mpsc::UnboundedSender<LoadRequest>,
    /// Channel for receiving completions
    result_rx: mpsc::UnboundedReceiver<LoadOutcome>,
    /// Requests sent but not yet reported back
    pending: usize,
}

impl MediaLoader {
    /// Create a loader and spawn its worker thread
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            media_worker(request_rx, result_tx);
        });

        Self {
            request_tx,
            result_rx,
            pending: 0,
        }
    }

    /// Queue a load. Completion arrives through [`Self::poll`].
    pub fn request(&mut self, request: LoadRequest) -> Result<(), MediaError> {
        tracing::debug!(node = ?request.node, source = %request.source, "queueing media load");
        self.request_tx
            .send(request)
            .map_err(|_| MediaError::WorkerUnavailable)?;
        self.pending += 1;
        Ok(())
    }

    /// Drain every completion that is ready right now. Never blocks.
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.result_rx.try_recv() {
            if let Err(e) = &outcome.result {
                tracing::warn!("Media load failed for {}: {}", outcome.source, e);
            }
            self.pending = self.pending.saturating_sub(1);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Poll until every queued request has completed or `timeout` passes.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<LoadOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = self.poll();
        while self.pending > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            outcomes.extend(self.poll());
        }
        outcomes
    }

    /// Number of loads still in flight
    pub fn pending_count(&self) -> usize {
        self.pending
    }
}

impl Default for MediaLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker thread that processes load requests
fn media_worker(
    mut request_rx: mpsc::UnboundedReceiver<LoadRequest>,
    result_tx: mpsc::UnboundedSender<LoadOutcome>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create media runtime: {e}");
            while let Some(request) = request_rx.blocking_recv() {
                let outcome = LoadOutcome {
                    node: request.node,
                    source: request.source,
                    result: Err(MediaError::WorkerUnavailable),
                };
                if result_tx.send(outcome).is_err() {
                    break;
                }
            }
            return;
        }
    };

    rt.block_on(async {
        while let Some(request) = request_rx.recv().await {
            let result = load(request.kind, &request.source).await;
            let outcome = LoadOutcome {
                node: request.node,
                source: request.source,
                result,
            };
            if result_tx.send(outcome).is_err() {
                break; // Loader dropped
            }
        }
    });
}

async fn load(kind: LoadKind, source: &str) -> Result<Loaded, MediaError> {
    let path = source_to_path(source)?;
    if !path.exists() {
        return Err(MediaError::NotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| MediaError::UnsupportedFormat("No extension".to_string()))?;
    if !kind.extensions().contains(&ext.as_str()) {
        return Err(MediaError::UnsupportedFormat(ext));
    }

    let data = tokio::fs::read(&path)
        .await
        .map_err(|e| MediaError::Io(e.to_string()))?;
    let decode_error = |reason: String| MediaError::Decode {
        path: path.display().to_string(),
        reason,
    };

    match kind {
        LoadKind::Image => {
            let img = image::load_from_memory(&data).map_err(|e| decode_error(e.to_string()))?;
            let locator = path_to_locator(&path)?;
            Ok(Loaded::Media(Arc::new(MediaResource::from_image(locator, img))))
        }
        LoadKind::Video => {
            if !is_video_container(&ext, &data) {
                return Err(decode_error("unrecognized video container".to_string()));
            }
            let locator = path_to_locator(&path)?;
            Ok(Loaded::Media(Arc::new(MediaResource::with_locator(
                MediaKind::Video,
                locator,
            ))))
        }
        LoadKind::Text => {
            let text = String::from_utf8(data).map_err(|e| decode_error(e.to_string()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Loaded::Text { text, filename })
        }
    }
}

/// Cheap header check for the containers browsers play.
fn is_video_container(ext: &str, data: &[u8]) -> bool {
    match ext {
        "mp4" | "m4v" | "mov" => data.get(4..8) == Some(b"ftyp".as_slice()),
        "webm" | "mkv" => data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]),
        "ogv" => data.starts_with(b"OggS"),
        _ => false,
    }
}
