use std::path::PathBuf;

use crate::source::SourceRequest;

/// Ask the loader to decode a source. Requests are served strictly in
/// order, so the most recently requested source is always the one shown.
#[derive(Debug, Clone)]
pub struct LoadRequest(pub SourceRequest);

/// CPU-side pixels ready for upload, RGBA8 tightly packed.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decoded payload matching the request shape. A pair is only emitted once
/// both halves decoded, so downstream never sees a partial source.
#[derive(Debug, Clone)]
pub enum DecodedSource {
    Composite(DecodedImage),
    Pair {
        left: DecodedImage,
        right: DecodedImage,
    },
}

/// Loader -> viewer.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    Loaded {
        request: SourceRequest,
        source: DecodedSource,
    },
    Failed {
        path: PathBuf,
        reason: String,
    },
}

/// Identifies one of the renderer's eye surfaces to the session driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

/// Viewer -> immersive driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmersiveRequest {
    /// Negotiate a session; answered by `Granted` or `Denied`.
    Begin,
    /// Bind each eye surface exclusively to its output channel.
    BindEyes { left: SurfaceId, right: SurfaceId },
    /// End the session; answered by `Ended`.
    End,
}

/// Immersive driver -> viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImmersiveEvent {
    Granted,
    Denied(String),
    /// The device composited a frame from the bound surfaces.
    FramePresented,
    Ended,
}
