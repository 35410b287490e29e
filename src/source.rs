use std::path::{Path, PathBuf};

use crate::error::Error;

/// Opaque handle to a texture owned by the rendering side. The source model
/// addresses images through these and never touches GPU resources itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u64);

/// Uploaded image: its handle plus the pixel dimensions the mapping math needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub handle: ImageHandle,
    pub width: u32,
    pub height: u32,
}

/// What the user asked to view, before anything has been decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRequest {
    Composite { path: PathBuf },
    Pair { left: PathBuf, right: PathBuf },
}

impl SourceRequest {
    /// Builds the configured requests from optional paths. A pair missing
    /// either half is rejected outright rather than degraded; composite and
    /// pair may both be configured (the viewer switches between them).
    pub fn from_paths(
        composite: Option<PathBuf>,
        left: Option<PathBuf>,
        right: Option<PathBuf>,
    ) -> Result<Vec<SourceRequest>, Error> {
        let mut requests = Vec::new();
        if let Some(path) = composite {
            requests.push(SourceRequest::Composite { path });
        }
        match (left, right) {
            (Some(left), Some(right)) => requests.push(SourceRequest::Pair { left, right }),
            (None, None) => {}
            (Some(_), None) => {
                return Err(Error::InvalidSource(
                    "pair source is missing its right half".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(Error::InvalidSource(
                    "pair source is missing its left half".into(),
                ));
            }
        }
        Ok(requests)
    }

    pub fn paths(&self) -> Vec<&Path> {
        match self {
            SourceRequest::Composite { path } => vec![path],
            SourceRequest::Pair { left, right } => vec![left, right],
        }
    }

    /// Short label for logs.
    pub fn describe(&self) -> String {
        match self {
            SourceRequest::Composite { path } => format!("composite {}", path.display()),
            SourceRequest::Pair { left, right } => {
                format!("pair {} | {}", left.display(), right.display())
            }
        }
    }
}

/// A resolved stereo source: textures are uploaded and addressable. The pair
/// shape is complete by construction, so an incomplete pair cannot exist past
/// the request stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoSource {
    Composite { image: ImageInfo },
    Pair { left: ImageInfo, right: ImageInfo },
}

impl StereoSource {
    /// Handles held by this source, for release when it is replaced.
    pub fn handles(&self) -> Vec<ImageHandle> {
        match *self {
            StereoSource::Composite { image } => vec![image.handle],
            StereoSource::Pair { left, right } => vec![left.handle, right.handle],
        }
    }

    /// True when the pair halves disagree about aspect ratio. Composite
    /// sources trivially match.
    pub fn pair_aspects_match(&self) -> bool {
        match *self {
            StereoSource::Composite { .. } => true,
            StereoSource::Pair { left, right } => {
                u64::from(left.width) * u64::from(right.height)
                    == u64::from(right.width) * u64::from(left.height)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_and_pair_may_coexist() {
        let reqs = SourceRequest::from_paths(
            Some(PathBuf::from("c.jpg")),
            Some(PathBuf::from("l.png")),
            Some(PathBuf::from("r.png")),
        )
        .unwrap();
        assert_eq!(reqs.len(), 2);
        assert!(matches!(reqs[0], SourceRequest::Composite { .. }));
        assert!(matches!(reqs[1], SourceRequest::Pair { .. }));
    }

    #[test]
    fn half_pair_is_rejected() {
        let err = SourceRequest::from_paths(None, Some(PathBuf::from("l.png")), None).unwrap_err();
        assert!(matches!(err, Error::InvalidSource(_)));
        let err = SourceRequest::from_paths(None, None, Some(PathBuf::from("r.png"))).unwrap_err();
        assert!(matches!(err, Error::InvalidSource(_)));
    }

    #[test]
    fn nothing_configured_is_valid() {
        assert!(SourceRequest::from_paths(None, None, None).unwrap().is_empty());
    }

    #[test]
    fn pair_aspect_mismatch_detected() {
        let info = |w, h, id| ImageInfo {
            handle: ImageHandle(id),
            width: w,
            height: h,
        };
        let matched = StereoSource::Pair {
            left: info(800, 600, 1),
            right: info(400, 300, 2),
        };
        assert!(matched.pair_aspects_match());
        let skewed = StereoSource::Pair {
            left: info(800, 600, 1),
            right: info(800, 400, 2),
        };
        assert!(!skewed.pair_aspects_match());
    }
}
