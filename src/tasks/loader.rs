use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fast_image_resize as fir;
use image::RgbaImage;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;
use crate::events::{DecodedImage, DecodedSource, LoadRequest, SourceEvent};
use crate::source::SourceRequest;

/// Decode worker. Requests are served one at a time, so completions reach
/// the viewer in request order and the latest request always wins.
pub async fn run(
    mut load_rx: Receiver<LoadRequest>,
    to_viewer: Sender<SourceEvent>,
    cancel: CancellationToken,
    max_dimension: u32,
) -> Result<()> {
    loop {
        select! {
            _ = cancel.cancelled() => break,
            maybe = load_rx.recv() => {
                let Some(LoadRequest(request)) = maybe else { break };
                debug!(source = %request.describe(), "decoding");
                let event = decode_request(request, max_dimension).await;
                if let SourceEvent::Failed { path, reason } = &event {
                    warn!(path = %path.display(), reason = %reason, "source rejected");
                }
                if to_viewer.send(event).await.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn decode_request(request: SourceRequest, max_dimension: u32) -> SourceEvent {
    match request.clone() {
        SourceRequest::Composite { path } => {
            match decode_on_worker(path, max_dimension).await {
                Ok(image) => SourceEvent::Loaded {
                    request,
                    source: DecodedSource::Composite(image),
                },
                Err(err) => failure_event(err),
            }
        }
        SourceRequest::Pair { left, right } => {
            let (left_res, right_res) = tokio::join!(
                decode_on_worker(left, max_dimension),
                decode_on_worker(right, max_dimension),
            );
            match (left_res, right_res) {
                (Ok(left), Ok(right)) => {
                    if left.width as u64 * right.height as u64
                        != right.width as u64 * left.height as u64
                    {
                        warn!(
                            left = %left.path.display(),
                            right = %right.path.display(),
                            "pair halves differ in aspect ratio; placement follows the left image"
                        );
                    }
                    SourceEvent::Loaded {
                        request,
                        source: DecodedSource::Pair { left, right },
                    }
                }
                (Err(err), _) | (_, Err(err)) => failure_event(err),
            }
        }
    }
}

fn failure_event(err: Error) -> SourceEvent {
    match err {
        Error::Decode { path, reason } => SourceEvent::Failed { path, reason },
        other => SourceEvent::Failed {
            path: PathBuf::new(),
            reason: other.to_string(),
        },
    }
}

async fn decode_on_worker(path: PathBuf, max_dimension: u32) -> Result<DecodedImage, Error> {
    let joined = tokio::task::spawn_blocking({
        let path = path.clone();
        move || decode_rgba8(&path, max_dimension)
    })
    .await;
    match joined {
        Ok(Ok(image)) => Ok(image),
        Ok(Err(err)) => Err(Error::Decode {
            path,
            reason: format!("{err:#}"),
        }),
        Err(join_err) => Err(Error::Decode {
            path,
            reason: format!("decode worker panicked: {join_err}"),
        }),
    }
}

/// Decodes to RGBA8, corrects EXIF orientation, and downscales anything
/// larger than `max_dimension` so the texture upload cannot exceed device
/// limits.
fn decode_rgba8(path: &Path, max_dimension: u32) -> Result<DecodedImage> {
    let img = image::ImageReader::open(path)
        .context("failed to open file")?
        .with_guessed_format()
        .context("failed to sniff image format")?
        .decode()
        .context("decode failed")?;

    let rgba = apply_orientation(img.to_rgba8(), read_orientation(path).unwrap_or(1));
    let rgba = downscale_to_fit(rgba, max_dimension)?;
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        path: path.to_path_buf(),
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

// Maps the eight EXIF orientations; unknown values pass through unchanged.
fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    use image::imageops;
    match orientation {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)?;
    debug!(orientation = value, path = %path.display(), "exif orientation");
    Some(value as u16)
}

fn downscale_to_fit(source: RgbaImage, max_dimension: u32) -> Result<RgbaImage> {
    let (w, h) = source.dimensions();
    let largest = w.max(h);
    if largest <= max_dimension {
        return Ok(source);
    }
    let scale = max_dimension as f64 / largest as f64;
    let target_w = ((w as f64 * scale).round() as u32).max(1);
    let target_h = ((h as f64 * scale).round() as u32).max(1);
    debug!(from = %format!("{w}x{h}"), to = %format!("{target_w}x{target_h}"), "downscaling oversize source");

    let src_view = fir::images::ImageRef::new(w, h, source.as_raw(), fir::PixelType::U8x4)
        .context("failed to create source view for downscale")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("downscale failed")?;
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .context("failed to construct downscaled image")
}
