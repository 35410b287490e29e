use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::DriverKind;
use crate::events::{ImmersiveEvent, ImmersiveRequest};

/// Delay before the simulated driver reports its first presented frame.
const SIMULATED_FIRST_FRAME: Duration = Duration::from_millis(80);

/// Stands in for an immersive display driver. `simulated` grants sessions
/// and reports a presented frame shortly after; `stalled` grants but never
/// presents, which lets the viewer's frame watchdog run its course; `none`
/// rejects every session.
#[instrument(skip(req_rx, to_viewer, cancel))]
pub async fn run(
    kind: DriverKind,
    mut req_rx: Receiver<ImmersiveRequest>,
    to_viewer: Sender<ImmersiveEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut active = false;
    loop {
        select! {
            _ = cancel.cancelled() => break,
            maybe = req_rx.recv() => {
                let Some(request) = maybe else { break };
                if handle(request, kind, &mut active, &to_viewer).await.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn handle(
    request: ImmersiveRequest,
    kind: DriverKind,
    active: &mut bool,
    to_viewer: &Sender<ImmersiveEvent>,
) -> Result<(), tokio::sync::mpsc::error::SendError<ImmersiveEvent>> {
    match request {
        ImmersiveRequest::Begin => match kind {
            DriverKind::None => {
                info!("session rejected: no immersive display is available");
                to_viewer
                    .send(ImmersiveEvent::Denied(
                        "no immersive display is available".into(),
                    ))
                    .await?;
            }
            DriverKind::Simulated | DriverKind::Stalled => {
                *active = true;
                info!(driver = ?kind, "session granted");
                to_viewer.send(ImmersiveEvent::Granted).await?;
                if kind == DriverKind::Simulated {
                    let events = to_viewer.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(SIMULATED_FIRST_FRAME).await;
                        let _ = events.send(ImmersiveEvent::FramePresented).await;
                    });
                }
            }
        },
        ImmersiveRequest::BindEyes { left, right } => {
            debug!(left = left.0, right = right.0, "eye channels bound");
        }
        ImmersiveRequest::End => {
            if *active {
                *active = false;
                info!("session ended");
                to_viewer.send(ImmersiveEvent::Ended).await?;
            }
        }
    }
    Ok(())
}
