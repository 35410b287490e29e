use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use notify::event::{CreateKind, ModifyKind};
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::events::LoadRequest;
use crate::source::SourceRequest;

/// Grace period after the first touch so editors that write a file in
/// several steps trigger a single reload.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches the configured source files and re-requests a decode whenever
/// one changes on disk. Parent directories are watched rather than the
/// files themselves so replace-by-rename saves keep working.
#[instrument(skip_all, fields(sources = requests.len()))]
pub async fn run(
    requests: Vec<SourceRequest>,
    to_loader: Sender<LoadRequest>,
    cancel: CancellationToken,
) -> Result<()> {
    if requests.is_empty() {
        return Ok(());
    }
    let watched: Vec<WatchedSource> = requests.into_iter().map(WatchedSource::new).collect();

    // Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;

    let mut dirs = HashSet::new();
    for source in &watched {
        for path in &source.paths {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            if dirs.insert(dir.clone()) {
                watcher.watch(&dir, RecursiveMode::NonRecursive)?;
                info!(watching = %dir.display(), "source directory watched");
            }
        }
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting watch task");
                break;
            }
            maybe = watch_rx.recv() => {
                let Some(res) = maybe else { break };
                let mut touched = HashSet::new();
                collect_touched(res, &mut touched);
                if touched.is_empty() {
                    continue;
                }
                // Editors save in bursts; gather the rest before reloading.
                tokio::time::sleep(DEBOUNCE).await;
                while let Ok(res) = watch_rx.try_recv() {
                    collect_touched(res, &mut touched);
                }
                for source in watched.iter().filter(|s| s.is_touched(&touched)) {
                    debug!(source = %source.request.describe(), "changed on disk; reloading");
                    if to_loader
                        .send(LoadRequest(source.request.clone()))
                        .await
                        .is_err()
                    {
                        return Ok(());
                    }
                }
            }
        }
    }
    Ok(())
}

struct WatchedSource {
    request: SourceRequest,
    paths: Vec<PathBuf>,
}

impl WatchedSource {
    fn new(request: SourceRequest) -> Self {
        let paths = request.paths().into_iter().map(canonical).collect();
        Self { request, paths }
    }

    fn is_touched(&self, touched: &HashSet<PathBuf>) -> bool {
        self.paths.iter().any(|p| touched.contains(p))
    }
}

fn collect_touched(res: notify::Result<Event>, touched: &mut HashSet<PathBuf>) {
    match res {
        Ok(event) if is_reload_kind(&event.kind) => {
            for path in event.paths {
                touched.insert(canonical(&path));
            }
        }
        Ok(event) => debug!(kind = ?event.kind, "fs: ignored"),
        Err(err) => error!("watch error: {err}"),
    }
}

fn is_reload_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

// Removed files cannot be canonicalized; fall back to the path as given.
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, MetadataKind, RemoveKind, RenameMode};

    #[test]
    fn reload_kinds_cover_saves_and_renames() {
        assert!(is_reload_kind(&EventKind::Create(CreateKind::File)));
        assert!(is_reload_kind(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(is_reload_kind(&EventKind::Modify(ModifyKind::Name(
            RenameMode::To
        ))));
        assert!(!is_reload_kind(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_reload_kind(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Any
        ))));
    }

    #[test]
    fn touch_matches_either_half_of_a_pair() {
        let dir = tempfile::tempdir().unwrap();
        let left = dir.path().join("l.png");
        let right = dir.path().join("r.png");
        std::fs::write(&left, b"x").unwrap();
        std::fs::write(&right, b"x").unwrap();
        let source = WatchedSource::new(SourceRequest::Pair {
            left: left.clone(),
            right: right.clone(),
        });

        let mut touched = HashSet::new();
        touched.insert(canonical(&right));
        assert!(source.is_touched(&touched));

        let mut unrelated = HashSet::new();
        unrelated.insert(canonical(&dir.path().join("other.png")));
        assert!(!source.is_touched(&unrelated));
    }
}
