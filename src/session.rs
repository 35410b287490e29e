use std::fmt;
use std::time::{Duration, Instant};

use crate::error::Error;

/// Which presentation owns the screen right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationMode {
    /// No source loaded; nothing to show.
    Idle,
    /// Conventional windowed presentation, both eyes overlapped.
    Flat,
    /// Device-backed per-eye presentation.
    Immersive,
    /// Degraded split presentation after immersive output produced no frames.
    Fallback,
}

impl PresentationMode {
    /// Immersive and fallback both use the spatial per-eye placement.
    pub fn is_spatial(self) -> bool {
        matches!(self, PresentationMode::Immersive | PresentationMode::Fallback)
    }
}

/// User-facing messages the machine wants surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    SessionDenied(String),
    /// The immersive session rendered no frame inside the watchdog window.
    FrameTimeout,
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionNotice::SessionDenied(reason) => {
                write!(f, "immersive session request failed: {reason}")
            }
            SessionNotice::FrameTimeout => write!(
                f,
                "no frame rendered before the watchdog elapsed; continuing in fallback presentation"
            ),
        }
    }
}

/// Side effects the caller must perform, in order, after each transition.
/// The machine itself never touches the driver, the renderer or the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the driver for an immersive session.
    BeginSession,
    /// Tell the driver the session is over.
    EndSession,
    /// Bind the eye surfaces to the device output channels.
    BindEyeChannels,
    /// Re-run the auto-fit solver (the preference gate has already passed).
    AutoFit,
    /// Recompute sampling and placement before the next frame reads them.
    RefreshViews,
    /// Capture the window layout, then take the screen for fallback.
    EnterFallback,
    /// Restore the window layout captured at fallback entry.
    RestoreViewport,
    /// Both eye surfaces become visible to the normal viewport again.
    RestoreSharedLayers,
    /// Drop bindings owned by the mode being exited.
    ReleaseEyeBindings,
    Notify(SessionNotice),
}

/// Pure state machine over the presentation modes. Session entry is an
/// asynchronous negotiation: `request_enter` only starts it, and the
/// machine stays in its previous mode until the driver grants or denies,
/// so a half-entered state cannot exist.
pub struct SessionMachine {
    mode: PresentationMode,
    negotiating: bool,
    frame_seen: bool,
    watchdog_deadline: Option<Instant>,
    watchdog_timeout: Duration,
}

impl SessionMachine {
    pub fn new(watchdog_timeout: Duration) -> Self {
        Self {
            mode: PresentationMode::Idle,
            negotiating: false,
            frame_seen: false,
            watchdog_deadline: None,
            watchdog_timeout,
        }
    }

    pub fn mode(&self) -> PresentationMode {
        self.mode
    }

    pub fn negotiating(&self) -> bool {
        self.negotiating
    }

    /// Earliest instant `on_tick` could act, for callers that want to sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.watchdog_deadline
    }

    /// A source finished loading. Idle wakes to flat; an active immersive
    /// session gets fresh bindings for the new textures.
    pub fn on_source_ready(&mut self, auto_fit: bool) -> Vec<Effect> {
        if self.mode == PresentationMode::Idle {
            self.mode = PresentationMode::Flat;
        }
        let mut effects = Vec::new();
        if auto_fit {
            effects.push(Effect::AutoFit);
        }
        effects.push(Effect::RefreshViews);
        if self.mode == PresentationMode::Immersive {
            effects.push(Effect::BindEyeChannels);
        }
        effects
    }

    /// The source was cleared. Ends whatever presentation depended on it.
    pub fn on_source_cleared(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.mode {
            PresentationMode::Immersive => {
                effects.push(Effect::EndSession);
                effects.push(Effect::ReleaseEyeBindings);
                effects.push(Effect::RestoreSharedLayers);
            }
            PresentationMode::Fallback => effects.push(Effect::RestoreViewport),
            PresentationMode::Idle | PresentationMode::Flat => {}
        }
        self.negotiating = false;
        self.watchdog_deadline = None;
        self.mode = PresentationMode::Idle;
        effects.push(Effect::RefreshViews);
        effects
    }

    /// Starts immersive entry. Fails without touching any state when no
    /// source is loaded; a duplicate request while negotiating or already
    /// immersive is a no-op.
    pub fn request_enter(&mut self, source_ready: bool) -> Result<Vec<Effect>, Error> {
        if !source_ready {
            return Err(Error::InvalidSource("no stereo source loaded".into()));
        }
        if self.negotiating || self.mode == PresentationMode::Immersive {
            return Ok(Vec::new());
        }
        let mut effects = Vec::new();
        if self.mode == PresentationMode::Fallback {
            // Leave fallback before negotiating so a denial lands in flat.
            self.mode = PresentationMode::Flat;
            effects.push(Effect::RestoreViewport);
            effects.push(Effect::RefreshViews);
        }
        self.negotiating = true;
        effects.push(Effect::BeginSession);
        Ok(effects)
    }

    /// The driver granted the session. The watchdog starts counting from
    /// `now`; it stands down at the first rendered frame.
    pub fn on_granted(&mut self, now: Instant, auto_fit: bool) -> Vec<Effect> {
        if !self.negotiating {
            // Grant landed after the user gave up; hand the session back.
            return vec![Effect::EndSession];
        }
        self.negotiating = false;
        self.mode = PresentationMode::Immersive;
        self.frame_seen = false;
        self.watchdog_deadline = Some(now + self.watchdog_timeout);
        let mut effects = Vec::new();
        if auto_fit {
            effects.push(Effect::AutoFit);
        }
        effects.push(Effect::RefreshViews);
        effects.push(Effect::BindEyeChannels);
        effects
    }

    /// The driver denied the session; the previous mode stands.
    pub fn on_denied(&mut self, reason: &str) -> Vec<Effect> {
        if !self.negotiating {
            return Vec::new();
        }
        self.negotiating = false;
        vec![Effect::Notify(SessionNotice::SessionDenied(
            reason.to_string(),
        ))]
    }

    /// A frame reached the device; the watchdog stands down.
    pub fn on_frame_rendered(&mut self) {
        if self.mode == PresentationMode::Immersive {
            self.frame_seen = true;
            self.watchdog_deadline = None;
        }
    }

    /// Device-initiated session end, or the driver confirming one we asked
    /// for after the fact.
    pub fn on_session_ended(&mut self) -> Vec<Effect> {
        if self.mode != PresentationMode::Immersive {
            return Vec::new();
        }
        self.watchdog_deadline = None;
        self.mode = PresentationMode::Flat;
        vec![
            Effect::ReleaseEyeBindings,
            Effect::RestoreSharedLayers,
            Effect::RefreshViews,
        ]
    }

    /// Explicit user exit from whichever presentation is active.
    pub fn request_exit(&mut self) -> Vec<Effect> {
        if self.negotiating {
            // The grant, if it still lands, is handed back in on_granted.
            self.negotiating = false;
            return Vec::new();
        }
        match self.mode {
            PresentationMode::Immersive => {
                self.watchdog_deadline = None;
                self.mode = PresentationMode::Flat;
                vec![
                    Effect::EndSession,
                    Effect::ReleaseEyeBindings,
                    Effect::RestoreSharedLayers,
                    Effect::RefreshViews,
                ]
            }
            PresentationMode::Fallback => {
                self.mode = PresentationMode::Flat;
                vec![Effect::RestoreViewport, Effect::RefreshViews]
            }
            PresentationMode::Idle | PresentationMode::Flat => Vec::new(),
        }
    }

    /// Watchdog check; call with a current timestamp at least once per frame.
    /// Firing ends the dead session and demotes to fallback rather than idle,
    /// so the user is not left with a blank screen.
    pub fn on_tick(&mut self, now: Instant) -> Vec<Effect> {
        let Some(deadline) = self.watchdog_deadline else {
            return Vec::new();
        };
        if self.mode != PresentationMode::Immersive || self.frame_seen || now < deadline {
            return Vec::new();
        }
        self.watchdog_deadline = None;
        self.mode = PresentationMode::Fallback;
        vec![
            Effect::EndSession,
            Effect::ReleaseEyeBindings,
            Effect::EnterFallback,
            Effect::RefreshViews,
            Effect::Notify(SessionNotice::FrameTimeout),
        ]
    }
}
