use std::time::{Duration, Instant};

use stereo_viewer::session::{Effect, PresentationMode, SessionMachine, SessionNotice};

const TIMEOUT: Duration = Duration::from_millis(1200);

#[test]
fn cold_start_to_immersive_and_back() {
    let mut machine = SessionMachine::new(TIMEOUT);
    assert_eq!(machine.mode(), PresentationMode::Idle);

    // First source wakes the viewer into flat and fits it.
    let effects = machine.on_source_ready(true);
    assert_eq!(machine.mode(), PresentationMode::Flat);
    assert_eq!(effects, vec![Effect::AutoFit, Effect::RefreshViews]);

    // Entry is a negotiation; the mode holds until the driver answers.
    let effects = machine.request_enter(true).unwrap();
    assert_eq!(effects, vec![Effect::BeginSession]);
    assert!(machine.negotiating());
    assert_eq!(machine.mode(), PresentationMode::Flat);

    let t0 = Instant::now();
    let effects = machine.on_granted(t0, true);
    assert_eq!(machine.mode(), PresentationMode::Immersive);
    assert!(!machine.negotiating());
    assert_eq!(
        effects,
        vec![Effect::AutoFit, Effect::RefreshViews, Effect::BindEyeChannels]
    );
    assert_eq!(machine.next_deadline(), Some(t0 + TIMEOUT));

    machine.on_frame_rendered();
    assert_eq!(machine.next_deadline(), None);

    let effects = machine.request_exit();
    assert_eq!(machine.mode(), PresentationMode::Flat);
    assert_eq!(
        effects,
        vec![
            Effect::EndSession,
            Effect::ReleaseEyeBindings,
            Effect::RestoreSharedLayers,
            Effect::RefreshViews,
        ]
    );
}

#[test]
fn frameless_session_falls_back_then_recovers() {
    let mut machine = SessionMachine::new(TIMEOUT);
    machine.on_source_ready(false);
    machine.request_enter(true).unwrap();
    let t0 = Instant::now();
    machine.on_granted(t0, false);

    // One tick short of the deadline changes nothing.
    assert!(machine.on_tick(t0 + TIMEOUT - Duration::from_millis(1)).is_empty());
    assert_eq!(machine.mode(), PresentationMode::Immersive);

    // At the deadline the dead session is ended and the screen is kept
    // occupied by the fallback split, never blanked to idle.
    let effects = machine.on_tick(t0 + TIMEOUT);
    assert_eq!(machine.mode(), PresentationMode::Fallback);
    assert_eq!(
        effects,
        vec![
            Effect::EndSession,
            Effect::ReleaseEyeBindings,
            Effect::EnterFallback,
            Effect::RefreshViews,
            Effect::Notify(SessionNotice::FrameTimeout),
        ]
    );

    // The watchdog is one-shot; later ticks stay quiet.
    assert!(machine.on_tick(t0 + TIMEOUT * 2).is_empty());
    assert_eq!(machine.mode(), PresentationMode::Fallback);

    // Retrying leaves fallback before negotiating, so a second denial or
    // grant starts from a clean flat viewport.
    let effects = machine.request_enter(true).unwrap();
    assert_eq!(machine.mode(), PresentationMode::Flat);
    assert!(machine.negotiating());
    assert_eq!(
        effects,
        vec![
            Effect::RestoreViewport,
            Effect::RefreshViews,
            Effect::BeginSession,
        ]
    );

    let t1 = Instant::now();
    machine.on_granted(t1, false);
    assert_eq!(machine.mode(), PresentationMode::Immersive);
    machine.on_frame_rendered();
    // A healthy session never trips the watchdog.
    assert!(machine.on_tick(t1 + TIMEOUT * 4).is_empty());
    assert_eq!(machine.mode(), PresentationMode::Immersive);
}

#[test]
fn negotiation_abandoned_then_granted_late() {
    let mut machine = SessionMachine::new(TIMEOUT);
    machine.on_source_ready(false);
    machine.request_enter(true).unwrap();

    // The user gives up while the driver is still thinking.
    assert!(machine.request_exit().is_empty());
    assert!(!machine.negotiating());
    assert_eq!(machine.mode(), PresentationMode::Flat);

    // The grant still lands; it is handed straight back and the mode holds.
    let effects = machine.on_granted(Instant::now(), true);
    assert_eq!(effects, vec![Effect::EndSession]);
    assert_eq!(machine.mode(), PresentationMode::Flat);
    assert_eq!(machine.next_deadline(), None);
}

#[test]
fn source_lifecycle_drives_presentation() {
    let mut machine = SessionMachine::new(TIMEOUT);

    // Entering with nothing loaded is refused without state changes.
    assert!(machine.request_enter(false).is_err());
    assert_eq!(machine.mode(), PresentationMode::Idle);
    assert!(!machine.negotiating());

    machine.on_source_ready(false);
    assert_eq!(machine.mode(), PresentationMode::Flat);

    // Clearing drops back to idle; flat needs no teardown.
    assert_eq!(machine.on_source_cleared(), vec![Effect::RefreshViews]);
    assert_eq!(machine.mode(), PresentationMode::Idle);

    // Reload, enter, and swap sources inside the live session.
    machine.on_source_ready(false);
    machine.request_enter(true).unwrap();
    machine.on_granted(Instant::now(), false);
    let effects = machine.on_source_ready(false);
    assert_eq!(machine.mode(), PresentationMode::Immersive);
    assert_eq!(effects, vec![Effect::RefreshViews, Effect::BindEyeChannels]);

    // Clearing inside the session tears the whole thing down.
    let effects = machine.on_source_cleared();
    assert_eq!(machine.mode(), PresentationMode::Idle);
    assert_eq!(
        effects,
        vec![
            Effect::EndSession,
            Effect::ReleaseEyeBindings,
            Effect::RestoreSharedLayers,
            Effect::RefreshViews,
        ]
    );
}

#[test]
fn notices_read_like_user_messages() {
    let denied = SessionNotice::SessionDenied("no runtime".into());
    assert_eq!(
        denied.to_string(),
        "immersive session request failed: no runtime"
    );
    assert_eq!(
        SessionNotice::FrameTimeout.to_string(),
        "no frame rendered before the watchdog elapsed; continuing in fallback presentation"
    );
}
