use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Fullscreen, Window, WindowAttributes},
};

use crate::{
    config::{Configuration, ControlSteps},
    events::{
        DecodedImage, DecodedSource, ImmersiveEvent, ImmersiveRequest, LoadRequest, SourceEvent,
    },
    render::eyes::{EyeRenderer, Projection, RenderPlan},
    session::{Effect, PresentationMode, SessionMachine},
    source::{ImageHandle, ImageInfo, SourceRequest, StereoSource},
    state::{ControlCommand, ViewerState},
    stereo::autofit::spatial_zoom,
    stereo::placement::{self, LayoutParameters},
};

#[derive(Debug)]
enum ViewerEvent {
    Cancelled,
}

type SourceReceiver = mpsc::Receiver<SourceEvent>;
type LoadSender = mpsc::Sender<LoadRequest>;
type DriverSender = mpsc::Sender<ImmersiveRequest>;
type DriverReceiver = mpsc::Receiver<ImmersiveEvent>;

/// Window layout captured when fallback takes the screen.
struct FallbackRestore {
    fullscreen: Option<Fullscreen>,
    cursor_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyAction {
    Control(ControlCommand),
    FitNow,
    EnterImmersive,
    ExitSpatialOrQuit,
    ClearSource,
    Reload,
    NextSource,
    ToggleFullscreen,
    Quit,
}

/// Keyboard map. Arrows pan in flat presentation and move the vertical
/// offsets in spatial presentation (shift selects the differential).
fn action_for_key(
    code: KeyCode,
    shift: bool,
    spatial: bool,
    steps: &ControlSteps,
) -> Option<KeyAction> {
    use ControlCommand::*;
    let action = match code {
        KeyCode::Equal | KeyCode::NumpadAdd => KeyAction::Control(ZoomBy(steps.zoom)),
        KeyCode::Minus | KeyCode::NumpadSubtract => KeyAction::Control(ZoomBy(-steps.zoom)),
        KeyCode::BracketRight => KeyAction::Control(SeparationBy(steps.separation)),
        KeyCode::BracketLeft => KeyAction::Control(SeparationBy(-steps.separation)),
        KeyCode::ArrowUp | KeyCode::ArrowDown => {
            let sign = if code == KeyCode::ArrowUp { 1.0 } else { -1.0 };
            if spatial && shift {
                KeyAction::Control(DifferentialOffsetBy(sign * steps.vertical_offset))
            } else if spatial {
                KeyAction::Control(CommonOffsetBy(sign * steps.vertical_offset))
            } else {
                KeyAction::Control(PanBy {
                    dx: 0.0,
                    dy: -sign * steps.pan_px,
                })
            }
        }
        KeyCode::ArrowLeft => {
            if spatial {
                return None;
            }
            KeyAction::Control(PanBy {
                dx: -steps.pan_px,
                dy: 0.0,
            })
        }
        KeyCode::ArrowRight => {
            if spatial {
                return None;
            }
            KeyAction::Control(PanBy {
                dx: steps.pan_px,
                dy: 0.0,
            })
        }
        KeyCode::KeyS => KeyAction::Control(ToggleSwapEyes),
        KeyCode::KeyH => KeyAction::Control(ToggleFlipHorizontal),
        KeyCode::KeyV => KeyAction::Control(ToggleFlipVertical),
        KeyCode::KeyF => KeyAction::Control(ToggleAutoFit),
        KeyCode::KeyA => KeyAction::FitNow,
        KeyCode::Digit0 | KeyCode::Numpad0 => KeyAction::Control(ResetAdjustments),
        KeyCode::Enter | KeyCode::NumpadEnter => KeyAction::EnterImmersive,
        KeyCode::Escape => KeyAction::ExitSpatialOrQuit,
        KeyCode::Backspace | KeyCode::Delete => KeyAction::ClearSource,
        KeyCode::KeyR => KeyAction::Reload,
        KeyCode::Tab => KeyAction::NextSource,
        KeyCode::F11 => KeyAction::ToggleFullscreen,
        KeyCode::KeyQ => KeyAction::Quit,
        _ => return None,
    };
    Some(action)
}

// Held keys keep nudging; everything else fires once per press.
fn allows_repeat(action: &KeyAction) -> bool {
    matches!(
        action,
        KeyAction::Control(
            ControlCommand::ZoomBy(_)
                | ControlCommand::SeparationBy(_)
                | ControlCommand::CommonOffsetBy(_)
                | ControlCommand::DifferentialOffsetBy(_)
                | ControlCommand::PanBy { .. }
        )
    )
}

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    eyes: Option<EyeRenderer>,

    state: ViewerState,
    machine: SessionMachine,
    requests: Vec<SourceRequest>,
    active_request: usize,
    next_handle: u64,
    modifiers: ModifiersState,
    fallback_restore: Option<FallbackRestore>,

    from_loader: SourceReceiver,
    to_loader: LoadSender,
    to_driver: DriverSender,
    from_driver: DriverReceiver,
}

impl ViewerApp {
    #[allow(clippy::too_many_arguments)]
    fn new(
        cfg: Configuration,
        requests: Vec<SourceRequest>,
        cancel: CancellationToken,
        from_loader: SourceReceiver,
        to_loader: LoadSender,
        to_driver: DriverSender,
        from_driver: DriverReceiver,
    ) -> Self {
        let state = ViewerState::new(cfg.viewing.initial_layout(), cfg.auto_fit);
        let machine = SessionMachine::new(cfg.watchdog_timeout);
        Self {
            cfg,
            cancel,
            window: None,
            surface: None,
            surface_config: None,
            device: None,
            queue: None,
            eyes: None,
            state,
            machine,
            requests,
            active_request: 0,
            next_handle: 0,
            modifiers: ModifiersState::default(),
            fallback_restore: None,
            from_loader,
            to_loader,
            to_driver,
            from_driver,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let attrs = WindowAttributes::default().with_title(self.cfg.window.title.clone());
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                if self.cfg.window.fullscreen {
                    window.set_fullscreen(Some(Fullscreen::Borderless(window.current_monitor())));
                }
                if self.cfg.window.hide_cursor {
                    window.set_cursor_visible(false);
                }
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .unwrap_or(caps.formats[0]);

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("viewer-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        let eyes = EyeRenderer::new(&device, format);

        self.surface = Some(surface);
        self.surface_config = Some(config);
        self.device = Some(device);
        self.queue = Some(queue);
        self.eyes = Some(eyes);

        Ok(())
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let surface = match self.surface.as_ref() {
            Some(surface) => surface,
            None => return,
        };
        let device = match self.device.as_ref() {
            Some(device) => device,
            None => return,
        };
        let config = match self.surface_config.as_mut() {
            Some(config) => config,
            None => return,
        };

        config.width = new_size.width.max(1);
        config.height = new_size.height.max(1);
        surface.configure(device, config);
        debug!(
            width = config.width,
            height = config.height,
            "viewer surface resized",
        );
    }

    /// What this frame shows, derived from the presentation mode. Immersive
    /// and fallback share the split preview; the device output, when one
    /// exists, is the driver's business.
    fn current_plan(&self) -> Option<RenderPlan> {
        let eye_aspect = self.state.eye_aspect()?;
        let viewing = &self.cfg.viewing;
        match self.machine.mode() {
            PresentationMode::Idle => None,
            PresentationMode::Flat => Some(RenderPlan::Flat {
                placement: placement::place_flat(&self.state.layout),
                eye_aspect,
            }),
            PresentationMode::Immersive | PresentationMode::Fallback => {
                let placements = placement::place_spatial(
                    &self.state.layout,
                    eye_aspect,
                    viewing.distance,
                    viewing.separation_floor_ratio,
                );
                // Slot centers track the current zoom at the configured
                // separation, so only the user's separation delta reads as
                // convergence.
                let slot_layout = LayoutParameters {
                    separation: viewing.separation,
                    ..self.state.layout
                };
                let eye_center_x = placement::effective_separation(
                    &slot_layout,
                    viewing.separation_floor_ratio,
                ) * 0.5;
                Some(RenderPlan::Split {
                    placements,
                    projection: Projection {
                        viewing_distance: viewing.distance,
                        fov_y_radians: viewing.field_of_view_radians(),
                        eye_center_x,
                    },
                })
            }
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let plan = self.current_plan();
        let Some(window) = self.window.clone() else {
            return;
        };
        let surface = match self.surface.as_ref() {
            Some(surface) => surface,
            None => return,
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                self.handle_resize(window.inner_size());
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                self.handle_resize(window.inner_size());
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        if let (Some(eyes), Some(device), Some(queue), Some(config)) = (
            self.eyes.as_mut(),
            self.device.as_ref(),
            self.queue.as_ref(),
            self.surface_config.as_ref(),
        ) {
            eyes.render(device, queue, &view, config.width, config.height, plan);
        }
        frame.present();
    }

    fn refresh_views(&mut self) {
        let Some(eyes) = self.eyes.as_mut() else {
            return;
        };
        let Some(device) = self.device.as_ref() else {
            return;
        };
        match self.state.views(self.cfg.viewing.guard_margin) {
            Some(views) => eyes.set_views(device, &views),
            None => eyes.release_eye_bindings(),
        }
    }

    fn install_source(&mut self, decoded: DecodedSource) {
        let Some(eyes) = self.eyes.as_mut() else {
            return;
        };
        let (Some(device), Some(queue)) = (self.device.as_ref(), self.queue.as_ref()) else {
            return;
        };

        let mut next = self.next_handle;
        let mut upload = |image: DecodedImage| -> ImageInfo {
            next += 1;
            let handle = ImageHandle(next);
            eyes.upload_image(device, queue, handle, image.width, image.height, &image.pixels);
            ImageInfo {
                handle,
                width: image.width,
                height: image.height,
            }
        };
        let source = match decoded {
            DecodedSource::Composite(image) => StereoSource::Composite {
                image: upload(image),
            },
            DecodedSource::Pair { left, right } => StereoSource::Pair {
                left: upload(left),
                right: upload(right),
            },
        };
        self.next_handle = next;

        if let Some(displaced) = self.state.set_source(source) {
            self.release_source(displaced);
        }
        let effects = self.machine.on_source_ready(self.state.auto_fit);
        self.run_effects(effects);
    }

    fn release_source(&mut self, source: StereoSource) {
        if let Some(eyes) = self.eyes.as_mut() {
            for handle in source.handles() {
                eyes.release_image(handle);
            }
        }
    }

    fn request_active_source(&mut self) {
        if let Some(request) = self.requests.get(self.active_request) {
            info!(source = %request.describe(), "requesting load");
            if self
                .to_loader
                .try_send(LoadRequest(request.clone()))
                .is_err()
            {
                warn!("loader is busy; request dropped");
            }
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::BeginSession => {
                    if let Err(err) = self.to_driver.try_send(ImmersiveRequest::Begin) {
                        warn!(error = %err, "immersive driver unreachable");
                        let follow_up = self.machine.on_denied("immersive driver unavailable");
                        self.run_effects(follow_up);
                    }
                }
                Effect::EndSession => {
                    let _ = self.to_driver.try_send(ImmersiveRequest::End);
                }
                Effect::BindEyeChannels => {
                    if let Some(eyes) = self.eyes.as_ref() {
                        let (left, right) = eyes.surface_ids();
                        let _ = self
                            .to_driver
                            .try_send(ImmersiveRequest::BindEyes { left, right });
                    }
                }
                Effect::AutoFit => {
                    let viewing = &self.cfg.viewing;
                    let zoom = spatial_zoom(
                        viewing.distance,
                        viewing.field_of_view_radians(),
                        viewing.fill_fraction,
                    );
                    self.state.apply(ControlCommand::SetZoom(zoom));
                    debug!(zoom, "auto-fit applied");
                }
                Effect::RefreshViews => self.refresh_views(),
                Effect::EnterFallback => self.enter_fallback(),
                Effect::RestoreViewport => self.restore_viewport(),
                // Shared layers come back with the flat plan next frame.
                Effect::RestoreSharedLayers => {}
                Effect::ReleaseEyeBindings => {
                    if let Some(eyes) = self.eyes.as_mut() {
                        eyes.release_eye_bindings();
                    }
                }
                Effect::Notify(notice) => warn!("{notice}"),
            }
        }
    }

    // Spatial presentations re-fit on resize so the surfaces keep filling
    // the field; a manual zoom in between is overwritten, latest write wins.
    fn refit_after_resize(&mut self) {
        if self.machine.mode().is_spatial() && self.state.auto_fit {
            self.run_effects(vec![Effect::AutoFit]);
        }
    }

    fn enter_fallback(&mut self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if self.fallback_restore.is_none() {
            self.fallback_restore = Some(FallbackRestore {
                fullscreen: window.fullscreen(),
                cursor_visible: !self.cfg.window.hide_cursor,
            });
        }
        window.set_fullscreen(Some(Fullscreen::Borderless(window.current_monitor())));
        window.set_cursor_visible(false);
        info!("fallback presentation took the screen");
    }

    fn restore_viewport(&mut self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if let Some(saved) = self.fallback_restore.take() {
            window.set_fullscreen(saved.fullscreen);
            window.set_cursor_visible(saved.cursor_visible);
            info!("window layout restored");
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode, repeat: bool) {
        let shift = self.modifiers.shift_key();
        let spatial = self.machine.mode().is_spatial();
        let Some(action) = action_for_key(code, shift, spatial, &self.cfg.controls) else {
            return;
        };
        if repeat && !allows_repeat(&action) {
            return;
        }

        match action {
            KeyAction::Control(cmd) => {
                if self.state.apply(cmd) {
                    self.refresh_views();
                }
            }
            KeyAction::FitNow => self.run_effects(vec![Effect::AutoFit]),
            KeyAction::EnterImmersive => {
                match self.machine.request_enter(self.state.source.is_some()) {
                    Ok(effects) => self.run_effects(effects),
                    Err(err) => warn!("{err}"),
                }
            }
            KeyAction::ExitSpatialOrQuit => {
                if self.machine.mode().is_spatial() || self.machine.negotiating() {
                    let effects = self.machine.request_exit();
                    self.run_effects(effects);
                } else {
                    info!("escape pressed; exiting");
                    event_loop.exit();
                }
            }
            KeyAction::ClearSource => {
                if let Some(displaced) = self.state.clear_source() {
                    self.release_source(displaced);
                }
                let effects = self.machine.on_source_cleared();
                self.run_effects(effects);
            }
            KeyAction::Reload => self.request_active_source(),
            KeyAction::NextSource => {
                if !self.requests.is_empty() {
                    self.active_request = (self.active_request + 1) % self.requests.len();
                    self.request_active_source();
                }
            }
            KeyAction::ToggleFullscreen => {
                // Fallback owns the window layout until it exits.
                if self.fallback_restore.is_none() {
                    if let Some(window) = self.window.as_ref() {
                        let fullscreen = window
                            .fullscreen()
                            .is_none()
                            .then(|| Fullscreen::Borderless(window.current_monitor()));
                        window.set_fullscreen(fullscreen);
                    }
                }
            }
            KeyAction::Quit => {
                info!("quit requested");
                event_loop.exit();
            }
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.device.is_none() {
            if let Err(err) = self.init_gpu(window) {
                error!(error = ?err, "failed to initialize GPU state");
                event_loop.exit();
                return;
            }
        }

        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
                self.refit_after_resize();
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
                self.refit_after_resize();
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        self.handle_key(event_loop, code, event.repeat);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Channels are only drained once the GPU exists; the loader blocks
        // on its bounded channel until then.
        if self.device.is_some() {
            while let Ok(event) = self.from_loader.try_recv() {
                match event {
                    SourceEvent::Loaded { request, source } => {
                        if let Some(index) = self.requests.iter().position(|r| *r == request) {
                            self.active_request = index;
                        }
                        info!(source = %request.describe(), "source ready");
                        self.install_source(source);
                    }
                    SourceEvent::Failed { path, reason } => {
                        warn!(
                            path = %path.display(),
                            reason = %reason,
                            "load failed; keeping the current source"
                        );
                    }
                }
            }

            while let Ok(event) = self.from_driver.try_recv() {
                let effects = match event {
                    ImmersiveEvent::Granted => {
                        self.machine.on_granted(Instant::now(), self.state.auto_fit)
                    }
                    ImmersiveEvent::Denied(reason) => self.machine.on_denied(&reason),
                    ImmersiveEvent::FramePresented => {
                        self.machine.on_frame_rendered();
                        Vec::new()
                    }
                    ImmersiveEvent::Ended => self.machine.on_session_ended(),
                };
                self.run_effects(effects);
            }

            let effects = self.machine.on_tick(Instant::now());
            self.run_effects(effects);
        }

        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run_windowed(
    cfg: Configuration,
    requests: Vec<SourceRequest>,
    from_loader: SourceReceiver,
    to_loader: LoadSender,
    to_driver: DriverSender,
    from_driver: DriverReceiver,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = ViewerApp::new(
        cfg,
        requests,
        cancel,
        from_loader,
        to_loader,
        to_driver,
        from_driver,
    );
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("viewer event loop failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps() -> ControlSteps {
        ControlSteps::default()
    }

    #[test]
    fn zoom_keys_use_the_configured_step() {
        let steps = steps();
        assert_eq!(
            action_for_key(KeyCode::Equal, false, false, &steps),
            Some(KeyAction::Control(ControlCommand::ZoomBy(steps.zoom)))
        );
        assert_eq!(
            action_for_key(KeyCode::Minus, false, true, &steps),
            Some(KeyAction::Control(ControlCommand::ZoomBy(-steps.zoom)))
        );
    }

    #[test]
    fn arrows_pan_flat_and_offset_spatial() {
        let steps = steps();
        assert_eq!(
            action_for_key(KeyCode::ArrowUp, false, false, &steps),
            Some(KeyAction::Control(ControlCommand::PanBy {
                dx: 0.0,
                dy: -steps.pan_px,
            }))
        );
        assert_eq!(
            action_for_key(KeyCode::ArrowUp, false, true, &steps),
            Some(KeyAction::Control(ControlCommand::CommonOffsetBy(
                steps.vertical_offset
            )))
        );
        assert_eq!(
            action_for_key(KeyCode::ArrowDown, true, true, &steps),
            Some(KeyAction::Control(ControlCommand::DifferentialOffsetBy(
                -steps.vertical_offset
            )))
        );
    }

    #[test]
    fn horizontal_arrows_only_pan_in_flat() {
        let steps = steps();
        assert_eq!(
            action_for_key(KeyCode::ArrowLeft, false, true, &steps),
            None
        );
        assert_eq!(
            action_for_key(KeyCode::ArrowRight, false, false, &steps),
            Some(KeyAction::Control(ControlCommand::PanBy {
                dx: steps.pan_px,
                dy: 0.0,
            }))
        );
    }

    #[test]
    fn toggles_fire_once_per_press() {
        assert!(!allows_repeat(&KeyAction::Control(
            ControlCommand::ToggleSwapEyes
        )));
        assert!(!allows_repeat(&KeyAction::EnterImmersive));
        assert!(allows_repeat(&KeyAction::Control(ControlCommand::ZoomBy(
            0.05
        ))));
        assert!(allows_repeat(&KeyAction::Control(ControlCommand::PanBy {
            dx: 1.0,
            dy: 0.0,
        })));
    }
}
