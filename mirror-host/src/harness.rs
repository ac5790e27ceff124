//! Headless host harness.
//!
//! Plays every part the emulator would: a synthetic renderer feeding the
//! present mailbox, a scripted remote pad on a loopback display, and an
//! input layer sampling the remote devices. The [`StreamController`]
//! in the middle is the real one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use mirror_core::input::{
    AnalogDevice, ButtonDevice, DeviceFactory, RemoteAnalogFactory, RemoteButtonFactory,
    RemoteTouchFactory, TouchDevice,
};
use mirror_core::stream::{FenceId, Frame, Surface, SurfaceId, SurfaceStore};
use mirror_core::{
    Buttons, CaptureStatsSnapshot, ControllerState, InputDecoder, LatestFrameMailbox,
    LoopbackLink, MirrorError, NativeAnalog, NativeButton, SoftwareGpu, StreamController,
};

use crate::config::HostConfig;

/// Render targets the synthetic renderer alternates between.
const SURFACES: [SurfaceId; 2] = [SurfaceId(1), SurfaceId(2)];

// ── SyntheticRenderer ────────────────────────────────────────────

/// Stands in for the emulator's present thread.
///
/// Each tick paints a solid colour into the next render target and
/// submits it. A reload request from the capture side recreates the
/// targets at the requested size.
pub struct SyntheticRenderer {
    store: SurfaceStore,
    mailbox: Arc<LatestFrameMailbox>,
    width: u32,
    height: u32,
    next_id: u64,
    reloaded: bool,
    presented: u64,
}

impl SyntheticRenderer {
    pub fn new(store: SurfaceStore, mailbox: Arc<LatestFrameMailbox>, width: u32, height: u32) -> Self {
        Self {
            store,
            mailbox,
            width,
            height,
            next_id: 0,
            // The first frame always announces fresh targets.
            reloaded: true,
            presented: 0,
        }
    }

    /// Render and submit one frame.
    pub fn tick(&mut self) {
        if let Some((width, height)) = self.mailbox.take_reload_request() {
            if (width, height) != (self.width, self.height) {
                debug!("renderer resizing to {width}x{height}");
                self.width = width;
                self.height = height;
                self.reloaded = true;
            }
        }
        self.collect_presented();

        let id = self.next_id;
        self.next_id += 1;
        let surface = SURFACES[(id % 2) as usize];
        self.store
            .insert(surface, Surface::solid(self.width, self.height, frame_colour(id)));

        self.mailbox.submit(Frame {
            id,
            surface,
            width: self.width,
            height: self.height,
            color_reloaded: std::mem::take(&mut self.reloaded),
            // The software GPU treats every fence as signaled.
            render_fence: FenceId(id),
        });
    }

    /// Take back the frames the capture side is done with.
    pub fn collect_presented(&mut self) {
        self.presented += self.mailbox.take_presented().len() as u64;
    }

    pub fn frames_rendered(&self) -> u64 {
        self.next_id
    }

    /// Frames the capture side handed back.
    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// BGRA colour for frame `id`, cycling slowly through the blue channel.
fn frame_colour(id: u64) -> [u8; 4] {
    [(id % 256) as u8, 0x40, 0x80, 0xff]
}

// ── Scripted remote pad ──────────────────────────────────────────

/// The pad the loopback display reports at sample `tick`.
///
/// A is held for half a second out of every second, the circle pad
/// turns slowly, and a touch sweeps across the screen.
pub fn scripted_state(tick: u64) -> ControllerState {
    let buttons = if (tick / 30) % 2 == 0 {
        Buttons::A
    } else {
        Buttons::empty()
    };
    let angle = (tick % 360) as f32 * std::f32::consts::PI / 180.0;
    let stick = |v: f32| (127.0 + v * 127.0).round().clamp(0.0, 255.0) as u8;

    ControllerState {
        buttons,
        l_stick_x: stick(angle.cos()),
        l_stick_y: stick(angle.sin()),
        touch_x: (tick % 256) as u8,
        touch_y: 128,
        touch_down: tick % 120 < 60,
        ..ControllerState::default()
    }
}

// ── Input sampling ───────────────────────────────────────────────

/// The host input layer: one device per mapped native control.
struct InputPanel {
    buttons: Vec<(NativeButton, Box<dyn ButtonDevice>)>,
    circle_pad: Box<dyn AnalogDevice>,
    touch: Box<dyn TouchDevice>,
    last_pressed: Vec<&'static str>,
}

impl InputPanel {
    fn new(decoder: &Arc<InputDecoder>) -> Self {
        let button_factory = RemoteButtonFactory::new(Arc::clone(decoder));
        let buttons = NativeButton::ALL
            .iter()
            .filter(|b| b.mapping().is_some())
            .map(|&b| (b, button_factory.create(&RemoteButtonFactory::button_mapping(b))))
            .collect();
        let circle_pad = RemoteAnalogFactory::new(Arc::clone(decoder))
            .create(&RemoteAnalogFactory::analog_mapping(NativeAnalog::CirclePad));
        let touch = RemoteTouchFactory::new(Arc::clone(decoder))
            .create(&RemoteTouchFactory::touch_mapping());

        Self {
            buttons,
            circle_pad,
            touch,
            last_pressed: Vec::new(),
        }
    }

    /// Sample every device, logging button changes.
    fn sample(&mut self) {
        let pressed: Vec<&'static str> = self
            .buttons
            .iter()
            .filter(|(_, device)| device.status())
            .map(|(b, _)| b.name())
            .collect();
        if pressed != self.last_pressed {
            let (x, y) = self.circle_pad.status();
            let touch = self.touch.status();
            debug!(
                "input: buttons {pressed:?} circle pad ({x:.2}, {y:.2}) touch {:?}",
                touch.pressed.then_some((touch.x, touch.y))
            );
            self.last_pressed = pressed;
        }
    }
}

// ── Harness ──────────────────────────────────────────────────────

/// Summary of one harness run.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarnessReport {
    pub stats: CaptureStatsSnapshot,
    pub frames_rendered: u64,
    pub frames_presented: u64,
    pub frames_dropped: u64,
    pub bytes_sent: u64,
}

/// Run the pipeline until `shutdown` resolves.
pub async fn run(
    config: &HostConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<HarnessReport, MirrorError> {
    let store = SurfaceStore::default();
    let gpu = SoftwareGpu::new(store.clone()).untraced();
    let link = Arc::new(LoopbackLink::new(config.harness.width, config.harness.height));
    let mailbox = Arc::new(LatestFrameMailbox::new());
    let stream_config = config.to_stream_config();

    let decoder = Arc::new(InputDecoder::with_interval(
        link.clone(),
        stream_config.poll_interval,
    ));
    let mut controller =
        StreamController::with_config(gpu, link.clone(), mailbox.clone(), stream_config);
    {
        let decoder = Arc::clone(&decoder);
        controller.on_connected(move |layout| {
            decoder.set_viewport_coverage(layout.horizontal_coverage());
            info!(
                "input devices reloaded for {}x{} (viewport {}x{})",
                layout.width,
                layout.height,
                layout.screen.width(),
                layout.screen.height()
            );
        });
    }
    controller.start_forwarding()?;

    let mut renderer = SyntheticRenderer::new(
        store,
        Arc::clone(&mailbox),
        config.harness.width,
        config.harness.height,
    );
    let mut panel = InputPanel::new(&decoder);

    let mut render_tick = tokio::time::interval(config.frame_interval());
    let mut input_tick = tokio::time::interval(Duration::from_millis(
        config.input.sample_interval_ms.max(1),
    ));
    let mut stats_tick = tokio::time::interval(Duration::from_secs(
        config.harness.stats_interval_secs.max(1),
    ));
    let connect = tokio::time::sleep(Duration::from_millis(config.harness.connect_delay_ms));
    tokio::pin!(connect);
    tokio::pin!(shutdown);

    let mut connected = false;
    let mut pad_tick = 0u64;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = &mut connect, if !connected => {
                info!("loopback display connecting");
                link.set_connected(true);
                connected = true;
            }
            _ = render_tick.tick() => renderer.tick(),
            _ = input_tick.tick() => {
                link.set_state(scripted_state(pad_tick));
                pad_tick += 1;
                panel.sample();
            }
            _ = stats_tick.tick() => {
                let stats = controller.stats();
                info!(
                    "phase {} | captured {} sent {} skipped {} send failures {} | rendered {} dropped {}",
                    controller.phase(),
                    stats.frames_captured,
                    stats.frames_sent,
                    stats.skipped,
                    stats.send_failures,
                    renderer.frames_rendered(),
                    mailbox.dropped(),
                );
            }
        }
    }

    info!("stopping frame forwarding");
    let (stats, joined) = tokio::task::spawn_blocking(move || {
        controller.stop_forwarding();
        let joined = controller.join();
        (controller.stats(), joined)
    })
    .await
    .map_err(|e| MirrorError::Other(format!("capture shutdown task failed: {e}")))?;
    if let Err(e) = &joined {
        warn!("capture worker: {e}");
    }
    joined?;

    renderer.collect_presented();
    Ok(HarnessReport {
        stats,
        frames_rendered: renderer.frames_rendered(),
        frames_presented: renderer.frames_presented(),
        frames_dropped: mailbox.dropped(),
        bytes_sent: link.bytes_sent(),
    })
}

// ── Tests ────────────────────────────────────────────────────────
