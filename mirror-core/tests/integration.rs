//! Integration tests: controller lifecycle, readback ordering and the
//! input relay, with a producer thread feeding a real capture thread.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use mirror_core::input::{
    ButtonDevice, DeviceFactory, RemoteButtonFactory, RemoteTouchFactory, TouchDevice,
};
use mirror_core::stream::{
    BufferId, FenceId, Frame, GpuEvent, GpuTrace, Surface, SurfaceId, SurfaceStore,
};
use mirror_core::{
    Buttons, ControllerState, InputDecoder, LatestFrameMailbox, LoopbackLink, NativeAnalog,
    NativeButton, SoftwareGpu, StreamConfig, StreamController, StreamPhase,
};

// ── Helpers ──────────────────────────────────────────────────────

const WIDTH: u32 = 8;
const HEIGHT: u32 = 6;

struct Rig {
    link: Arc<LoopbackLink>,
    mailbox: Arc<LatestFrameMailbox>,
    trace: GpuTrace,
    controller: StreamController<SoftwareGpu>,
}

fn rig(config: StreamConfig) -> Rig {
    let store = SurfaceStore::default();
    store.insert(SurfaceId(1), Surface::solid(WIDTH, HEIGHT, [1, 2, 3, 255]));
    let gpu = SoftwareGpu::new(store);
    let trace = gpu.trace();

    let link = Arc::new(LoopbackLink::new(WIDTH, HEIGHT));
    let mailbox = Arc::new(LatestFrameMailbox::new());
    let controller = StreamController::with_config(gpu, link.clone(), mailbox.clone(), config);
    Rig {
        link,
        mailbox,
        trace,
        controller,
    }
}

fn fast_config() -> StreamConfig {
    StreamConfig {
        mailbox_timeout: Duration::from_millis(10),
        ..StreamConfig::default()
    }
}

fn frame(id: u64) -> Frame {
    Frame {
        id,
        surface: SurfaceId(1),
        width: WIDTH,
        height: HEIGHT,
        color_reloaded: false,
        // Far away from the fences the software GPU hands out.
        render_fence: FenceId(1_000_000 + id),
    }
}

/// Submit frames `ids`, spaced so the capture thread takes each one.
fn produce(mailbox: &LatestFrameMailbox, ids: std::ops::RangeInclusive<u64>) {
    for id in ids {
        mailbox.submit(frame(id));
        thread::sleep(Duration::from_millis(4));
    }
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

// ── Stream lifecycle ─────────────────────────────────────────────

#[test]
fn test_start_stream_stop() {
    let Rig {
        link,
        mailbox,
        trace,
        mut controller,
    } = rig(fast_config());

    controller.start_forwarding().unwrap();
    link.set_connected(true);
    assert!(wait_for(|| controller.phase().is_streaming()));

    produce(&mailbox, 1..=20);
    assert!(wait_for(|| link.frames_sent() >= 5));

    let sent = link.last_frame().unwrap();
    assert_eq!((sent.width, sent.height, sent.stride), (WIDTH, HEIGHT, WIDTH * 4));
    assert_eq!(sent.head, [1, 2, 3, 255]);
    assert_eq!(sent.len, (WIDTH * HEIGHT * 4) as usize);

    controller.stop_forwarding();
    controller.join().unwrap();

    assert_eq!(controller.phase(), StreamPhase::Idle);
    assert_eq!(trace.live_buffers(), 0);
    let stats = controller.stats();
    assert_eq!(stats.connections, 1);
    assert!(stats.frames_captured >= stats.frames_sent);
    assert_eq!(stats.frames_sent, link.frames_sent());
}

#[test]
fn test_stop_while_waiting_on_mailbox() {
    // Default timeout: the worker sits in a 200 ms wait.
    let Rig {
        link,
        mailbox,
        trace,
        mut controller,
    } = rig(StreamConfig::default());

    link.set_connected(true);
    controller.start_forwarding().unwrap();
    produce(&mailbox, 1..=3);
    assert!(wait_for(|| controller.phase().is_streaming()));

    let started = Instant::now();
    controller.stop_forwarding();
    controller.join().unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_millis(400), "stop took {elapsed:?}");
    assert_eq!(trace.live_buffers(), 0);
    assert!(controller.phase().is_idle());
}

#[test]
fn test_stop_before_connection() {
    let Rig {
        link,
        mailbox,
        trace,
        mut controller,
    } = rig(fast_config());

    controller.start_forwarding().unwrap();
    produce(&mailbox, 1..=5);
    assert_eq!(controller.phase(), StreamPhase::Connecting);

    controller.stop_forwarding();
    controller.join().unwrap();

    // Nothing was allocated and every drained frame went back unread.
    assert_eq!(
        trace.count(|e| matches!(e, GpuEvent::CreateBuffer { .. })),
        0
    );
    assert!(
        mailbox
            .take_presented()
            .iter()
            .all(|p| p.present_fence.is_none())
    );
    assert_eq!(link.frames_sent(), 0);
}

#[test]
fn test_reconnect_fires_callback_again() {
    let Rig {
        link,
        mailbox,
        mut controller,
        ..
    } = rig(fast_config());

    let widths = Arc::new(parking_lot::Mutex::new(Vec::new()));
    {
        let widths = Arc::clone(&widths);
        controller.on_connected(move |layout| widths.lock().push(layout.width));
    }

    controller.start_forwarding().unwrap();
    link.set_connected(true);
    assert!(wait_for(|| widths.lock().len() == 1));
    produce(&mailbox, 1..=5);

    link.set_connected(false);
    assert!(wait_for(|| controller.phase() == StreamPhase::Connecting));

    link.set_resolution(16, 12);
    link.set_connected(true);
    assert!(wait_for(|| widths.lock().len() == 2));
    assert_eq!(*widths.lock(), vec![WIDTH, 16]);
    assert_eq!(controller.stats().connections, 2);

    controller.stop_forwarding();
    controller.join().unwrap();
}

#[test]
fn test_zero_resolution_waits_for_usable_reconnect() {
    let Rig {
        link,
        mailbox,
        trace,
        mut controller,
    } = rig(fast_config());

    link.set_connected(true);
    controller.start_forwarding().unwrap();
    assert!(wait_for(|| controller.phase().is_streaming()));
    produce(&mailbox, 1..=5);
    link.set_connected(false);
    assert!(wait_for(|| controller.phase() == StreamPhase::Connecting));

    // No staging buffers fit 0x0; the worker keeps waiting.
    link.set_resolution(0, 0);
    link.set_connected(true);
    thread::sleep(Duration::from_millis(50));
    assert!(controller.is_running());
    assert_eq!(controller.phase(), StreamPhase::Connecting);
    assert_eq!(trace.live_buffers(), 0);

    link.set_connected(false);
    link.set_resolution(WIDTH, HEIGHT);
    link.set_connected(true);
    assert!(wait_for(|| controller.phase().is_streaming()));
    let before = link.frames_sent();
    produce(&mailbox, 6..=25);
    assert!(wait_for(|| link.frames_sent() > before));

    controller.stop_forwarding();
    controller.join().unwrap();
    assert_eq!(controller.stats().connections, 2);
    assert_eq!(trace.live_buffers(), 0);
}

// ── Readback ordering ────────────────────────────────────────────

#[test]
fn test_double_buffer_ordering() {
    let Rig {
        link,
        mailbox,
        trace,
        mut controller,
    } = rig(fast_config());

    link.set_connected(true);
    controller.start_forwarding().unwrap();
    assert!(wait_for(|| controller.phase().is_streaming()));
    produce(&mailbox, 1..=30);
    assert!(wait_for(|| link.frames_sent() >= 10));
    controller.stop_forwarding();
    controller.join().unwrap();

    let events = trace.events();
    let mut copy_fence: HashMap<BufferId, FenceId> = HashMap::new();
    let mut waited: HashSet<FenceId> = HashSet::new();
    let mut pending_copy: Option<BufferId> = None;
    let mut last_written: Option<BufferId> = None;
    let mut written = Vec::new();
    let mut maps = 0;

    for event in &events {
        match event {
            GpuEvent::ReadPixels { buffer, .. } => {
                pending_copy = Some(*buffer);
                last_written = Some(*buffer);
                written.push(*buffer);
            }
            GpuEvent::InsertFence(f) => {
                if let Some(buffer) = pending_copy.take() {
                    copy_fence.insert(buffer, *f);
                }
            }
            GpuEvent::WaitFence(f) => {
                waited.insert(*f);
            }
            GpuEvent::Map(buffer) => {
                maps += 1;
                // Never the slot copied into during this iteration.
                assert_ne!(Some(*buffer), last_written);
                let fence = copy_fence[buffer];
                assert!(waited.contains(&fence), "mapped {buffer:?} before its copy fence");
            }
            _ => {}
        }
    }

    assert!(maps >= 10);
    // Write targets strictly alternate.
    for pair in written.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

// ── Input relay ──────────────────────────────────────────────────

#[test]
fn test_input_neutral_while_disconnected() {
    let Rig {
        link,
        mut controller,
        ..
    } = rig(fast_config());
    link.set_state(ControllerState {
        buttons: Buttons::A | Buttons::ZR,
        l_stick_x: 254,
        touch_down: true,
        ..ControllerState::default()
    });

    let decoder = Arc::new(InputDecoder::new(link.clone()));
    controller.start_forwarding().unwrap();

    assert!(!decoder.digital_button(NativeButton::A));
    assert_eq!(decoder.analog_stick(NativeAnalog::CirclePad), (0.0, 0.0));
    assert!(!decoder.touch_point().pressed);
    assert_eq!(link.fetch_count(), 0);
    assert!(!controller.is_streaming());

    controller.stop_forwarding();
    controller.join().unwrap();
}

#[test]
fn test_devices_follow_remote_pad() {
    let Rig {
        link,
        mailbox,
        mut controller,
        ..
    } = rig(fast_config());
    let decoder = Arc::new(InputDecoder::with_interval(link.clone(), Duration::ZERO));
    {
        let decoder = Arc::clone(&decoder);
        controller.on_connected(move |layout| {
            decoder.set_viewport_coverage(layout.horizontal_coverage());
        });
    }

    let buttons = RemoteButtonFactory::new(Arc::clone(&decoder));
    let a = buttons.create(&RemoteButtonFactory::button_mapping(NativeButton::A));
    let home = buttons.create(&RemoteButtonFactory::button_mapping(NativeButton::Home));
    let touch = RemoteTouchFactory::new(Arc::clone(&decoder))
        .create(&RemoteTouchFactory::touch_mapping());

    link.set_state(ControllerState {
        buttons: Buttons::A,
        touch_x: 128,
        touch_y: 128,
        touch_down: true,
        ..ControllerState::default()
    });
    link.set_connected(true);
    controller.start_forwarding().unwrap();
    assert!(wait_for(|| controller.phase().is_streaming()));
    produce(&mailbox, 1..=3);

    assert!(a.status());
    assert!(!home.status());
    let point = touch.status();
    assert!(point.pressed);
    assert!((point.x - 0.5).abs() < 0.01);

    // 8x6 is exactly 4:3, so the viewport spans the whole frame.
    assert!(wait_for(|| decoder.viewport_coverage() == 1.0));

    link.set_connected(false);
    assert!(!a.status());
    assert!(!touch.status().pressed);

    controller.stop_forwarding();
    controller.join().unwrap();
}

#[test]
fn test_concurrent_queries_share_one_fetch() {
    let link = Arc::new(LoopbackLink::new(WIDTH, HEIGHT));
    link.set_connected(true);
    link.set_state(ControllerState::with_buttons(Buttons::B));
    let decoder = Arc::new(InputDecoder::with_interval(
        link.clone(),
        Duration::from_secs(60),
    ));
    let hits = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let decoder = Arc::clone(&decoder);
            let hits = Arc::clone(&hits);
            thread::spawn(move || {
                for _ in 0..100 {
                    if decoder.digital_button(NativeButton::B) {
                        hits.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    assert_eq!(hits.load(Ordering::Relaxed), 800);
    assert_eq!(link.fetch_count(), 1);
}
