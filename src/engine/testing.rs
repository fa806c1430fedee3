//! Hand-written fakes of the host boundary for unit tests.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use dpi::{PhysicalPosition, PhysicalSize};

use crate::engine::boot::ExtractionFacts;
use crate::engine::error::{RendererError, RendererOp, RootfsError, StatusError};
use crate::engine::host::{
    BootMessage, BootUi, DisplayDensity, DisplayHost, DisplayMode, FrameClock, HostBindings,
    ProcessControl, Renderer, RootfsManager, StatusBeacon, SurfaceHandle, Telemetry, TouchEvent,
    UiWaker,
};

pub(crate) const TEST_DENSITY: DisplayDensity = DisplayDensity {
    xdpi: 409.4,
    ydpi: 411.0,
};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Init { surface: usize, fps: u32 },
    RemoveWindow { surface: usize },
    ResetWindow { surface: usize, width: u32, height: u32 },
    Repaint,
    Touch { action: i32 },
    Keycode(i32),
    FramePosted,
    FrameRemoved,
}

/// Ordered log shared by the renderer and frame-clock fakes.
#[derive(Clone, Default)]
pub(crate) struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub(crate) fn count(&self, call: Call) -> usize {
        self.0.borrow().iter().filter(|c| **c == call).count()
    }
}

#[derive(Default)]
pub(crate) struct FakeRenderer {
    log: CallLog,
    fail_once: RefCell<Vec<RendererOp>>,
    fail_always: RefCell<Vec<RendererOp>>,
}

impl FakeRenderer {
    pub(crate) fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub(crate) fn fail_next(&self, op: RendererOp) {
        self.fail_once.borrow_mut().push(op);
    }

    pub(crate) fn fail_always(&self, op: RendererOp) {
        self.fail_always.borrow_mut().push(op);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.log.calls()
    }

    pub(crate) fn count(&self, call: Call) -> usize {
        self.log.count(call)
    }

    fn outcome(&self, op: RendererOp) -> Result<(), RendererError> {
        let mut once = self.fail_once.borrow_mut();
        if let Some(index) = once.iter().position(|o| *o == op) {
            once.remove(index);
            return Err(RendererError::new(op, "injected failure"));
        }
        if self.fail_always.borrow().contains(&op) {
            return Err(RendererError::new(op, "injected failure"));
        }
        Ok(())
    }
}

impl Renderer for FakeRenderer {
    fn init(
        &self,
        surface: SurfaceHandle,
        _loader_path: &Path,
        _density: DisplayDensity,
        fps: u32,
    ) -> Result<(), RendererError> {
        self.log.push(Call::Init {
            surface: surface.as_raw(),
            fps,
        });
        self.outcome(RendererOp::Init)
    }

    fn remove_window(&self, surface: SurfaceHandle) -> Result<(), RendererError> {
        self.log.push(Call::RemoveWindow {
            surface: surface.as_raw(),
        });
        self.outcome(RendererOp::RemoveWindow)
    }

    fn reset_window(
        &self,
        surface: SurfaceHandle,
        _origin: PhysicalPosition<i32>,
        size: PhysicalSize<u32>,
    ) -> Result<(), RendererError> {
        self.log.push(Call::ResetWindow {
            surface: surface.as_raw(),
            width: size.width,
            height: size.height,
        });
        self.outcome(RendererOp::ResetWindow)
    }

    fn repaint(&self) -> Result<(), RendererError> {
        self.log.push(Call::Repaint);
        self.outcome(RendererOp::Repaint)
    }

    fn handle_touch(&self, event: &TouchEvent) {
        self.log.push(Call::Touch {
            action: event.action,
        });
    }

    fn send_keycode(&self, code: i32) {
        self.log.push(Call::Keycode(code));
    }
}

#[derive(Default)]
pub(crate) struct FakeClock {
    log: CallLog,
    posted: Cell<usize>,
    removed: Cell<usize>,
}

impl FakeClock {
    pub(crate) fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub(crate) fn posted(&self) -> usize {
        self.posted.get()
    }

    pub(crate) fn removed(&self) -> usize {
        self.removed.get()
    }
}

impl FrameClock for FakeClock {
    fn post_frame_callback(&self) {
        self.posted.set(self.posted.get() + 1);
        self.log.push(Call::FramePosted);
    }

    fn remove_frame_callback(&self) {
        self.removed.set(self.removed.get() + 1);
        self.log.push(Call::FrameRemoved);
    }
}

pub(crate) struct FakeDisplay {
    rate: Cell<f32>,
    modes: RefCell<Vec<DisplayMode>>,
    requested: RefCell<Vec<i32>>,
    released: RefCell<Vec<usize>>,
}

impl FakeDisplay {
    pub(crate) fn with_rate(rate: f32) -> Self {
        Self {
            rate: Cell::new(rate),
            modes: RefCell::new(Vec::new()),
            requested: RefCell::new(Vec::new()),
            released: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn set_rate(&self, rate: f32) {
        self.rate.set(rate);
    }

    pub(crate) fn set_modes(&self, modes: Vec<DisplayMode>) {
        *self.modes.borrow_mut() = modes;
    }

    pub(crate) fn requested(&self) -> Vec<i32> {
        self.requested.borrow().clone()
    }

    pub(crate) fn released(&self) -> Vec<usize> {
        self.released.borrow().clone()
    }
}

impl DisplayHost for FakeDisplay {
    fn refresh_rate(&self) -> f32 {
        self.rate.get()
    }

    fn density(&self) -> DisplayDensity {
        TEST_DENSITY
    }

    fn supported_modes(&self) -> Vec<DisplayMode> {
        self.modes.borrow().clone()
    }

    fn request_display_mode(&self, mode_id: i32) {
        self.requested.borrow_mut().push(mode_id);
    }

    fn release_surface(&self, surface: SurfaceHandle) {
        self.released.borrow_mut().push(surface.as_raw());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UiEvent {
    ShowLoading,
    Message(BootMessage),
    BootLog,
    Attach,
    Reveal,
    FailureNotice,
}

#[derive(Default)]
pub(crate) struct FakeUi {
    events: RefCell<Vec<UiEvent>>,
}

impl FakeUi {
    pub(crate) fn events(&self) -> Vec<UiEvent> {
        self.events.borrow().clone()
    }

    fn push(&self, event: UiEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl BootUi for FakeUi {
    fn show_loading(&self) {
        self.push(UiEvent::ShowLoading);
    }

    fn set_loading_message(&self, message: BootMessage) {
        self.push(UiEvent::Message(message));
    }

    fn show_boot_log(&self) {
        self.push(UiEvent::BootLog);
    }

    fn attach_surface_view(&self) {
        self.push(UiEvent::Attach);
    }

    fn reveal_display(&self) {
        self.push(UiEvent::Reveal);
    }

    fn show_boot_failure_notice(&self) {
        self.push(UiEvent::FailureNotice);
    }
}

pub(crate) struct FakeRootfs {
    pub(crate) rom_exists: AtomicBool,
    pub(crate) needs_upgrade: AtomicBool,
    pub(crate) fail_extract: AtomicBool,
    extract_delay: Duration,
    extracted: Mutex<Vec<ExtractionFacts>>,
    init_calls: AtomicUsize,
    reboots: AtomicUsize,
}

impl Default for FakeRootfs {
    fn default() -> Self {
        Self::new(true, false, Duration::ZERO)
    }
}

impl FakeRootfs {
    pub(crate) fn new(rom_exists: bool, needs_upgrade: bool, extract_delay: Duration) -> Self {
        Self {
            rom_exists: AtomicBool::new(rom_exists),
            needs_upgrade: AtomicBool::new(needs_upgrade),
            fail_extract: AtomicBool::new(false),
            extract_delay,
            extracted: Mutex::new(Vec::new()),
            init_calls: AtomicUsize::new(0),
            reboots: AtomicUsize::new(0),
        }
    }

    pub(crate) fn extracted(&self) -> Vec<ExtractionFacts> {
        self.extracted.lock().unwrap().clone()
    }

    pub(crate) fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn reboots(&self) -> usize {
        self.reboots.load(Ordering::SeqCst)
    }
}

impl RootfsManager for FakeRootfs {
    fn rom_exist(&self) -> bool {
        self.rom_exists.load(Ordering::SeqCst)
    }

    fn needs_upgrade(&self) -> bool {
        self.needs_upgrade.load(Ordering::SeqCst)
    }

    fn extract_rootfs(&self, facts: &ExtractionFacts) -> Result<(), RootfsError> {
        thread::sleep(self.extract_delay);
        self.extracted.lock().unwrap().push(*facts);
        if self.fail_extract.load(Ordering::SeqCst) {
            return Err(RootfsError::Extract("disk full".to_string()));
        }
        Ok(())
    }

    fn init_rootfs(&self) -> Result<(), RootfsError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn loader_path(&self) -> PathBuf {
        PathBuf::from("/data/rootfs/loader64")
    }

    fn reboot(&self) {
        self.reboots.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WaitScript {
    Ready,
    TimedOut,
    Broken,
}

pub(crate) struct FakeStatus {
    pub(crate) started: AtomicBool,
    script: Mutex<WaitScript>,
    resets: AtomicUsize,
    visibility: Mutex<Vec<bool>>,
}

impl FakeStatus {
    pub(crate) fn new(script: WaitScript) -> Self {
        Self {
            started: AtomicBool::new(false),
            script: Mutex::new(script),
            resets: AtomicUsize::new(0),
            visibility: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub(crate) fn visibility(&self) -> Vec<bool> {
        self.visibility.lock().unwrap().clone()
    }
}

impl StatusBeacon for FakeStatus {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn wait_boot(&self, _timeout: Duration) -> Result<bool, StatusError> {
        match *self.script.lock().unwrap() {
            WaitScript::Ready => Ok(true),
            WaitScript::TimedOut => Ok(false),
            WaitScript::Broken => Err(StatusError::Closed),
        }
    }

    fn update_visibility(&self, has_focus: bool) {
        self.visibility.lock().unwrap().push(has_focus);
    }
}

#[derive(Default)]
pub(crate) struct FakeTelemetry {
    failures: AtomicUsize,
}

impl FakeTelemetry {
    pub(crate) fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl Telemetry for FakeTelemetry {
    fn track_boot_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProcessEvent {
    Finished,
    Terminated(i32),
}

pub(crate) struct FakeProcess {
    tx: channel::Sender<ProcessEvent>,
    rx: channel::Receiver<ProcessEvent>,
}

impl Default for FakeProcess {
    fn default() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }
}

impl FakeProcess {
    pub(crate) fn next_event(&self, timeout: Duration) -> Option<ProcessEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub(crate) fn pending(&self) -> Vec<ProcessEvent> {
        self.rx.try_iter().collect()
    }
}

impl ProcessControl for FakeProcess {
    fn finish_screen(&self) {
        let _ = self.tx.send(ProcessEvent::Finished);
    }

    fn terminate(&self, code: i32) {
        let _ = self.tx.send(ProcessEvent::Terminated(code));
    }
}

#[derive(Default)]
pub(crate) struct CountingWaker {
    wakes: AtomicUsize,
}

impl CountingWaker {
    pub(crate) fn wakes(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

impl UiWaker for CountingWaker {
    fn wake(&self) {
        self.wakes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Every fake, with the concrete types kept for assertions.
pub(crate) struct FakeHost {
    pub(crate) log: CallLog,
    pub(crate) renderer: Rc<FakeRenderer>,
    pub(crate) display: Rc<FakeDisplay>,
    pub(crate) clock: Rc<FakeClock>,
    pub(crate) ui: Rc<FakeUi>,
    pub(crate) rootfs: Arc<FakeRootfs>,
    pub(crate) status: Arc<FakeStatus>,
    pub(crate) telemetry: Arc<FakeTelemetry>,
    pub(crate) process: Arc<FakeProcess>,
    pub(crate) waker: Arc<CountingWaker>,
}

impl FakeHost {
    pub(crate) fn new(refresh_rate: f32, rootfs: FakeRootfs, script: WaitScript) -> Self {
        let log = CallLog::default();
        Self {
            renderer: Rc::new(FakeRenderer::with_log(log.clone())),
            clock: Rc::new(FakeClock::with_log(log.clone())),
            log,
            display: Rc::new(FakeDisplay::with_rate(refresh_rate)),
            ui: Rc::new(FakeUi::default()),
            rootfs: Arc::new(rootfs),
            status: Arc::new(FakeStatus::new(script)),
            telemetry: Arc::new(FakeTelemetry::default()),
            process: Arc::new(FakeProcess::default()),
            waker: Arc::new(CountingWaker::default()),
        }
    }

    pub(crate) fn bindings(&self) -> HostBindings {
        HostBindings {
            renderer: self.renderer.clone(),
            display: self.display.clone(),
            frame_clock: self.clock.clone(),
            ui: self.ui.clone(),
            rootfs: self.rootfs.clone(),
            status: self.status.clone(),
            telemetry: self.telemetry.clone(),
            process: self.process.clone(),
            waker: self.waker.clone(),
        }
    }
}
