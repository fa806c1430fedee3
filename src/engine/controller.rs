//! ### English
//! `DisplayController`: the per-screen composition root.
//!
//! Owns the surface manager, vsync pump, refresh watchdog and boot orchestrator, and maps host
//! lifecycle callbacks onto them. Every method runs on the UI-owning thread; background work
//! comes back through [`DisplayController::dispatch`].
//!
//! ### 中文
//! `DisplayController`：每个界面的组合根。
//!
//! 持有 surface 管理器、vsync 泵、刷新率看门狗与启动编排器，并把宿主生命周期回调映射到它们。
//! 所有方法都在持有 UI 的线程上执行；后台工作通过 [`DisplayController::dispatch`] 回到此线程。

use std::rc::Rc;
use std::sync::Arc;

use dpi::PhysicalSize;
use log::{debug, info, warn};

use crate::engine::boot::{BootOrchestrator, BootPath, BootPhase, BootStart};
use crate::engine::error::SchedulerError;
use crate::engine::flags::BootConfig;
use crate::engine::fps::select_display_mode;
use crate::engine::host::{
    DisplayHost, HostBindings, KEYCODE_HOME, Renderer, StatusBeacon, SurfaceHandle, TouchEvent,
};
use crate::engine::mailbox::{UiMailbox, UiTask};
use crate::engine::scheduler::TaskScheduler;
use crate::engine::surface::SurfaceManager;
use crate::engine::tuning::Tuning;
use crate::engine::vsync::{FrameTick, VsyncPump};
use crate::engine::watchdog::{RefreshWatchdog, WatchdogOutcome};

pub struct DisplayController {
    scheduler: Arc<TaskScheduler>,
    mailbox: UiMailbox,
    surfaces: SurfaceManager,
    pump: VsyncPump,
    watchdog: RefreshWatchdog,
    boot: BootOrchestrator,
    renderer: Rc<dyn Renderer>,
    display: Rc<dyn DisplayHost>,
    status: Arc<dyn StatusBeacon>,
    has_focus: bool,
}

impl DisplayController {
    /// ### English
    /// Wires every component to the host bindings and spawns the timer thread.
    ///
    /// ### 中文
    /// 将所有组件连接到宿主绑定，并创建计时线程。
    pub fn new(host: HostBindings, tuning: Tuning) -> Result<Self, SchedulerError> {
        let scheduler = TaskScheduler::new()?;
        let mailbox = UiMailbox::new(host.waker.clone());

        Ok(Self {
            scheduler,
            mailbox,
            surfaces: SurfaceManager::new(
                host.renderer.clone(),
                host.display.clone(),
                host.rootfs.clone(),
            ),
            pump: VsyncPump::new(host.frame_clock.clone(), host.renderer.clone()),
            watchdog: RefreshWatchdog::new(
                host.display.clone(),
                tuning.refresh_change_threshold_hz,
                tuning.watchdog_interval,
            ),
            boot: BootOrchestrator::new(
                host.ui,
                host.rootfs,
                host.status.clone(),
                host.telemetry,
                host.process,
                tuning,
            ),
            renderer: host.renderer,
            display: host.display,
            status: host.status,
            has_focus: false,
        })
    }

    pub fn phase(&self) -> BootPhase {
        self.boot.phase()
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn is_pumping(&self) -> bool {
        self.pump.is_enabled()
    }

    pub fn is_watchdog_armed(&self) -> bool {
        self.watchdog.is_armed()
    }

    pub fn surfaces(&self) -> &SurfaceManager {
        &self.surfaces
    }

    /// ### English
    /// Screen creation. Runs the re-entrancy guard; on a fresh start also requests the
    /// high-refresh display mode.
    ///
    /// ### 中文
    /// 界面创建：执行重入保护；新启动时还会请求高刷新率显示模式。
    pub fn on_create(&mut self) -> BootStart {
        let start = self.boot.begin();
        if start == BootStart::Started {
            self.request_high_refresh_mode();
        }
        start
    }

    /// ### English
    /// Starts the boot flow. Ignored (returns `None`) unless `on_create` returned `Started`, or if
    /// it already ran for this screen.
    ///
    /// ### 中文
    /// 启动引导流程；除非 `on_create` 返回 `Started`，否则忽略（返回 `None`）；本界面已执行过时同样忽略。
    pub fn boot_system(&mut self, config: BootConfig) -> Option<BootPath> {
        let sender = self.mailbox.sender();
        self.boot.boot_system(config, &self.scheduler, &sender)
    }

    pub fn on_restore_instance_state(&mut self) {
        info!("instance state restored; redirecting to reboot");
        self.boot.redirect();
    }

    pub fn on_resume(&mut self) {
        self.request_high_refresh_mode();
        let sender = self.mailbox.sender();
        self.watchdog.arm(&self.scheduler, &sender);
        self.sync_pump();
    }

    pub fn on_pause(&mut self) {
        self.pump.stop();
        self.watchdog.disarm();
    }

    pub fn on_window_focus_changed(&mut self, has_focus: bool) {
        debug!("window focus changed: {has_focus}");
        self.has_focus = has_focus;
        if has_focus {
            self.request_high_refresh_mode();
        }
        self.sync_pump();
        self.status.update_visibility(has_focus);
    }

    pub fn on_surface_available(&mut self, handle: SurfaceHandle, size: PhysicalSize<u32>) {
        // A replaced surface must not keep a frame callback aimed at the old target.
        self.pump.stop();
        if let Err(err) = self.surfaces.on_surface_available(handle, size) {
            warn!("{err}; surface kept without an active binding");
        }
        self.sync_pump();
    }

    pub fn on_surface_size_changed(&mut self, size: PhysicalSize<u32>) {
        if let Err(err) = self.surfaces.on_surface_size_changed(size) {
            warn!("{err}");
        }
    }

    pub fn on_surface_destroyed(&mut self) {
        self.surfaces.on_surface_destroyed(&mut self.pump);
    }

    pub fn on_vsync(&mut self, frame_time_nanos: i64) -> FrameTick {
        self.pump.on_vsync(frame_time_nanos)
    }

    pub fn on_touch(&self, event: &TouchEvent) {
        self.renderer.handle_touch(event);
    }

    /// ### English
    /// Back never leaves the app; it is delivered to the virtualized system as HOME.
    ///
    /// ### 中文
    /// 返回键不会退出应用，而是作为 HOME 键发送给虚拟系统。
    pub fn on_back_pressed(&self) {
        self.renderer.send_keycode(KEYCODE_HOME);
    }

    pub fn on_key_down(&self, key_code: i32) {
        debug!("key down: {key_code}");
    }

    /// ### English
    /// Applies every task posted by worker and timer threads. Call on the UI thread after
    /// `UiWaker::wake`. Returns the number of tasks applied.
    ///
    /// ### 中文
    /// 应用工作线程与计时线程投递的全部任务。在 `UiWaker::wake` 之后于 UI 线程调用。
    /// 返回处理的任务数。
    pub fn dispatch(&mut self) -> usize {
        let tasks = self.mailbox.drain();
        let count = tasks.len();
        for task in tasks {
            match task {
                UiTask::WatchdogTick { generation } => self.watchdog_tick(generation),
                UiTask::ExtractionHint(stage) => self.boot.apply_hint(stage),
                UiTask::RootfsReady => {
                    let sender = self.mailbox.sender();
                    self.boot.on_rootfs_ready(&sender);
                }
                UiTask::BootSettled(outcome) => self.boot.on_boot_settled(outcome),
            }
        }
        count
    }

    fn watchdog_tick(&mut self, generation: u64) {
        if !self.watchdog.accepts(generation) {
            debug!("stale watchdog tick (generation {generation}) dropped");
            return;
        }
        match self.watchdog.run_once(&mut self.surfaces, &mut self.pump) {
            Ok(WatchdogOutcome::Reinitialized { rate, fps }) => {
                debug!("watchdog re-bound renderer at {rate} Hz / {fps} fps");
            }
            Ok(_) => {}
            Err(err) => warn!("refresh watchdog: {err}"),
        }
    }

    /// ### English
    /// Keeps the pump running exactly while the screen has focus and a surface is live.
    ///
    /// ### 中文
    /// 保证泵只在界面有焦点且 surface 存活时运行。
    fn sync_pump(&mut self) {
        if self.has_focus {
            self.pump.start(self.surfaces.live_surface());
        } else {
            self.pump.stop();
        }
    }

    fn request_high_refresh_mode(&self) {
        let modes = self.display.supported_modes();
        if let Some(mode) = select_display_mode(&modes) {
            debug!(
                "requesting display mode {} ({}x{} @ {} Hz)",
                mode.id, mode.size.width, mode.size.height, mode.refresh_rate
            );
            self.display.request_display_mode(mode.id);
        }
    }
}

impl Drop for DisplayController {
    fn drop(&mut self) {
        self.pump.stop();
        self.watchdog.disarm();
    }
}
