//! ### English
//! Boot orchestrator: extraction decision, background extraction, bounded boot wait, and the
//! fatal fallback on timeout.
//!
//! Worker threads only touch `Send + Sync` collaborators and the shared `BootContext`; every view
//! change is posted back to the UI thread through the mailbox.
//!
//! ### 中文
//! 启动编排器：解压决策、后台解压、有界的启动等待，以及超时时的致命回退。
//!
//! 工作线程只接触 `Send + Sync` 的协作方与共享的 `BootContext`；所有视图变更都通过邮箱投递回
//! UI 线程。

use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use crate::engine::error::{BootError, SchedulerError};
use crate::engine::flags::BootConfig;
use crate::engine::host::{
    BootMessage, BootUi, ProcessControl, RootfsManager, StatusBeacon, Telemetry,
};
use crate::engine::mailbox::{UiSender, UiTask};
use crate::engine::scheduler::{TaskScheduler, TimerHandle};
use crate::engine::tuning::Tuning;

use super::{
    BootContext, BootOutcome, BootPhase, ExtractionFacts, HintStage, schedule_extraction_hints,
};

/// ### English
/// Exit code used when a stuck boot terminates the process.
///
/// ### 中文
/// 启动卡死导致进程终止时使用的退出码。
const BOOT_FAILURE_EXIT_CODE: i32 = 0;

/// ### English
/// Result of the re-entrancy guard at screen creation.
///
/// ### 中文
/// 界面创建时重入保护的结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootStart {
    /// ### English
    /// Fresh attempt; the loading UI is up and `boot_system` may run.
    ///
    /// ### 中文
    /// 新的启动尝试；加载界面已显示，可以调用 `boot_system`。
    Started,
    /// ### English
    /// The system was already running; the screen was finished and a reboot requested.
    ///
    /// ### 中文
    /// 系统已在运行；已结束当前界面并请求重启。
    Redirected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootPath {
    Extracting,
    Direct,
}

/// ### English
/// Sequential boot state machine for one app launch.
///
/// ### 中文
/// 单次应用启动的顺序启动状态机。
pub struct BootOrchestrator {
    ctx: Arc<BootContext>,
    ui: Rc<dyn BootUi>,
    rootfs: Arc<dyn RootfsManager>,
    status: Arc<dyn StatusBeacon>,
    telemetry: Arc<dyn Telemetry>,
    process: Arc<dyn ProcessControl>,
    tuning: Tuning,
    hint_timers: Vec<TimerHandle>,
    /// ### English
    /// Result of the last guard run; `boot_system` only proceeds after `Started`.
    ///
    /// ### 中文
    /// 最近一次重入保护的结果；只有 `Started` 之后 `boot_system` 才会执行。
    start: Option<BootStart>,
}

impl BootOrchestrator {
    pub fn new(
        ui: Rc<dyn BootUi>,
        rootfs: Arc<dyn RootfsManager>,
        status: Arc<dyn StatusBeacon>,
        telemetry: Arc<dyn Telemetry>,
        process: Arc<dyn ProcessControl>,
        tuning: Tuning,
    ) -> Self {
        Self {
            ctx: Arc::new(BootContext::default()),
            ui,
            rootfs,
            status,
            telemetry,
            process,
            tuning,
            hint_timers: Vec::new(),
            start: None,
        }
    }

    pub fn phase(&self) -> BootPhase {
        self.ctx.phase()
    }

    pub fn context(&self) -> &Arc<BootContext> {
        &self.ctx
    }

    /// ### English
    /// Re-entrancy guard at the very top of the flow.
    ///
    /// If the virtualized system already reports started, the screen is finished and a reboot is
    /// requested instead of booting a second instance.
    ///
    /// ### 中文
    /// 流程最开始的重入保护。
    ///
    /// 若虚拟系统已报告启动，则结束当前界面并请求重启，而不是再启动一个实例。
    pub fn begin(&mut self) -> BootStart {
        let started = self.status.is_started();
        info!("boot begin: already started = {started}");
        if started {
            self.redirect();
            return BootStart::Redirected;
        }

        self.status.reset();
        self.ui.show_loading();
        self.start = Some(BootStart::Started);
        BootStart::Started
    }

    /// ### English
    /// Finishes the screen and requests a reboot. No boot can start on this screen afterwards.
    ///
    /// ### 中文
    /// 结束当前界面并请求重启；此后本界面不会再开始引导。
    pub fn redirect(&mut self) {
        self.start = Some(BootStart::Redirected);
        self.process.finish_screen();
        self.rootfs.reboot();
    }

    /// ### English
    /// Evaluates the extraction decision and starts the matching path.
    ///
    /// Returns `None` unless `begin` returned `Started`, or if a boot was already started for
    /// this launch.
    ///
    /// ### 中文
    /// 计算解压决策并启动相应路径。
    ///
    /// 除非 `begin` 返回了 `Started`，否则返回 `None`；本次启动已开始引导时同样返回 `None`。
    pub(crate) fn boot_system(
        &mut self,
        config: BootConfig,
        scheduler: &TaskScheduler,
        sender: &UiSender,
    ) -> Option<BootPath> {
        if self.start != Some(BootStart::Started) {
            warn!("boot_system ignored after guard result {:?}", self.start);
            return None;
        }
        if self.ctx.phase() != BootPhase::NotStarted {
            warn!("boot_system ignored in phase {:?}", self.ctx.phase());
            return None;
        }

        let facts = ExtractionFacts {
            rom_exists: self.rootfs.rom_exist(),
            factory_updated: self.rootfs.needs_upgrade(),
            force_reinstall: config.force_reinstall,
            use_third_party_rom: config.use_third_party_rom,
        };

        if !facts.requires_extraction() {
            info!("rootfs up to date ({facts:?}); booting directly");
            self.ctx.advance(BootPhase::InitializingRootfs);
            self.attach_and_wait(sender);
            return Some(BootPath::Direct);
        }

        info!("extracting rom ({facts:?})");
        self.ctx.advance(BootPhase::Extracting);
        self.ui.set_loading_message(BootMessage::Extracting);
        self.hint_timers = schedule_extraction_hints(
            scheduler,
            &self.ctx,
            sender,
            self.tuning.extraction_hint_delays,
        );

        if let Err(err) = self.spawn_extraction(facts, sender.clone()) {
            self.fail_now(&err.to_string());
        }
        Some(BootPath::Extracting)
    }

    fn spawn_extraction(&self, facts: ExtractionFacts, sender: UiSender) -> Result<(), SchedulerError> {
        let ctx = self.ctx.clone();
        let rootfs = self.rootfs.clone();
        thread::Builder::new()
            .name("extract-rom".to_string())
            .spawn(move || {
                ctx.set_extracting(true);
                if let Err(err) = rootfs.extract_rootfs(&facts) {
                    warn!("{err}; continuing to the boot wait");
                }
                ctx.set_extracting(false);

                ctx.advance(BootPhase::InitializingRootfs);
                if let Err(err) = rootfs.init_rootfs() {
                    warn!("{err}; continuing to the boot wait");
                }
                sender.post(UiTask::RootfsReady);
            })
            .map(|_| ())
            .map_err(|source| SchedulerError::Spawn {
                name: "extract-rom",
                source,
            })
    }

    /// ### English
    /// UI-thread continuation of the extraction worker.
    ///
    /// ### 中文
    /// 解压工作线程完成后在 UI 线程上的后续处理。
    pub(crate) fn on_rootfs_ready(&mut self, sender: &UiSender) {
        if self.ctx.phase() != BootPhase::InitializingRootfs {
            warn!("rootfs ready ignored in phase {:?}", self.ctx.phase());
            return;
        }
        self.cancel_hints();
        self.attach_and_wait(sender);
    }

    /// ### English
    /// Shows a hint the timer found due while extraction ran. Only dropped once the surface is
    /// attached, since the hint may sit in the mailbox after extraction finished.
    ///
    /// ### 中文
    /// 显示计时器在解压期间判定到期的提示；提示可能在解压结束后仍留在邮箱中，只有在界面已挂载后才丢弃。
    pub(crate) fn apply_hint(&self, stage: HintStage) {
        if self.ctx.phase() > BootPhase::InitializingRootfs {
            info!("hint {stage:?} arrived after attach; dropped");
            return;
        }
        self.ui.set_loading_message(stage.message());
    }

    fn attach_and_wait(&mut self, sender: &UiSender) {
        self.ui.attach_surface_view();
        self.ctx.advance(BootPhase::WaitingForBoot);
        self.ui.show_boot_log();

        let waiter = BootWaiter {
            ctx: self.ctx.clone(),
            status: self.status.clone(),
            telemetry: self.telemetry.clone(),
            process: self.process.clone(),
            sender: sender.clone(),
            timeout: self.tuning.boot_wait_timeout,
            failure_pause: self.tuning.failure_notice_pause,
        };
        let spawned = thread::Builder::new()
            .name("waiting-boot".to_string())
            .spawn(move || waiter.run());
        if let Err(err) = spawned {
            self.fail_now(&format!("failed to spawn waiting-boot thread: {err}"));
        }
    }

    /// ### English
    /// Applies the wait outcome to the UI.
    ///
    /// ### 中文
    /// 将等待结果应用到界面。
    pub(crate) fn on_boot_settled(&mut self, outcome: BootOutcome) {
        self.cancel_hints();
        match outcome {
            BootOutcome::Ready => self.ui.reveal_display(),
            BootOutcome::Failed => self.ui.show_boot_failure_notice(),
        }
    }

    /// ### English
    /// Failure path for when no worker thread can be started; runs on the UI thread without
    /// the notice pause.
    ///
    /// ### 中文
    /// 无法启动工作线程时的失败路径；在 UI 线程执行，不做提示停留。
    fn fail_now(&mut self, reason: &str) {
        if !self.ctx.advance(BootPhase::Failed) {
            return;
        }
        error!("boot failed: {reason}");
        self.cancel_hints();
        self.telemetry.track_boot_failure();
        self.ui.show_boot_failure_notice();
        self.process.finish_screen();
        self.process.terminate(BOOT_FAILURE_EXIT_CODE);
    }

    fn cancel_hints(&mut self) {
        for timer in self.hint_timers.drain(..) {
            timer.cancel();
        }
    }
}

impl Drop for BootOrchestrator {
    fn drop(&mut self) {
        self.cancel_hints();
    }
}

/// ### English
/// Everything the `waiting-boot` worker needs, all of it `Send`.
///
/// ### 中文
/// `waiting-boot` 工作线程所需的全部数据，均为 `Send`。
struct BootWaiter {
    ctx: Arc<BootContext>,
    status: Arc<dyn StatusBeacon>,
    telemetry: Arc<dyn Telemetry>,
    process: Arc<dyn ProcessControl>,
    sender: UiSender,
    timeout: Duration,
    failure_pause: Duration,
}

impl BootWaiter {
    fn run(self) {
        let result = match self.status.wait_boot(self.timeout) {
            Ok(true) => Ok(()),
            Ok(false) => Err(BootError::Timeout(self.timeout)),
            Err(err) => Err(BootError::from(err)),
        };

        match result {
            Ok(()) => {
                if self.ctx.advance(BootPhase::Ready) {
                    self.sender.post(UiTask::BootSettled(BootOutcome::Ready));
                }
            }
            Err(err) => {
                if !self.ctx.advance(BootPhase::Failed) {
                    return;
                }
                error!("boot failed: {err}");
                self.telemetry.track_boot_failure();
                self.sender.post(UiTask::BootSettled(BootOutcome::Failed));

                thread::sleep(self.failure_pause);

                self.process.finish_screen();
                self.process.terminate(BOOT_FAILURE_EXIT_CODE);
            }
        }
    }
}
