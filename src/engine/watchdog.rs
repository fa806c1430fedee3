//! ### English
//! Refresh-rate watchdog: a 1 Hz check that rebinds the renderer when the display switches
//! refresh-rate class (e.g. 120 -> 60/90).
//!
//! The timer thread only posts `WatchdogTick`s; the check itself runs on the UI thread. Each
//! arming gets a new generation so ticks still queued from a cancelled arming are ignored.
//!
//! ### 中文
//! 刷新率看门狗：每秒检查一次，显示器切换刷新率档位（如 120 -> 60/90）时重新绑定渲染器。
//!
//! 计时线程只投递 `WatchdogTick`，检查本身在 UI 线程执行。每次 arm 都会生成新的 generation，
//! 已取消的 arm 遗留在队列中的 tick 会被忽略。

use std::rc::Rc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::engine::error::RendererError;
use crate::engine::fps::RateCheck;
use crate::engine::host::DisplayHost;
use crate::engine::mailbox::{UiSender, UiTask};
use crate::engine::scheduler::{TaskScheduler, TimerHandle};
use crate::engine::surface::SurfaceManager;
use crate::engine::vsync::VsyncPump;

/// ### English
/// What one watchdog run did.
///
/// ### 中文
/// 单次看门狗检查的结果。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WatchdogOutcome {
    NoSurface,
    BaselineAdopted(f32),
    Steady,
    Reinitialized { rate: f32, fps: u32 },
}

pub struct RefreshWatchdog {
    display: Rc<dyn DisplayHost>,
    threshold_hz: f32,
    interval: Duration,
    generation: u64,
    timer: Option<TimerHandle>,
    reinits: u64,
}

impl RefreshWatchdog {
    pub fn new(display: Rc<dyn DisplayHost>, threshold_hz: f32, interval: Duration) -> Self {
        Self {
            display,
            threshold_hz,
            interval,
            generation: 0,
            timer: None,
            reinits: 0,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    pub fn reinit_count(&self) -> u64 {
        self.reinits
    }

    /// ### English
    /// Starts (or restarts) the periodic check. Any earlier arming is cancelled first.
    ///
    /// ### 中文
    /// 启动（或重新启动）周期检查；会先取消之前的 arm。
    pub(crate) fn arm(&mut self, scheduler: &TaskScheduler, sender: &UiSender) {
        self.disarm();
        self.generation += 1;
        let generation = self.generation;
        let sender = sender.clone();
        self.timer = Some(scheduler.schedule_repeating(self.interval, move || {
            sender.post(UiTask::WatchdogTick { generation });
        }));
        debug!("refresh watchdog armed (generation {generation})");
    }

    pub fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
            debug!("refresh watchdog disarmed (generation {})", self.generation);
        }
    }

    /// ### English
    /// Whether a tick of `generation` belongs to the current arming.
    ///
    /// ### 中文
    /// `generation` 的 tick 是否属于当前这次 arm。
    pub(crate) fn accepts(&self, generation: u64) -> bool {
        self.timer.is_some() && generation == self.generation
    }

    /// ### English
    /// One check. On a rate-class switch: rebind at the new fps (old binding removed first),
    /// restart the pump, and re-apply the surface size. A binding whose last `init` failed is
    /// retried the same way at the current rate.
    ///
    /// Errors are returned for the caller to log; they never stop future ticks.
    ///
    /// ### 中文
    /// 执行一次检查。检测到刷新率档位切换时：以新 fps 重新绑定（先移除旧绑定）、重启泵、
    /// 重新应用 surface 尺寸。上次 `init` 失败的绑定会以当前刷新率按同样方式重试。
    ///
    /// 错误返回给调用方记录，不会阻止后续 tick。
    pub fn run_once(
        &mut self,
        surfaces: &mut SurfaceManager,
        pump: &mut VsyncPump,
    ) -> Result<WatchdogOutcome, RendererError> {
        if surfaces.live_surface().is_none() {
            return Ok(WatchdogOutcome::NoSurface);
        }

        let rate = self.display.refresh_rate();
        if surfaces.binding().is_some_and(|binding| !binding.active) {
            warn!("renderer binding inactive; retrying at {rate} Hz");
            return self.reinit(surfaces, pump, rate);
        }

        match surfaces.baseline_ref().check(rate, self.threshold_hz) {
            RateCheck::NoBaseline => {
                surfaces.adopt_baseline(rate);
                Ok(WatchdogOutcome::BaselineAdopted(rate))
            }
            RateCheck::Steady => Ok(WatchdogOutcome::Steady),
            RateCheck::Switched { from, to } => {
                info!("refresh switched {from} -> {to}");
                self.reinit(surfaces, pump, to)
            }
        }
    }

    fn reinit(
        &mut self,
        surfaces: &mut SurfaceManager,
        pump: &mut VsyncPump,
        rate: f32,
    ) -> Result<WatchdogOutcome, RendererError> {
        let fps = surfaces.rebind_at_rate(rate)?;
        self.reinits += 1;
        info!("renderer re-initialized at {fps} fps");

        pump.start(surfaces.live_surface());
        surfaces.reapply_size()?;
        Ok(WatchdogOutcome::Reinitialized { rate, fps })
    }
}

impl Drop for RefreshWatchdog {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dpi::PhysicalSize;

    use super::*;
    use crate::engine::error::RendererOp;
    use crate::engine::host::SurfaceHandle;
    use crate::engine::testing::{Call, CallLog, FakeClock, FakeDisplay, FakeRenderer, FakeRootfs};

    struct Fixture {
        watchdog: RefreshWatchdog,
        surfaces: SurfaceManager,
        pump: VsyncPump,
        display: Rc<FakeDisplay>,
        renderer: Rc<FakeRenderer>,
    }

    fn fixture(initial_rate: f32) -> Fixture {
        let log = CallLog::default();
        let renderer = Rc::new(FakeRenderer::with_log(log.clone()));
        let display = Rc::new(FakeDisplay::with_rate(initial_rate));
        let clock = Rc::new(FakeClock::with_log(log));
        Fixture {
            watchdog: RefreshWatchdog::new(display.clone(), 1.0, Duration::from_secs(1)),
            surfaces: SurfaceManager::new(
                renderer.clone(),
                display.clone(),
                Arc::new(FakeRootfs::default()),
            ),
            pump: VsyncPump::new(clock, renderer.clone()),
            display,
            renderer,
        }
    }

    fn attach(f: &mut Fixture) {
        f.surfaces
            .on_surface_available(SurfaceHandle::from_raw(7).unwrap(), PhysicalSize::new(1080, 2400))
            .unwrap();
    }

    fn run(f: &mut Fixture, rate: f32) -> WatchdogOutcome {
        f.display.set_rate(rate);
        f.watchdog.run_once(&mut f.surfaces, &mut f.pump).unwrap()
    }

    #[test]
    fn no_surface_is_noop() {
        let mut f = fixture(120.0);
        assert_eq!(run(&mut f, 60.0), WatchdogOutcome::NoSurface);
        assert!(f.renderer.calls().is_empty());
    }

    #[test]
    fn jitter_never_reinitializes() {
        let mut f = fixture(120.0);
        attach(&mut f);
        for rate in [120.0, 120.4, 119.7, 121.0] {
            assert_eq!(run(&mut f, rate), WatchdogOutcome::Steady);
        }
        assert_eq!(f.watchdog.reinit_count(), 0);
        assert_eq!(f.renderer.count(Call::RemoveWindow { surface: 7 }), 0);
        assert_eq!(f.surfaces.baseline(), Some(120.0));
    }

    #[test]
    fn class_switch_reinitializes_once() {
        let mut f = fixture(120.0);
        attach(&mut f);

        assert_eq!(run(&mut f, 120.3), WatchdogOutcome::Steady);
        assert_eq!(
            run(&mut f, 90.0),
            WatchdogOutcome::Reinitialized { rate: 90.0, fps: 90 }
        );
        assert_eq!(run(&mut f, 90.0), WatchdogOutcome::Steady);
        assert_eq!(run(&mut f, 90.6), WatchdogOutcome::Steady);

        assert_eq!(f.watchdog.reinit_count(), 1);
        assert_eq!(f.surfaces.baseline(), Some(90.0));
        assert!(f.pump.is_enabled());

        let calls = f.renderer.calls();
        let tail: Vec<_> = calls.iter().skip(1).cloned().collect();
        assert_eq!(
            tail,
            vec![
                Call::RemoveWindow { surface: 7 },
                Call::Init { surface: 7, fps: 90 },
                Call::FramePosted,
                Call::ResetWindow {
                    surface: 7,
                    width: 1080,
                    height: 2400
                },
            ]
        );
    }

    #[test]
    fn failed_surface_init_is_retried_on_next_tick() {
        let mut f = fixture(60.0);
        f.renderer.fail_next(RendererOp::Init);
        let _ = f.surfaces.on_surface_available(
            SurfaceHandle::from_raw(7).unwrap(),
            PhysicalSize::new(10, 10),
        );
        assert_eq!(f.surfaces.baseline(), None);
        assert!(!f.surfaces.binding().unwrap().active);

        assert_eq!(
            run(&mut f, 60.0),
            WatchdogOutcome::Reinitialized { rate: 60.0, fps: 60 }
        );
        assert!(f.surfaces.binding().unwrap().active);
        assert_eq!(f.surfaces.baseline(), Some(60.0));
        assert_eq!(f.watchdog.reinit_count(), 1);
        assert!(f.pump.is_enabled());

        assert_eq!(run(&mut f, 60.2), WatchdogOutcome::Steady);
        assert_eq!(f.watchdog.reinit_count(), 1);
    }

    #[test]
    fn failed_reinit_keeps_baseline_and_retries() {
        let mut f = fixture(120.0);
        attach(&mut f);
        f.renderer.fail_next(RendererOp::Init);
        f.renderer.fail_next(RendererOp::RemoveWindow);

        f.display.set_rate(60.0);
        assert!(f.watchdog.run_once(&mut f.surfaces, &mut f.pump).is_err());
        assert_eq!(f.surfaces.baseline(), Some(120.0));
        assert!(!f.pump.is_enabled());

        assert_eq!(
            run(&mut f, 60.0),
            WatchdogOutcome::Reinitialized { rate: 60.0, fps: 60 }
        );
        assert_eq!(f.surfaces.baseline(), Some(60.0));
    }
}
