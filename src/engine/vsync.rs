//! ### English
//! Vsync repaint pump: one repaint per host vertical-sync tick while enabled.
//!
//! At most one frame callback is ever posted. Late or dropped ticks are skipped, never queued.
//! A failing repaint disarms the pump until the next explicit `start()`.
//!
//! ### 中文
//! Vsync 重绘泵：启用期间每个宿主垂直同步 tick 执行一次重绘。
//!
//! 任何时刻最多只 post 一个帧回调；迟到或丢失的 tick 直接跳过，不会排队。
//! 重绘失败会解除泵的启用，直到下一次显式 `start()`。

use std::rc::{Rc, Weak};

use log::{info, warn};

use crate::engine::host::{FrameClock, Renderer};
use crate::engine::surface::PresentationSurface;

/// ### English
/// What one vsync callback did.
///
/// ### 中文
/// 单次 vsync 回调的处理结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameTick {
    /// ### English
    /// Pump disabled (or its surface is gone); nothing was drawn.
    ///
    /// ### 中文
    /// 泵未启用（或 surface 已销毁）；未绘制。
    Idle,
    Painted,
    /// ### English
    /// Repaint failed; the pump disarmed itself.
    ///
    /// ### 中文
    /// 重绘失败；泵已自行解除。
    Disarmed,
}

pub struct VsyncPump {
    clock: Rc<dyn FrameClock>,
    renderer: Rc<dyn Renderer>,
    enabled: bool,
    /// ### English
    /// A frame callback is posted and not yet answered.
    ///
    /// ### 中文
    /// 已 post 且尚未回调的帧回调。
    in_flight: bool,
    /// ### English
    /// Existence check only; the surface manager owns the surface.
    ///
    /// ### 中文
    /// 仅用于存在性检查；surface 由 surface 管理器持有。
    target: Weak<PresentationSurface>,
    frames: u64,
    last_frame_nanos: Option<i64>,
}

impl VsyncPump {
    pub fn new(clock: Rc<dyn FrameClock>, renderer: Rc<dyn Renderer>) -> Self {
        Self {
            clock,
            renderer,
            enabled: false,
            in_flight: false,
            target: Weak::new(),
            frames: 0,
            last_frame_nanos: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// ### English
    /// Total successful repaints issued by this pump.
    ///
    /// ### 中文
    /// 本泵成功发出的重绘总数。
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// ### English
    /// Arms the pump for `surface`. No-op if already enabled or if there is no live surface.
    /// Returns whether the pump is enabled afterwards.
    ///
    /// ### 中文
    /// 为 `surface` 启用泵；若已启用或没有存活的 surface 则不做任何事。返回调用后泵是否启用。
    pub fn start(&mut self, surface: Option<&Rc<PresentationSurface>>) -> bool {
        if self.enabled {
            return true;
        }
        let Some(surface) = surface else {
            return false;
        };

        self.target = Rc::downgrade(surface);
        self.enabled = true;
        self.post_next();
        info!("vsync pump started");
        true
    }

    /// ### English
    /// Disarms the pump and withdraws a pending frame callback. Safe to call at any time.
    ///
    /// ### 中文
    /// 解除泵并撤回待处理的帧回调；任何时候调用都安全。
    pub fn stop(&mut self) {
        if self.in_flight {
            self.in_flight = false;
            self.clock.remove_frame_callback();
        }
        if self.enabled {
            self.enabled = false;
            self.target = Weak::new();
            info!("vsync pump stopped");
        }
    }

    /// ### English
    /// Host vertical-sync callback.
    ///
    /// ### 中文
    /// 宿主垂直同步回调。
    pub fn on_vsync(&mut self, frame_time_nanos: i64) -> FrameTick {
        self.in_flight = false;
        if !self.enabled {
            return FrameTick::Idle;
        }
        if self.target.strong_count() == 0 {
            self.enabled = false;
            return FrameTick::Idle;
        }

        if let Err(err) = self.renderer.repaint() {
            warn!(
                "{err} (frame {frame_time_nanos}, last good {:?}); vsync pump disarmed",
                self.last_frame_nanos
            );
            self.enabled = false;
            self.target = Weak::new();
            return FrameTick::Disarmed;
        }

        self.frames += 1;
        self.last_frame_nanos = Some(frame_time_nanos);
        self.post_next();
        FrameTick::Painted
    }

    fn post_next(&mut self) {
        if !self.in_flight {
            self.in_flight = true;
            self.clock.post_frame_callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use dpi::PhysicalSize;

    use super::*;
    use crate::engine::error::RendererOp;
    use crate::engine::host::SurfaceHandle;
    use crate::engine::testing::{Call, FakeClock, FakeRenderer};

    fn surface() -> Rc<PresentationSurface> {
        Rc::new(PresentationSurface::new(
            SurfaceHandle::from_raw(0x10).unwrap(),
            PhysicalSize::new(1080, 2400),
        ))
    }

    fn pump() -> (VsyncPump, Rc<FakeClock>, Rc<FakeRenderer>) {
        let clock = Rc::new(FakeClock::default());
        let renderer = Rc::new(FakeRenderer::default());
        (VsyncPump::new(clock.clone(), renderer.clone()), clock, renderer)
    }

    #[test]
    fn start_without_surface_is_noop() {
        let (mut pump, clock, _) = pump();
        assert!(!pump.start(None));
        assert!(!pump.is_enabled());
        assert_eq!(clock.posted(), 0);
    }

    #[test]
    fn one_repaint_per_tick_until_stopped() {
        let (mut pump, clock, renderer) = pump();
        let surface = surface();
        assert!(pump.start(Some(&surface)));
        assert!(pump.start(Some(&surface)));
        assert_eq!(clock.posted(), 1);

        for tick in 0..5 {
            assert_eq!(pump.on_vsync(tick), FrameTick::Painted);
        }
        assert_eq!(renderer.count(Call::Repaint), 5);
        assert_eq!(clock.posted(), 6);

        pump.stop();
        assert_eq!(clock.removed(), 1);
        assert_eq!(pump.on_vsync(99), FrameTick::Idle);
        assert_eq!(renderer.count(Call::Repaint), 5);
        pump.stop();
        assert_eq!(clock.removed(), 1);
    }

    #[test]
    fn failing_repaint_disarms_until_restart() {
        let (mut pump, clock, renderer) = pump();
        let surface = surface();
        pump.start(Some(&surface));
        renderer.fail_next(RendererOp::Repaint);

        assert_eq!(pump.on_vsync(1), FrameTick::Disarmed);
        assert!(!pump.is_enabled());
        assert_eq!(clock.posted(), 1);
        for tick in 2..6 {
            assert_eq!(pump.on_vsync(tick), FrameTick::Idle);
        }
        assert_eq!(renderer.count(Call::Repaint), 1);

        assert!(pump.start(Some(&surface)));
        assert_eq!(pump.on_vsync(7), FrameTick::Painted);
        assert_eq!(pump.frames(), 1);
    }

    #[test]
    fn dropped_surface_stops_painting() {
        let (mut pump, _, renderer) = pump();
        let surface = surface();
        pump.start(Some(&surface));
        drop(surface);
        assert_eq!(pump.on_vsync(1), FrameTick::Idle);
        assert!(!pump.is_enabled());
        assert_eq!(renderer.count(Call::Repaint), 0);
    }

    #[test]
    fn stop_without_start_is_safe() {
        let (mut pump, clock, _) = pump();
        pump.stop();
        assert_eq!(clock.removed(), 0);
        assert!(!pump.is_enabled());
    }
}
