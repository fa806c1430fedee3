//! ### English
//! C ABI surface for `twoyi_display`.
//!
//! All exported symbols are `extern "C"` functions; structs are `#[repr(C)]`.
//! A `TwoyiDisplay` is confined to the thread that created it (the host UI thread). A
//! `TwoyiStatus` is process-wide and may be used from any thread.
//!
//! ### 中文
//! `twoyi_display` 的 C ABI 接口层。
//!
//! 所有导出符号均为 `extern "C"` 函数；结构体使用 `#[repr(C)]`。
//! `TwoyiDisplay` 只能在创建它的线程（宿主 UI 线程）上使用；`TwoyiStatus` 为进程级对象，
//! 可在任意线程使用。
mod host;
mod input;
mod lifecycle;
mod status;
mod surface;

use std::sync::Arc;
use std::time::Duration;

use dpi::PhysicalPosition;

use crate::engine::{DisplayController, ReadinessBeacon, TouchEvent, Tuning};

/// ### English
/// Opaque per-screen controller handle. Create, use and destroy it on the host UI thread.
///
/// ### 中文
/// 不透明的界面级控制器句柄；须在宿主 UI 线程上创建、使用与销毁。
pub struct TwoyiDisplay {
    controller: DisplayController,
}

/// ### English
/// Opaque process-wide readiness beacon handle.
///
/// Create one per process and pass it to every `twoyi_display_create`; it must outlive them.
///
/// ### 中文
/// 不透明的进程级就绪信标句柄。
///
/// 每个进程创建一个并传给每次 `twoyi_display_create`；其生命周期必须长于所有 display。
pub struct TwoyiStatus {
    beacon: Arc<ReadinessBeacon>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
/// ### English
/// Optional tuning passed at creation. Zero fields keep the built-in default.
///
/// ### 中文
/// 创建时传入的可选调优参数；为 0 的字段使用内置默认值。
pub struct TwoyiDisplayTuning {
    /// ### English
    /// Minimum refresh-rate difference (Hz) treated as a rate-class switch. Default 1.0.
    ///
    /// ### 中文
    /// 视为刷新率档位切换的最小差值（Hz），默认 1.0。
    pub refresh_change_threshold_hz: f32,
    pub watchdog_interval_ms: u32,
    /// ### English
    /// Upper bound of the boot wait. Default 15000.
    ///
    /// ### 中文
    /// 启动等待上限，默认 15000。
    pub boot_wait_timeout_ms: u32,
    pub failure_notice_pause_ms: u32,
    /// ### English
    /// First-boot hint checkpoints, measured from the start of extraction.
    ///
    /// ### 中文
    /// 首启提示的检查点，从解压开始计时。
    pub extraction_hint_delays_ms: [u32; 3],
}

impl From<&TwoyiDisplayTuning> for Tuning {
    fn from(value: &TwoyiDisplayTuning) -> Self {
        let defaults = Tuning::default();
        let millis = |ms: u32, fallback: Duration| {
            if ms == 0 {
                fallback
            } else {
                Duration::from_millis(u64::from(ms))
            }
        };

        let threshold = value.refresh_change_threshold_hz;
        let mut extraction_hint_delays = defaults.extraction_hint_delays;
        for (slot, ms) in extraction_hint_delays
            .iter_mut()
            .zip(value.extraction_hint_delays_ms)
        {
            *slot = millis(ms, *slot);
        }

        Self {
            refresh_change_threshold_hz: if threshold.is_finite() && threshold > 0.0 {
                threshold
            } else {
                defaults.refresh_change_threshold_hz
            },
            watchdog_interval: millis(value.watchdog_interval_ms, defaults.watchdog_interval),
            boot_wait_timeout: millis(value.boot_wait_timeout_ms, defaults.boot_wait_timeout),
            failure_notice_pause: millis(
                value.failure_notice_pause_ms,
                defaults.failure_notice_pause,
            ),
            extraction_hint_delays,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
/// ### English
/// One pointer event, in surface pixels.
///
/// ### 中文
/// 单个指针事件，坐标为 surface 像素。
pub struct TwoyiTouchEvent {
    pub action: i32,
    pub pointer_id: i32,
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
    pub event_time_ms: i64,
}

impl From<TwoyiTouchEvent> for TouchEvent {
    fn from(value: TwoyiTouchEvent) -> Self {
        Self {
            action: value.action,
            pointer_id: value.pointer_id,
            position: PhysicalPosition::new(value.x, value.y),
            pressure: value.pressure,
            event_time_ms: value.event_time_ms,
        }
    }
}

impl From<&TouchEvent> for TwoyiTouchEvent {
    fn from(value: &TouchEvent) -> Self {
        Self {
            action: value.action,
            pointer_id: value.pointer_id,
            x: value.position.x,
            y: value.position.y,
            pressure: value.pressure,
            event_time_ms: value.event_time_ms,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
/// ### English
/// One display mode reported by the host.
///
/// ### 中文
/// 宿主报告的单个显示模式。
pub struct TwoyiDisplayMode {
    pub id: i32,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: f32,
}

/// ### English
/// C ABI version for `twoyi_display`.
///
/// ### 中文
/// `twoyi_display` 的 C ABI 版本号。
const TWOYI_DISPLAY_ABI_VERSION: u32 = 1;

#[unsafe(no_mangle)]
/// ### English
/// Returns the C ABI version. Hosts compare it against the header they were built with.
///
/// ### 中文
/// 返回 C ABI 版本号；宿主将其与构建时使用的头文件比对。
pub extern "C" fn twoyi_display_abi_version() -> u32 {
    TWOYI_DISPLAY_ABI_VERSION
}
