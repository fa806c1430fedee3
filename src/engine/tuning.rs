//! ### English
//! Timing and threshold constants, overridable by the embedder at creation time.
//!
//! ### 中文
//! 时序与阈值常量，宿主可在创建时覆盖。

use std::time::Duration;

/// ### English
/// A refresh-rate reading must differ from the baseline by more than this to count as a
/// rate-class switch (absorbs float jitter in the reported value).
///
/// ### 中文
/// 刷新率读数与基线的差值需超过该值才视为刷新率档位切换（吸收上报值的浮点抖动）。
pub const DEFAULT_REFRESH_CHANGE_THRESHOLD_HZ: f32 = 1.0;

pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_millis(1000);

/// ### English
/// Upper bound for the wait on the virtualized system's boot-completion signal.
///
/// ### 中文
/// 等待虚拟系统启动完成信号的上限。
pub const DEFAULT_BOOT_WAIT_TIMEOUT: Duration = Duration::from_secs(15);

/// ### English
/// How long the failure notice stays up before the process is terminated.
///
/// ### 中文
/// 进程终止前失败提示的停留时长。
pub const DEFAULT_FAILURE_NOTICE_PAUSE: Duration = Duration::from_secs(3);

pub const DEFAULT_EXTRACTION_HINT_DELAYS: [Duration; 3] = [
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(15),
];

/// ### English
/// Runtime tuning for the display controller.
///
/// ### 中文
/// 显示控制器的运行时调参。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tuning {
    pub refresh_change_threshold_hz: f32,
    pub watchdog_interval: Duration,
    pub boot_wait_timeout: Duration,
    pub failure_notice_pause: Duration,
    /// ### English
    /// Checkpoints (from extraction start) for the three escalating first-boot messages.
    ///
    /// ### 中文
    /// 三条逐级首启提示的检查点（从解压开始计时）。
    pub extraction_hint_delays: [Duration; 3],
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            refresh_change_threshold_hz: DEFAULT_REFRESH_CHANGE_THRESHOLD_HZ,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            boot_wait_timeout: DEFAULT_BOOT_WAIT_TIMEOUT,
            failure_notice_pause: DEFAULT_FAILURE_NOTICE_PAUSE,
            extraction_hint_delays: DEFAULT_EXTRACTION_HINT_DELAYS,
        }
    }
}
