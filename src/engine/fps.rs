//! ### English
//! Refresh-rate to target-FPS mapping, the frame-rate baseline, and display-mode selection.
//!
//! ### 中文
//! 刷新率到目标 FPS 的映射、帧率基线，以及显示模式选择。

use crate::engine::host::DisplayMode;

pub const MIN_TARGET_FPS: u32 = 60;
pub const MAX_TARGET_FPS: u32 = 240;

/// ### English
/// Readings below this are treated as unreliable and replaced by `DEFAULT_TARGET_FPS`.
///
/// ### 中文
/// 低于该值的读数视为不可靠，替换为 `DEFAULT_TARGET_FPS`。
pub const UNRELIABLE_FPS_BELOW: i32 = 30;
pub const DEFAULT_TARGET_FPS: u32 = 60;

/// ### English
/// Modes at or above this rate count as "120 Hz class" when picking a display mode.
///
/// ### 中文
/// 选择显示模式时，不低于该刷新率的模式视为“120 Hz 档”。
const HIGH_REFRESH_CLASS_HZ: f32 = 119.5;

/// ### English
/// Clamps a rounded refresh rate into `[MIN_TARGET_FPS, MAX_TARGET_FPS]`.
///
/// ### 中文
/// 将取整后的刷新率限制在 `[MIN_TARGET_FPS, MAX_TARGET_FPS]` 内。
pub fn clamp_fps(fps: i32) -> u32 {
    if fps < UNRELIABLE_FPS_BELOW {
        return DEFAULT_TARGET_FPS;
    }
    (fps as u32).clamp(MIN_TARGET_FPS, MAX_TARGET_FPS)
}

/// ### English
/// Target FPS for a reported refresh rate (round half up, then clamp).
///
/// ### 中文
/// 根据上报刷新率计算目标 FPS（四舍五入后限制范围）。
pub fn target_fps(refresh_rate: f32) -> u32 {
    if !refresh_rate.is_finite() {
        return DEFAULT_TARGET_FPS;
    }
    clamp_fps(refresh_rate.round() as i32)
}

/// ### English
/// Result of comparing a fresh refresh-rate reading against the baseline.
///
/// ### 中文
/// 新刷新率读数与基线的比较结果。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RateCheck {
    /// ### English
    /// No baseline yet; the reading should be adopted without a reinit.
    ///
    /// ### 中文
    /// 尚无基线；应直接采用该读数，不触发重建。
    NoBaseline,
    Steady,
    Switched { from: f32, to: f32 },
}

/// ### English
/// Last refresh rate used to compute the active target FPS.
///
/// ### 中文
/// 最近一次用于计算当前目标 FPS 的刷新率。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameRateBaseline {
    rate: Option<f32>,
}

impl FrameRateBaseline {
    pub fn get(&self) -> Option<f32> {
        self.rate
    }

    pub fn commit(&mut self, rate: f32) {
        self.rate = Some(rate);
    }

    pub fn clear(&mut self) {
        self.rate = None;
    }

    /// ### English
    /// Compares `current` with the baseline; a switch needs a difference strictly greater than
    /// `threshold_hz`. Does not modify the baseline.
    ///
    /// ### 中文
    /// 比较 `current` 与基线；差值严格大于 `threshold_hz` 才算切换。不会修改基线。
    pub fn check(&self, current: f32, threshold_hz: f32) -> RateCheck {
        match self.rate {
            None => RateCheck::NoBaseline,
            Some(baseline) if (current - baseline).abs() > threshold_hz => RateCheck::Switched {
                from: baseline,
                to: current,
            },
            Some(_) => RateCheck::Steady,
        }
    }
}

/// ### English
/// Picks the display mode to request: the largest 120 Hz-class mode if any, otherwise the
/// highest refresh rate. Earlier entries win ties.
///
/// ### 中文
/// 选择要请求的显示模式：若有 120 Hz 档则取面积最大者，否则取刷新率最高者；并列时先出现者优先。
pub fn select_display_mode(modes: &[DisplayMode]) -> Option<&DisplayMode> {
    let area = |mode: &DisplayMode| u64::from(mode.size.width) * u64::from(mode.size.height);

    let mut best: Option<&DisplayMode> = None;
    for mode in modes
        .iter()
        .filter(|mode| mode.refresh_rate >= HIGH_REFRESH_CLASS_HZ)
    {
        match best {
            Some(current) if area(mode) <= area(current) => {}
            _ => best = Some(mode),
        }
    }
    if best.is_some() {
        return best;
    }

    for mode in modes {
        match best {
            Some(current) if mode.refresh_rate <= current.refresh_rate => {}
            _ => best = Some(mode),
        }
    }
    best
}
