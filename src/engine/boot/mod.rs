//! ### English
//! Boot sequencing: phase tracking, the extraction decision, and the orchestrator.
//!
//! ### 中文
//! 启动流程：阶段跟踪、解压决策与编排器。

mod hints;
mod orchestrator;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

pub use hints::{HintStage, hint_at_checkpoint};
pub(crate) use hints::schedule_extraction_hints;
pub use orchestrator::{BootOrchestrator, BootPath, BootStart};

/// ### English
/// Boot phase of one app launch. Moves forward only; `Ready` and `Failed` are terminal.
///
/// ### 中文
/// 单次应用启动的引导阶段；只能前进，`Ready` 与 `Failed` 为终态。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum BootPhase {
    NotStarted = 0,
    Extracting = 1,
    InitializingRootfs = 2,
    WaitingForBoot = 3,
    Ready = 4,
    Failed = 5,
}

impl BootPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Extracting,
            2 => Self::InitializingRootfs,
            3 => Self::WaitingForBoot,
            4 => Self::Ready,
            _ => Self::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// ### English
/// How the wait phase ended.
///
/// ### 中文
/// 等待阶段的结束方式。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootOutcome {
    Ready,
    Failed,
}

/// ### English
/// State of one boot attempt shared between the UI thread and the boot workers.
///
/// ### 中文
/// 单次启动尝试的状态，由 UI 线程与启动工作线程共享。
#[derive(Debug)]
pub struct BootContext {
    phase: AtomicU8,
    /// ### English
    /// True while the extraction worker runs; only gates first-boot messaging.
    ///
    /// ### 中文
    /// 解压工作线程运行期间为 true；只影响首启提示，不影响正确性。
    extracting: AtomicBool,
}

impl Default for BootContext {
    fn default() -> Self {
        Self {
            phase: AtomicU8::new(BootPhase::NotStarted as u8),
            extracting: AtomicBool::new(false),
        }
    }
}

impl BootContext {
    pub fn phase(&self) -> BootPhase {
        BootPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// ### English
    /// Moves to `to` if it is strictly later and the current phase is not terminal.
    /// Returns whether the transition happened.
    ///
    /// ### 中文
    /// 若 `to` 严格晚于当前阶段且当前阶段非终态，则切换；返回是否切换成功。
    pub(crate) fn advance(&self, to: BootPhase) -> bool {
        let mut current = self.phase.load(Ordering::Acquire);
        loop {
            let from = BootPhase::from_u8(current);
            if from.is_terminal() || to <= from {
                return false;
            }
            match self.phase.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    log::info!("boot phase {from:?} -> {to:?}");
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    pub fn is_extracting(&self) -> bool {
        self.extracting.load(Ordering::Acquire)
    }

    pub(crate) fn set_extracting(&self, extracting: bool) {
        self.extracting.store(extracting, Ordering::Release);
    }
}

/// ### English
/// The four facts behind the extraction decision, also handed to the extractor.
///
/// ### 中文
/// 解压决策依据的四项事实，同时传给解压器。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractionFacts {
    pub rom_exists: bool,
    pub factory_updated: bool,
    pub force_reinstall: bool,
    pub use_third_party_rom: bool,
}

impl ExtractionFacts {
    /// ### English
    /// Extraction is skipped only for an existing rootfs with no forced reinstall, and either a
    /// third-party rootfs or an unchanged factory image.
    ///
    /// ### 中文
    /// 仅当 rootfs 已存在、未强制重装，且使用第三方 rootfs 或出厂镜像未更新时才跳过解压。
    pub fn requires_extraction(&self) -> bool {
        !self.rom_exists
            || self.force_reinstall
            || (!self.use_third_party_rom && self.factory_updated)
    }
}
