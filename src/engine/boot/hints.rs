//! ### English
//! Staged first-boot messaging shown while the root filesystem is extracted.
//!
//! ### 中文
//! 解压根文件系统期间分阶段显示的首启提示。

use std::sync::Arc;
use std::time::Duration;

use crate::engine::boot::BootContext;
use crate::engine::host::BootMessage;
use crate::engine::mailbox::{UiSender, UiTask};
use crate::engine::scheduler::{TaskScheduler, TimerHandle};

/// ### English
/// Delayed checkpoints after the immediate "extracting" message.
///
/// ### 中文
/// 紧随“正在解压”提示之后的延迟检查点。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HintStage {
    FirstBoot,
    StillWorking,
    AlmostDone,
}

impl HintStage {
    pub const ALL: [HintStage; 3] = [Self::FirstBoot, Self::StillWorking, Self::AlmostDone];

    pub fn message(self) -> BootMessage {
        match self {
            Self::FirstBoot => BootMessage::FirstBoot,
            Self::StillWorking => BootMessage::FirstBootStillWorking,
            Self::AlmostDone => BootMessage::FirstBootAlmostDone,
        }
    }
}

/// ### English
/// Message to show when `stage`'s checkpoint is reached, if extraction is still running.
///
/// ### 中文
/// 到达 `stage` 检查点时应显示的提示；仅当解压仍在进行时返回。
pub fn hint_at_checkpoint(stage: HintStage, extracting: bool) -> Option<BootMessage> {
    extracting.then(|| stage.message())
}

/// ### English
/// Arms one timer per checkpoint. Each timer checks the extraction flag when it fires and posts
/// the hint to the UI thread only if extraction is still in progress.
///
/// ### 中文
/// 为每个检查点设置一个计时器；计时器触发时检查解压标记，仅在解压仍在进行时向 UI 线程投递提示。
pub(crate) fn schedule_extraction_hints(
    scheduler: &TaskScheduler,
    ctx: &Arc<BootContext>,
    sender: &UiSender,
    delays: [Duration; 3],
) -> Vec<TimerHandle> {
    HintStage::ALL
        .into_iter()
        .zip(delays)
        .map(|(stage, delay)| {
            let ctx = ctx.clone();
            let sender = sender.clone();
            scheduler.schedule(delay, move || {
                if hint_at_checkpoint(stage, ctx.is_extracting()).is_some() {
                    sender.post(UiTask::ExtractionHint(stage));
                }
            })
        })
        .collect()
}
