//! ### English
//! Handoff from worker/timer threads back to the UI-owning thread.
//!
//! ### 中文
//! 从工作线程/计时线程回到持有 UI 的线程的交接通道。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel as channel;

use crate::engine::boot::{BootOutcome, HintStage};
use crate::engine::host::UiWaker;

/// ### English
/// Work that must run on the UI-owning thread.
///
/// ### 中文
/// 必须在持有 UI 的线程上执行的工作。
#[derive(Debug, PartialEq)]
pub(crate) enum UiTask {
    /// ### English
    /// Periodic refresh-rate check; stale generations are ignored.
    ///
    /// ### 中文
    /// 周期性刷新率检查；过期 generation 会被忽略。
    WatchdogTick { generation: u64 },
    ExtractionHint(HintStage),
    /// ### English
    /// Extraction and rootfs init finished on the worker thread.
    ///
    /// ### 中文
    /// 解压与 rootfs 初始化已在工作线程完成。
    RootfsReady,
    BootSettled(BootOutcome),
}

/// ### English
/// Cloneable, thread-safe sender half of the UI mailbox.
///
/// ### 中文
/// UI 邮箱的可克隆、线程安全发送端。
#[derive(Clone)]
pub(crate) struct UiSender {
    tx: channel::Sender<UiTask>,
    /// ### English
    /// Coalesced wake flag to avoid waking the host once per task on bursts.
    ///
    /// ### 中文
    /// 合并唤醒标记：突发投递时避免每个任务都唤醒宿主一次。
    wake_pending: Arc<AtomicBool>,
    waker: Arc<dyn UiWaker>,
}

impl UiSender {
    /// ### English
    /// Posts one task; returns `false` if the mailbox is gone (controller destroyed).
    ///
    /// ### 中文
    /// 投递一个任务；若邮箱已销毁（控制器已释放）则返回 `false`。
    pub(crate) fn post(&self, task: UiTask) -> bool {
        if self.tx.send(task).is_err() {
            return false;
        }
        if !self.wake_pending.swap(true, Ordering::AcqRel) {
            self.waker.wake();
        }
        true
    }
}

/// ### English
/// Receiver half, owned by the controller on the UI thread.
///
/// ### 中文
/// 接收端，由 UI 线程上的控制器持有。
pub(crate) struct UiMailbox {
    rx: channel::Receiver<UiTask>,
    sender: UiSender,
}

impl UiMailbox {
    pub(crate) fn new(waker: Arc<dyn UiWaker>) -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            rx,
            sender: UiSender {
                tx,
                wake_pending: Arc::new(AtomicBool::new(false)),
                waker,
            },
        }
    }

    pub(crate) fn sender(&self) -> UiSender {
        self.sender.clone()
    }

    /// ### English
    /// Drains every task queued so far.
    ///
    /// The wake flag is cleared first so a task posted during the drain wakes the host again.
    ///
    /// ### 中文
    /// 取出目前已排队的全部任务。
    ///
    /// 先清除唤醒标记，使 drain 期间投递的任务能再次唤醒宿主。
    pub(crate) fn drain(&self) -> Vec<UiTask> {
        self.sender.wake_pending.store(false, Ordering::Release);
        self.rx.try_iter().collect()
    }
}
