//! ### English
//! Process-wide readiness beacon for the virtualized system.
//!
//! The embedder creates one beacon per process and hands it to every controller it creates, so
//! "already started" survives screen re-creation without living in a global.
//!
//! ### 中文
//! 虚拟系统的进程级就绪信标。
//!
//! 宿主每个进程创建一个信标并传给它创建的每个控制器，使“已启动”状态能跨界面重建保留，
//! 而不必放在全局变量中。

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as channel;
use log::info;

use crate::engine::error::StatusError;
use crate::engine::host::StatusBeacon;

type VisibilityListener = Box<dyn Fn(bool) + Send + Sync + 'static>;

/// ### English
/// One boot attempt's gate: the sender is dropped on boot completion, which wakes every waiter
/// blocked on a receiver clone at once.
///
/// ### 中文
/// 单次启动尝试的闸门：启动完成时 drop sender，使所有阻塞在 receiver 克隆上的等待者同时被唤醒。
struct BootGate {
    tx: Option<channel::Sender<()>>,
    rx: channel::Receiver<()>,
}

impl BootGate {
    fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        Self { tx: Some(tx), rx }
    }
}

pub struct ReadinessBeacon {
    started: AtomicBool,
    visible: AtomicBool,
    gate: Mutex<BootGate>,
    /// ### English
    /// Forwards foreground/background transitions to the virtualized system.
    ///
    /// ### 中文
    /// 将前后台切换转发给虚拟系统。
    on_visibility: Option<VisibilityListener>,
}

impl Default for ReadinessBeacon {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ReadinessBeacon {
    pub fn new(on_visibility: Option<VisibilityListener>) -> Self {
        Self {
            started: AtomicBool::new(false),
            visible: AtomicBool::new(false),
            gate: Mutex::new(BootGate::new()),
            on_visibility,
        }
    }

    /// ### English
    /// Boot-completion signal: marks the system started and releases all waiters.
    ///
    /// ### 中文
    /// 启动完成信号：标记系统已启动并释放所有等待者。
    pub fn mark_booted(&self) {
        self.started.store(true, Ordering::Release);
        if let Ok(mut gate) = self.gate.lock() {
            gate.tx.take();
        }
        info!("virtualized system reported boot completion");
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }
}

impl StatusBeacon for ReadinessBeacon {
    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.started.store(false, Ordering::Release);
        if let Ok(mut gate) = self.gate.lock() {
            *gate = BootGate::new();
        }
    }

    fn wait_boot(&self, timeout: Duration) -> Result<bool, StatusError> {
        if self.is_started() {
            return Ok(true);
        }

        let rx = self
            .gate
            .lock()
            .map_err(|_| StatusError::Unavailable("boot gate lock poisoned".to_string()))?
            .rx
            .clone();

        match rx.recv_timeout(timeout) {
            Ok(()) => Ok(self.is_started()),
            Err(channel::RecvTimeoutError::Timeout) => Ok(self.is_started()),
            Err(channel::RecvTimeoutError::Disconnected) if self.is_started() => Ok(true),
            // Gate replaced by `reset()` while waiting.
            Err(channel::RecvTimeoutError::Disconnected) => Err(StatusError::Closed),
        }
    }

    fn update_visibility(&self, has_focus: bool) {
        self.visible.store(has_focus, Ordering::Release);
        if let Some(listener) = &self.on_visibility {
            listener(has_focus);
        }
    }
}
