//! ### English
//! Error types returned across the host boundary.
//!
//! Each seam gets its own type so callers can decide per call whether to absorb or escalate.
//!
//! ### 中文
//! 跨宿主边界返回的错误类型。
//!
//! 每个边界使用独立的错误类型，调用方可以逐个调用决定吸收还是上抛。

use std::io;
use std::time::Duration;

use thiserror::Error;

/// ### English
/// Renderer command that failed.
///
/// ### 中文
/// 失败的渲染器命令。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererOp {
    Init,
    RemoveWindow,
    ResetWindow,
    Repaint,
}

/// ### English
/// A renderer command reported failure.
///
/// ### 中文
/// 渲染器命令报告失败。
#[derive(Debug, Error)]
#[error("renderer {op:?} failed: {reason}")]
pub struct RendererError {
    pub op: RendererOp,
    pub reason: String,
}

impl RendererError {
    pub fn new(op: RendererOp, reason: impl Into<String>) -> Self {
        Self {
            op,
            reason: reason.into(),
        }
    }
}

/// ### English
/// Root-filesystem collaborator failures.
///
/// ### 中文
/// 根文件系统协作方的失败。
#[derive(Debug, Error)]
pub enum RootfsError {
    #[error("rootfs extraction failed: {0}")]
    Extract(String),
    #[error("rootfs init failed: {0}")]
    Init(String),
}

/// ### English
/// The status beacon could not answer a wait.
///
/// ### 中文
/// 状态信标无法完成等待。
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status beacon closed while waiting")]
    Closed,
    #[error("status beacon unavailable: {0}")]
    Unavailable(String),
}

/// ### English
/// Why the boot wait did not end in `Ready`.
///
/// ### 中文
/// 启动等待未进入 `Ready` 的原因。
#[derive(Debug, Error)]
pub enum BootError {
    #[error("virtualized system did not report ready within {0:?}")]
    Timeout(Duration),
    #[error("boot wait aborted: {0}")]
    Wait(#[from] StatusError),
}

/// ### English
/// Timer/worker thread failures.
///
/// ### 中文
/// 计时/工作线程相关的失败。
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}
