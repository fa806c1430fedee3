//! ### English
//! Timer thread for delayed and periodic work (watchdog ticks, first-boot hints).
//!
//! Callbacks run on the timer thread and must not touch UI-owned state; they only post to the
//! UI mailbox.
//!
//! ### 中文
//! 用于延迟与周期任务（watchdog tick、首启提示）的计时线程。
//!
//! 回调在计时线程执行，不得触碰 UI 持有的状态；只能向 UI 邮箱投递任务。

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering},
};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as channel;
use log::{debug, warn};

use crate::engine::error::SchedulerError;

type TimerCallback = Box<dyn FnMut() + Send + 'static>;

/// ### English
/// Cancellation handle for one scheduled task.
///
/// Dropping the handle does not cancel the task.
///
/// ### 中文
/// 单个计划任务的取消句柄。
///
/// drop 句柄不会取消任务。
#[derive(Clone, Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    /// ### English
    /// Cancels the task. Takes effect immediately, even for a task that is already due.
    ///
    /// ### 中文
    /// 取消该任务；立即生效，即使任务已到期也不会再执行。
    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Acquire)
    }
}

struct ScheduledTask {
    /// ### English
    /// Target time when the callback should run.
    ///
    /// ### 中文
    /// 回调应执行的目标时间。
    deadline: Instant,
    /// ### English
    /// Monotonic sequence used as a tiebreaker in the heap.
    ///
    /// ### 中文
    /// 在堆中用作平局判定的单调序号。
    seq: u64,
    /// ### English
    /// Re-arm interval for periodic tasks (`None` = one-shot).
    ///
    /// ### 中文
    /// 周期任务的重新调度间隔（`None` = 一次性）。
    period: Option<Duration>,
    cancelled: Arc<AtomicBool>,
    callback: TimerCallback,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    /// ### English
    /// Reversed ordering so earlier deadlines have higher priority in a max-heap.
    ///
    /// ### 中文
    /// 反转排序：在最大堆中让更早的 deadline 拥有更高优先级。
    fn cmp(&self, other: &Self) -> Ordering {
        match other.deadline.cmp(&self.deadline) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

enum SchedulerMsg {
    Schedule(ScheduledTask),
    Shutdown,
}

/// ### English
/// Single-thread timer shared by every delayed task of one controller.
///
/// ### 中文
/// 单线程计时器，由同一控制器的所有延迟任务共享。
pub struct TaskScheduler {
    /// ### English
    /// Channel sender into the timer thread.
    ///
    /// ### 中文
    /// 向计时线程发送任务的 channel sender。
    tx: channel::Sender<SchedulerMsg>,
    next_seq: AtomicU64,
    /// ### English
    /// Join handle for the timer thread (taken on Drop for clean shutdown).
    ///
    /// ### 中文
    /// 计时线程的 JoinHandle，Drop 时获取以便干净退出。
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl TaskScheduler {
    /// ### English
    /// Spawns the timer thread.
    ///
    /// ### 中文
    /// 创建计时线程。
    pub fn new() -> Result<Arc<Self>, SchedulerError> {
        let (tx, rx) = channel::unbounded::<SchedulerMsg>();
        let thread = thread::Builder::new()
            .name("TwoyiTimer".to_string())
            .spawn(move || run_scheduler(rx))
            .map_err(|source| SchedulerError::Spawn {
                name: "TwoyiTimer",
                source,
            })?;

        Ok(Arc::new(TaskScheduler {
            tx,
            next_seq: AtomicU64::new(1),
            thread: Mutex::new(Some(thread)),
        }))
    }

    /// ### English
    /// Runs `callback` once after `delay`.
    ///
    /// ### 中文
    /// 在 `delay` 之后执行一次 `callback`。
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callback = Some(callback);
        self.submit(
            delay,
            None,
            Box::new(move || {
                if let Some(callback) = callback.take() {
                    callback();
                }
            }),
        )
    }

    /// ### English
    /// Runs `callback` every `interval` (first run after one interval) until cancelled.
    ///
    /// The next run is armed `interval` after the previous one finished, so a slow callback
    /// never produces a backlog.
    ///
    /// ### 中文
    /// 每隔 `interval` 执行一次 `callback`（首次在一个间隔后），直到被取消。
    ///
    /// 下一次在上一次执行结束后再等待 `interval`，因此慢回调不会造成积压。
    pub fn schedule_repeating<F>(&self, interval: Duration, callback: F) -> TimerHandle
    where
        F: FnMut() + Send + 'static,
    {
        self.submit(interval, Some(interval), Box::new(callback))
    }

    fn submit(&self, delay: Duration, period: Option<Duration>, callback: TimerCallback) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let task = ScheduledTask {
            deadline: Instant::now() + delay,
            seq,
            period,
            cancelled: cancelled.clone(),
            callback,
        };
        if self.tx.send(SchedulerMsg::Schedule(task)).is_err() {
            warn!("timer thread is gone; task {seq} dropped");
            cancelled.store(true, AtomicOrdering::Release);
        }
        TimerHandle { cancelled }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        let Ok(mut guard) = self.thread.lock() else {
            return;
        };
        if let Some(join) = guard.take() {
            let _ = self.tx.send(SchedulerMsg::Shutdown);
            if thread::current().id() != join.thread().id() {
                let _ = join.join();
            }
        }
    }
}

fn run_scheduler(rx: channel::Receiver<SchedulerMsg>) {
    let mut queue: BinaryHeap<ScheduledTask> = BinaryHeap::new();

    loop {
        while queue
            .peek()
            .is_some_and(|next| next.deadline <= Instant::now())
        {
            let Some(mut task) = queue.pop() else {
                break;
            };
            if task.cancelled.load(AtomicOrdering::Acquire) {
                continue;
            }
            (task.callback)();

            if let Some(period) = task.period
                && !task.cancelled.load(AtomicOrdering::Acquire)
            {
                task.deadline = Instant::now() + period;
                queue.push(task);
            }
        }

        let timeout = queue
            .peek()
            .map(|task| task.deadline.saturating_duration_since(Instant::now()));

        let msg = match timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(msg) => Some(msg),
                Err(channel::RecvTimeoutError::Timeout) => None,
                Err(channel::RecvTimeoutError::Disconnected) => return,
            },
            None => match rx.recv() {
                Ok(msg) => Some(msg),
                Err(channel::RecvError) => return,
            },
        };

        match msg {
            Some(SchedulerMsg::Schedule(task)) => queue.push(task),
            Some(SchedulerMsg::Shutdown) => {
                debug!("timer thread shutting down with {} pending task(s)", queue.len());
                return;
            }
            None => {}
        }
    }
}
