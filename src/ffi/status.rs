//! ### English
//! C ABI bindings for the process-wide readiness beacon.
//!
//! ### 中文
//! 进程级就绪信标相关的 C ABI 绑定。

use std::ffi::c_void;
use std::sync::Arc;

use super::TwoyiStatus;
use crate::engine::{ReadinessBeacon, StatusBeacon};

type VisibilityCallback = unsafe extern "C" fn(user_data: *mut c_void, visible: bool);

/// ### English
/// `user_data` of the visibility callback, carried onto whichever thread reports focus.
///
/// ### 中文
/// 可见性回调的 `user_data`，随焦点上报被带到任意线程。
struct ListenerData(*mut c_void);

// SAFETY: the host promises the visibility callback and its `user_data` are thread-safe.
unsafe impl Send for ListenerData {}
unsafe impl Sync for ListenerData {}

impl ListenerData {
    fn get(&self) -> *mut c_void {
        self.0
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Creates the process-wide beacon.
///
/// `on_visibility` (may be NULL) receives foreground/background transitions for the virtualized
/// system and may be called from any thread.
///
/// ### 中文
/// 创建进程级信标。
///
/// `on_visibility`（可为 NULL）接收虚拟系统的前后台切换，可能在任意线程调用。
pub extern "C" fn twoyi_status_create(
    on_visibility: Option<VisibilityCallback>,
    user_data: *mut c_void,
) -> *mut TwoyiStatus {
    let listener = on_visibility.map(|callback| {
        let data = ListenerData(user_data);
        Box::new(move |visible: bool| unsafe { callback(data.get(), visible) })
            as Box<dyn Fn(bool) + Send + Sync>
    });

    Box::into_raw(Box::new(TwoyiStatus {
        beacon: Arc::new(ReadinessBeacon::new(listener)),
    }))
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a beacon. Every display created with it must be destroyed first.
///
/// ### 中文
/// 销毁信标；使用它创建的所有 display 必须先销毁。
pub unsafe extern "C" fn twoyi_status_destroy(status: *mut TwoyiStatus) {
    if status.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(status));
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Boot-completion signal from the virtualized system. Any thread.
///
/// ### 中文
/// 来自虚拟系统的启动完成信号；可在任意线程调用。
pub unsafe extern "C" fn twoyi_status_mark_booted(status: *const TwoyiStatus) {
    if status.is_null() {
        return;
    }
    unsafe { (*status).beacon.mark_booted() };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn twoyi_status_is_started(status: *const TwoyiStatus) -> bool {
    if status.is_null() {
        return false;
    }
    unsafe { (*status).beacon.is_started() }
}
