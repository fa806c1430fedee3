//! ### English
//! C ABI bindings for controller lifecycle (create/destroy, screen lifecycle, dispatch).
//!
//! ### 中文
//! 控制器生命周期相关的 C ABI 绑定（create/destroy、界面生命周期、dispatch）。

use log::{error, warn};

use super::host::TwoyiHostCallbacks;
use super::{TwoyiDisplay, TwoyiDisplayTuning, TwoyiStatus};
use crate::engine::{BootConfig, BootPath, BootStart, DisplayController, Tuning};

#[unsafe(no_mangle)]
/// ### English
/// Installs the `env_logger` backend for the `log` facade. Safe to call more than once.
///
/// Filtering follows `RUST_LOG`; defaults to `info`.
///
/// ### 中文
/// 为 `log` 门面安装 `env_logger` 后端；可重复调用。
///
/// 过滤规则遵循 `RUST_LOG`，默认 `info`。
pub extern "C" fn twoyi_display_init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[unsafe(no_mangle)]
/// ### English
/// Creates a controller for one screen. Must be called on the host UI thread.
///
/// `status` must stay valid until this display is destroyed. `callbacks` is copied.
/// `tuning` may be NULL (all defaults). Returns NULL if a pointer is NULL, a required callback
/// is missing, or the timer thread cannot be spawned.
///
/// ### 中文
/// 为一个界面创建控制器；须在宿主 UI 线程调用。
///
/// `status` 在该 display 销毁前必须保持有效；`callbacks` 会被复制。`tuning` 可为 NULL（全部默认）。
/// 若指针为 NULL、缺少必填回调或无法创建计时线程，则返回 NULL。
pub unsafe extern "C" fn twoyi_display_create(
    status: *const TwoyiStatus,
    callbacks: *const TwoyiHostCallbacks,
    tuning: *const TwoyiDisplayTuning,
) -> *mut TwoyiDisplay {
    if status.is_null() || callbacks.is_null() {
        return std::ptr::null_mut();
    }

    let callbacks = unsafe { *callbacks };
    if let Some(name) = callbacks.missing_required() {
        warn!("twoyi_display_create: required callback `{name}` is NULL");
        return std::ptr::null_mut();
    }

    let tuning = match unsafe { tuning.as_ref() } {
        Some(raw) => Tuning::from(raw),
        None => Tuning::default(),
    };
    let beacon = unsafe { (*status).beacon.clone() };

    match DisplayController::new(callbacks.into_bindings(beacon), tuning) {
        Ok(controller) => Box::into_raw(Box::new(TwoyiDisplay { controller })),
        Err(err) => {
            error!("twoyi_display_create: {err}");
            std::ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a display created by `twoyi_display_create`.
///
/// Stops the pump, cancels the watchdog and joins the timer thread. Boot worker threads that are
/// still running finish on their own; their results are dropped.
///
/// ### 中文
/// 销毁由 `twoyi_display_create` 创建的 display。
///
/// 会停止泵、取消看门狗并 join 计时线程；仍在运行的启动工作线程会自行结束，其结果被丢弃。
pub unsafe extern "C" fn twoyi_display_destroy(display: *mut TwoyiDisplay) {
    if display.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(display));
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Screen creation. Returns `0` for a fresh start, `1` if the system was already running and the
/// screen was redirected (finished + reboot requested), `-1` for a NULL handle.
///
/// ### 中文
/// 界面创建。新启动返回 `0`；系统已在运行并已重定向（结束界面 + 请求重启）返回 `1`；
/// 句柄为 NULL 返回 `-1`。
pub unsafe extern "C" fn twoyi_display_on_create(display: *mut TwoyiDisplay) -> i32 {
    if display.is_null() {
        return -1;
    }
    match unsafe { (*display).controller.on_create() } {
        BootStart::Started => 0,
        BootStart::Redirected => 1,
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Starts the boot flow with `TWOYI_BOOT_FLAG_*` bits.
///
/// Returns `1` for the direct path, `2` when extraction runs first, `0` if ignored (no successful
/// `twoyi_display_on_create`, a redirect, already started for this screen, or NULL handle).
///
/// ### 中文
/// 以 `TWOYI_BOOT_FLAG_*` 位启动引导流程。
///
/// 直接路径返回 `1`；需要先解压返回 `2`；被忽略（未成功调用 `twoyi_display_on_create`、已重定向、
/// 本界面已启动或句柄为 NULL）返回 `0`。
pub unsafe extern "C" fn twoyi_display_boot_system(display: *mut TwoyiDisplay, flags: u32) -> u32 {
    if display.is_null() {
        return 0;
    }
    match unsafe { (*display).controller.boot_system(BootConfig::from_flags(flags)) } {
        Some(BootPath::Direct) => 1,
        Some(BootPath::Extracting) => 2,
        None => 0,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn twoyi_display_on_resume(display: *mut TwoyiDisplay) {
    if display.is_null() {
        return;
    }
    unsafe { (*display).controller.on_resume() };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn twoyi_display_on_pause(display: *mut TwoyiDisplay) {
    if display.is_null() {
        return;
    }
    unsafe { (*display).controller.on_pause() };
}

#[unsafe(no_mangle)]
/// ### English
/// Window focus changed; also forwarded to the status beacon as visibility.
///
/// ### 中文
/// 窗口焦点变化；同时作为可见性转发给状态信标。
pub unsafe extern "C" fn twoyi_display_on_window_focus_changed(
    display: *mut TwoyiDisplay,
    has_focus: bool,
) {
    if display.is_null() {
        return;
    }
    unsafe { (*display).controller.on_window_focus_changed(has_focus) };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn twoyi_display_on_restore_instance_state(display: *mut TwoyiDisplay) {
    if display.is_null() {
        return;
    }
    unsafe { (*display).controller.on_restore_instance_state() };
}

#[unsafe(no_mangle)]
/// ### English
/// Applies work posted by background threads. Call on the UI thread whenever the `wake`
/// callback fires. Returns the number of tasks applied.
///
/// ### 中文
/// 应用后台线程投递的工作。每当 `wake` 回调触发时在 UI 线程调用；返回处理的任务数。
pub unsafe extern "C" fn twoyi_display_dispatch(display: *mut TwoyiDisplay) -> u32 {
    if display.is_null() {
        return 0;
    }
    let applied = unsafe { (*display).controller.dispatch() };
    u32::try_from(applied).unwrap_or(u32::MAX)
}

#[unsafe(no_mangle)]
/// ### English
/// Current boot phase as its `BootPhase` discriminant (0..=5); `0` for NULL.
///
/// ### 中文
/// 当前启动阶段的 `BootPhase` 判别值（0..=5）；NULL 返回 `0`。
pub unsafe extern "C" fn twoyi_display_boot_phase(display: *const TwoyiDisplay) -> u32 {
    if display.is_null() {
        return 0;
    }
    unsafe { (*display).controller.phase() as u32 }
}
