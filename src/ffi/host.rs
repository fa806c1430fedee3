//! ### English
//! Host callback table and its adapter onto the engine's boundary traits.
//!
//! Every callback receives `user_data` as its first argument. The renderer, display, frame clock
//! and boot UI callbacks are invoked only on the UI thread that owns the `TwoyiDisplay`. The
//! rootfs, telemetry, process and wake callbacks are tagged "any thread": they may run on the UI
//! thread or on the `extract-rom`, `waiting-boot` and `TwoyiTimer` threads, and `user_data` must
//! tolerate that.
//!
//! Status-returning callbacks use `0` for success and any other value for failure.
//!
//! ### 中文
//! 宿主回调表及其到引擎边界 trait 的适配器。
//!
//! 每个回调的第一个参数都是 `user_data`。渲染器、显示、帧时钟与启动界面回调只会在持有
//! `TwoyiDisplay` 的 UI 线程上调用。rootfs、遥测、进程与唤醒回调标注为“任意线程”：它们可能在
//! UI 线程或 `extract-rom`、`waiting-boot`、`TwoyiTimer` 线程上运行，`user_data` 须能承受这一点。
//!
//! 返回状态码的回调以 `0` 表示成功，其他值表示失败。

use std::ffi::{CString, c_char, c_void};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use dpi::{PhysicalPosition, PhysicalSize};
use log::warn;

use super::{TwoyiDisplayMode, TwoyiTouchEvent};
use crate::engine::{
    BootMessage, BootUi, DisplayDensity, DisplayHost, DisplayMode, ExtractionFacts, FrameClock,
    HostBindings, ProcessControl, Renderer, RendererError, RendererOp, RootfsError, RootfsManager,
    StatusBeacon, SurfaceHandle, Telemetry, TouchEvent, UiWaker,
};

type Notify = Option<unsafe extern "C" fn(user_data: *mut c_void)>;
type Query = Option<unsafe extern "C" fn(user_data: *mut c_void) -> bool>;
type Status = Option<unsafe extern "C" fn(user_data: *mut c_void) -> i32>;

/// ### English
/// Loader path buffer size tried first; the callback reports the real length if it is larger.
///
/// ### 中文
/// 首次尝试的 loader 路径缓冲区大小；若更长，回调会报告实际长度。
const LOADER_PATH_BUF: usize = 512;

#[repr(C)]
#[derive(Clone, Copy)]
/// ### English
/// Host callbacks. `renderer_init`, `renderer_repaint`, `display_refresh_rate`,
/// `post_frame_callback` and `wake` are required; the rest may be NULL.
///
/// ### 中文
/// 宿主回调。`renderer_init`、`renderer_repaint`、`display_refresh_rate`、`post_frame_callback`
/// 与 `wake` 为必填，其余可为 NULL。
pub struct TwoyiHostCallbacks {
    pub user_data: *mut c_void,

    pub renderer_init: Option<
        unsafe extern "C" fn(
            user_data: *mut c_void,
            surface: *mut c_void,
            loader_path: *const c_char,
            xdpi: f32,
            ydpi: f32,
            fps: u32,
        ) -> i32,
    >,
    pub renderer_remove_window:
        Option<unsafe extern "C" fn(user_data: *mut c_void, surface: *mut c_void) -> i32>,
    pub renderer_reset_window: Option<
        unsafe extern "C" fn(
            user_data: *mut c_void,
            surface: *mut c_void,
            x: i32,
            y: i32,
            width: u32,
            height: u32,
        ) -> i32,
    >,
    pub renderer_repaint: Status,
    pub renderer_handle_touch:
        Option<unsafe extern "C" fn(user_data: *mut c_void, event: *const TwoyiTouchEvent)>,
    pub renderer_send_keycode: Option<unsafe extern "C" fn(user_data: *mut c_void, code: i32)>,

    pub display_refresh_rate: Option<unsafe extern "C" fn(user_data: *mut c_void) -> f32>,
    pub display_density:
        Option<unsafe extern "C" fn(user_data: *mut c_void, xdpi: *mut f32, ydpi: *mut f32)>,
    /// ### English
    /// Writes up to `capacity` modes into `out` and returns the total count.
    /// Called with `out = NULL, capacity = 0` to query the count.
    ///
    /// ### 中文
    /// 向 `out` 写入至多 `capacity` 个模式并返回总数；以 `out = NULL, capacity = 0` 调用用于查询数量。
    pub display_supported_modes: Option<
        unsafe extern "C" fn(
            user_data: *mut c_void,
            out: *mut TwoyiDisplayMode,
            capacity: u32,
        ) -> u32,
    >,
    pub display_request_mode: Option<unsafe extern "C" fn(user_data: *mut c_void, mode_id: i32)>,
    pub display_release_surface:
        Option<unsafe extern "C" fn(user_data: *mut c_void, surface: *mut c_void)>,

    pub post_frame_callback: Notify,
    pub remove_frame_callback: Notify,

    pub show_loading: Notify,
    /// ### English
    /// `message` is a `BootMessage` discriminant (0..=3).
    ///
    /// ### 中文
    /// `message` 为 `BootMessage` 的判别值（0..=3）。
    pub set_loading_message: Option<unsafe extern "C" fn(user_data: *mut c_void, message: u32)>,
    pub show_boot_log: Notify,
    pub attach_surface_view: Notify,
    pub reveal_display: Notify,
    pub show_boot_failure_notice: Notify,

    /// ### English
    /// Any thread. Every callback from here to the end of the table may be called from any
    /// thread.
    ///
    /// ### 中文
    /// 任意线程；从此处到回调表末尾的所有回调都可能在任意线程调用。
    pub rom_exist: Query,
    /// ### English
    /// Any thread.
    ///
    /// ### 中文
    /// 任意线程。
    pub needs_upgrade: Query,
    /// ### English
    /// Any thread; blocking.
    ///
    /// ### 中文
    /// 任意线程；阻塞调用。
    pub extract_rootfs: Option<
        unsafe extern "C" fn(
            user_data: *mut c_void,
            rom_exists: bool,
            factory_updated: bool,
            force_reinstall: bool,
            use_third_party_rom: bool,
        ) -> i32,
    >,
    /// ### English
    /// Any thread; runs on `extract-rom` after extraction.
    ///
    /// ### 中文
    /// 任意线程；解压结束后在 `extract-rom` 上运行。
    pub init_rootfs: Status,
    /// ### English
    /// Any thread. Writes the NUL-terminated loader path into `buf` (at most `capacity` bytes)
    /// and returns the path length without the NUL.
    ///
    /// ### 中文
    /// 任意线程。将 NUL 结尾的 loader 路径写入 `buf`（至多 `capacity` 字节），返回不含 NUL 的路径长度。
    pub loader_path:
        Option<unsafe extern "C" fn(user_data: *mut c_void, buf: *mut c_char, capacity: u32) -> u32>,
    /// ### English
    /// Any thread.
    ///
    /// ### 中文
    /// 任意线程。
    pub reboot: Notify,

    /// ### English
    /// Any thread; a stuck boot reports from `waiting-boot`.
    ///
    /// ### 中文
    /// 任意线程；启动卡死时在 `waiting-boot` 上报告。
    pub track_boot_failure: Notify,
    /// ### English
    /// Any thread; a stuck boot finishes the screen from `waiting-boot`.
    ///
    /// ### 中文
    /// 任意线程；启动卡死时在 `waiting-boot` 上结束界面。
    pub finish_screen: Notify,
    /// ### English
    /// Any thread. NULL means `std::process::exit`.
    ///
    /// ### 中文
    /// 任意线程；为 NULL 时使用 `std::process::exit`。
    pub terminate: Option<unsafe extern "C" fn(user_data: *mut c_void, code: i32)>,
    /// ### English
    /// Any thread. Must post a call to `twoyi_display_dispatch` onto the UI thread.
    ///
    /// ### 中文
    /// 任意线程；须向 UI 线程投递一次 `twoyi_display_dispatch` 调用。
    pub wake: Notify,
}

impl TwoyiHostCallbacks {
    pub(super) fn missing_required(&self) -> Option<&'static str> {
        if self.renderer_init.is_none() {
            return Some("renderer_init");
        }
        if self.renderer_repaint.is_none() {
            return Some("renderer_repaint");
        }
        if self.display_refresh_rate.is_none() {
            return Some("display_refresh_rate");
        }
        if self.post_frame_callback.is_none() {
            return Some("post_frame_callback");
        }
        if self.wake.is_none() {
            return Some("wake");
        }
        None
    }

    /// ### English
    /// Builds engine bindings around this table; `status` is the process-wide beacon.
    ///
    /// ### 中文
    /// 基于该回调表构建引擎绑定；`status` 为进程级信标。
    pub(super) fn into_bindings(self, status: Arc<dyn StatusBeacon>) -> HostBindings {
        let local = Rc::new(FfiHost { callbacks: self });
        let shared = Arc::new(FfiHost { callbacks: self });
        HostBindings {
            renderer: local.clone(),
            display: local.clone(),
            frame_clock: local.clone(),
            ui: local,
            rootfs: shared.clone(),
            status,
            telemetry: shared.clone(),
            process: shared.clone(),
            waker: shared,
        }
    }
}

struct FfiHost {
    callbacks: TwoyiHostCallbacks,
}

// SAFETY: the `Arc` copy only ever calls the rootfs, telemetry, process and wake callbacks, all
// tagged "any thread", and the host guarantees those and `user_data` tolerate concurrent use.
// Renderer, display, frame clock and boot UI callbacks are reached only through the `Rc` copy.
unsafe impl Send for FfiHost {}
unsafe impl Sync for FfiHost {}

impl FfiHost {
    fn notify(&self, callback: Notify) {
        if let Some(callback) = callback {
            unsafe { callback(self.callbacks.user_data) };
        }
    }

    fn query(&self, callback: Query) -> bool {
        callback.is_some_and(|callback| unsafe { callback(self.callbacks.user_data) })
    }

    fn surface_ptr(surface: SurfaceHandle) -> *mut c_void {
        surface.as_raw() as *mut c_void
    }
}

fn renderer_status(op: RendererOp, code: i32) -> Result<(), RendererError> {
    if code == 0 {
        Ok(())
    } else {
        Err(RendererError::new(op, format!("host returned {code}")))
    }
}

fn missing(op: RendererOp) -> RendererError {
    RendererError::new(op, "host callback not provided")
}

impl Renderer for FfiHost {
    fn init(
        &self,
        surface: SurfaceHandle,
        loader_path: &Path,
        density: DisplayDensity,
        fps: u32,
    ) -> Result<(), RendererError> {
        let callback = self
            .callbacks
            .renderer_init
            .ok_or_else(|| missing(RendererOp::Init))?;
        let loader = loader_path
            .to_str()
            .and_then(|path| CString::new(path).ok())
            .ok_or_else(|| RendererError::new(RendererOp::Init, "loader path is not a C string"))?;

        let code = unsafe {
            callback(
                self.callbacks.user_data,
                Self::surface_ptr(surface),
                loader.as_ptr(),
                density.xdpi,
                density.ydpi,
                fps,
            )
        };
        renderer_status(RendererOp::Init, code)
    }

    fn remove_window(&self, surface: SurfaceHandle) -> Result<(), RendererError> {
        let Some(callback) = self.callbacks.renderer_remove_window else {
            return Ok(());
        };
        let code = unsafe { callback(self.callbacks.user_data, Self::surface_ptr(surface)) };
        renderer_status(RendererOp::RemoveWindow, code)
    }

    fn reset_window(
        &self,
        surface: SurfaceHandle,
        origin: PhysicalPosition<i32>,
        size: PhysicalSize<u32>,
    ) -> Result<(), RendererError> {
        let callback = self
            .callbacks
            .renderer_reset_window
            .ok_or_else(|| missing(RendererOp::ResetWindow))?;
        let code = unsafe {
            callback(
                self.callbacks.user_data,
                Self::surface_ptr(surface),
                origin.x,
                origin.y,
                size.width,
                size.height,
            )
        };
        renderer_status(RendererOp::ResetWindow, code)
    }

    fn repaint(&self) -> Result<(), RendererError> {
        let callback = self
            .callbacks
            .renderer_repaint
            .ok_or_else(|| missing(RendererOp::Repaint))?;
        let code = unsafe { callback(self.callbacks.user_data) };
        renderer_status(RendererOp::Repaint, code)
    }

    fn handle_touch(&self, event: &TouchEvent) {
        if let Some(callback) = self.callbacks.renderer_handle_touch {
            let c_event = TwoyiTouchEvent::from(event);
            unsafe { callback(self.callbacks.user_data, &c_event) };
        }
    }

    fn send_keycode(&self, code: i32) {
        if let Some(callback) = self.callbacks.renderer_send_keycode {
            unsafe { callback(self.callbacks.user_data, code) };
        }
    }
}

impl DisplayHost for FfiHost {
    fn refresh_rate(&self) -> f32 {
        match self.callbacks.display_refresh_rate {
            Some(callback) => unsafe { callback(self.callbacks.user_data) },
            None => 60.0,
        }
    }

    fn density(&self) -> DisplayDensity {
        let mut density = DisplayDensity::default();
        if let Some(callback) = self.callbacks.display_density {
            unsafe { callback(self.callbacks.user_data, &mut density.xdpi, &mut density.ydpi) };
        }
        density
    }

    fn supported_modes(&self) -> Vec<DisplayMode> {
        let Some(callback) = self.callbacks.display_supported_modes else {
            return Vec::new();
        };

        let count = unsafe { callback(self.callbacks.user_data, std::ptr::null_mut(), 0) };
        if count == 0 {
            return Vec::new();
        }
        let mut raw = vec![TwoyiDisplayMode::default(); count as usize];
        let written = unsafe { callback(self.callbacks.user_data, raw.as_mut_ptr(), count) };
        raw.truncate(written.min(count) as usize);

        raw.into_iter()
            .map(|mode| DisplayMode {
                id: mode.id,
                size: PhysicalSize::new(mode.width, mode.height),
                refresh_rate: mode.refresh_rate,
            })
            .collect()
    }

    fn request_display_mode(&self, mode_id: i32) {
        if let Some(callback) = self.callbacks.display_request_mode {
            unsafe { callback(self.callbacks.user_data, mode_id) };
        }
    }

    fn release_surface(&self, surface: SurfaceHandle) {
        if let Some(callback) = self.callbacks.display_release_surface {
            unsafe { callback(self.callbacks.user_data, Self::surface_ptr(surface)) };
        }
    }
}

impl FrameClock for FfiHost {
    fn post_frame_callback(&self) {
        self.notify(self.callbacks.post_frame_callback);
    }

    fn remove_frame_callback(&self) {
        self.notify(self.callbacks.remove_frame_callback);
    }
}

impl BootUi for FfiHost {
    fn show_loading(&self) {
        self.notify(self.callbacks.show_loading);
    }

    fn set_loading_message(&self, message: BootMessage) {
        if let Some(callback) = self.callbacks.set_loading_message {
            unsafe { callback(self.callbacks.user_data, message as u32) };
        }
    }

    fn show_boot_log(&self) {
        self.notify(self.callbacks.show_boot_log);
    }

    fn attach_surface_view(&self) {
        self.notify(self.callbacks.attach_surface_view);
    }

    fn reveal_display(&self) {
        self.notify(self.callbacks.reveal_display);
    }

    fn show_boot_failure_notice(&self) {
        self.notify(self.callbacks.show_boot_failure_notice);
    }
}

impl RootfsManager for FfiHost {
    fn rom_exist(&self) -> bool {
        self.query(self.callbacks.rom_exist)
    }

    fn needs_upgrade(&self) -> bool {
        self.query(self.callbacks.needs_upgrade)
    }

    fn extract_rootfs(&self, facts: &ExtractionFacts) -> Result<(), RootfsError> {
        let Some(callback) = self.callbacks.extract_rootfs else {
            return Err(RootfsError::Extract("host callback not provided".to_string()));
        };
        let code = unsafe {
            callback(
                self.callbacks.user_data,
                facts.rom_exists,
                facts.factory_updated,
                facts.force_reinstall,
                facts.use_third_party_rom,
            )
        };
        match code {
            0 => Ok(()),
            code => Err(RootfsError::Extract(format!("host returned {code}"))),
        }
    }

    fn init_rootfs(&self) -> Result<(), RootfsError> {
        let Some(callback) = self.callbacks.init_rootfs else {
            return Ok(());
        };
        match unsafe { callback(self.callbacks.user_data) } {
            0 => Ok(()),
            code => Err(RootfsError::Init(format!("host returned {code}"))),
        }
    }

    fn loader_path(&self) -> PathBuf {
        let Some(callback) = self.callbacks.loader_path else {
            warn!("loader_path callback not provided");
            return PathBuf::new();
        };

        let mut buf = vec![0u8; LOADER_PATH_BUF];
        let mut len = unsafe {
            callback(self.callbacks.user_data, buf.as_mut_ptr().cast(), buf.len() as u32)
        } as usize;
        if len >= buf.len() {
            buf = vec![0u8; len + 1];
            len = unsafe {
                callback(self.callbacks.user_data, buf.as_mut_ptr().cast(), buf.len() as u32)
            } as usize;
        }
        buf.truncate(len.min(buf.len().saturating_sub(1)));

        match String::from_utf8(buf) {
            Ok(path) => PathBuf::from(path),
            Err(err) => {
                warn!("loader path is not UTF-8: {err}");
                PathBuf::new()
            }
        }
    }

    fn reboot(&self) {
        self.notify(self.callbacks.reboot);
    }
}

impl Telemetry for FfiHost {
    fn track_boot_failure(&self) {
        self.notify(self.callbacks.track_boot_failure);
    }
}

impl ProcessControl for FfiHost {
    fn finish_screen(&self) {
        self.notify(self.callbacks.finish_screen);
    }

    fn terminate(&self, code: i32) {
        match self.callbacks.terminate {
            Some(callback) => unsafe { callback(self.callbacks.user_data, code) },
            None => std::process::exit(code),
        }
    }
}

impl UiWaker for FfiHost {
    fn wake(&self) {
        self.notify(self.callbacks.wake);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;

    use super::*;
    use crate::engine::ReadinessBeacon;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(&'static str, Option<String>)>>,
    }

    fn record(user_data: *mut c_void, name: &'static str) {
        let recorder = unsafe { &*(user_data as *const Recorder) };
        let thread = thread::current().name().map(str::to_string);
        recorder.calls.lock().unwrap().push((name, thread));
    }

    unsafe extern "C" fn ok_status(_: *mut c_void) -> i32 {
        0
    }

    unsafe extern "C" fn refresh_rate(_: *mut c_void) -> f32 {
        60.0
    }

    unsafe extern "C" fn noop(_: *mut c_void) {}

    unsafe extern "C" fn renderer_init(
        _: *mut c_void,
        _: *mut c_void,
        _: *const c_char,
        _: f32,
        _: f32,
        _: u32,
    ) -> i32 {
        0
    }

    unsafe extern "C" fn init_rootfs(user_data: *mut c_void) -> i32 {
        record(user_data, "init_rootfs");
        0
    }

    unsafe extern "C" fn reboot(user_data: *mut c_void) {
        record(user_data, "reboot");
    }

    unsafe extern "C" fn track_boot_failure(user_data: *mut c_void) {
        record(user_data, "track_boot_failure");
    }

    unsafe extern "C" fn finish_screen(user_data: *mut c_void) {
        record(user_data, "finish_screen");
    }

    unsafe extern "C" fn terminate(user_data: *mut c_void, _code: i32) {
        record(user_data, "terminate");
    }

    unsafe extern "C" fn wake(user_data: *mut c_void) {
        record(user_data, "wake");
    }

    fn callbacks(recorder: &Recorder) -> TwoyiHostCallbacks {
        TwoyiHostCallbacks {
            user_data: recorder as *const Recorder as *mut c_void,
            renderer_init: Some(renderer_init),
            renderer_remove_window: None,
            renderer_reset_window: None,
            renderer_repaint: Some(ok_status),
            renderer_handle_touch: None,
            renderer_send_keycode: None,
            display_refresh_rate: Some(refresh_rate),
            display_density: None,
            display_supported_modes: None,
            display_request_mode: None,
            display_release_surface: None,
            post_frame_callback: Some(noop),
            remove_frame_callback: None,
            show_loading: None,
            set_loading_message: None,
            show_boot_log: None,
            attach_surface_view: None,
            reveal_display: None,
            show_boot_failure_notice: None,
            rom_exist: None,
            needs_upgrade: None,
            extract_rootfs: None,
            init_rootfs: Some(init_rootfs),
            loader_path: None,
            reboot: Some(reboot),
            track_boot_failure: Some(track_boot_failure),
            finish_screen: Some(finish_screen),
            terminate: Some(terminate),
            wake: Some(wake),
        }
    }

    #[test]
    fn missing_required_names_first_gap() {
        let recorder = Recorder::default();
        let mut table = callbacks(&recorder);
        assert_eq!(table.missing_required(), None);
        table.post_frame_callback = None;
        assert_eq!(table.missing_required(), Some("post_frame_callback"));
    }

    #[test]
    fn shared_callbacks_run_on_worker_threads() {
        let recorder = Recorder::default();
        let bindings = callbacks(&recorder).into_bindings(Arc::new(ReadinessBeacon::default()));
        let rootfs = bindings.rootfs.clone();
        let telemetry = bindings.telemetry.clone();
        let process = bindings.process.clone();
        let waker = bindings.waker.clone();
        drop(bindings);

        thread::Builder::new()
            .name("waiting-boot".to_string())
            .spawn(move || {
                rootfs.init_rootfs().unwrap();
                rootfs.reboot();
                telemetry.track_boot_failure();
                process.finish_screen();
                process.terminate(0);
                waker.wake();
            })
            .unwrap()
            .join()
            .unwrap();

        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(
            calls.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            vec![
                "init_rootfs",
                "reboot",
                "track_boot_failure",
                "finish_screen",
                "terminate",
                "wake"
            ]
        );
        assert!(
            calls
                .iter()
                .all(|(_, thread)| thread.as_deref() == Some("waiting-boot"))
        );
    }
}
