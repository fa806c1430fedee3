//! ### English
//! Host boundary: everything the controller drives but does not own.
//!
//! Traits without a `Send + Sync` bound are only ever called on the UI-owning thread.
//! The others are also called from the extraction and boot-wait worker threads.
//!
//! ### 中文
//! 宿主边界：控制器驱动但不持有的所有对象。
//!
//! 没有 `Send + Sync` 约束的 trait 只会在持有 UI 的线程上调用；
//! 其余 trait 也会被解压线程与启动等待线程调用。

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use dpi::{PhysicalPosition, PhysicalSize};

use crate::engine::boot::ExtractionFacts;
use crate::engine::error::{RendererError, RootfsError, StatusError};

/// ### English
/// Android `KEYCODE_HOME`, sent to the virtualized system on back press.
///
/// ### 中文
/// Android 的 `KEYCODE_HOME`，返回键时发送给虚拟系统。
pub const KEYCODE_HOME: i32 = 3;

/// ### English
/// Opaque host handle of a drawable target (e.g. a native window pointer).
///
/// ### 中文
/// 宿主侧可绘制目标的不透明句柄（例如 native window 指针）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(usize);

impl SurfaceHandle {
    /// ### English
    /// Wraps a raw handle; `0` is not a valid surface.
    ///
    /// ### 中文
    /// 包装原始句柄；`0` 不是合法 surface。
    pub fn from_raw(raw: usize) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// ### English
/// Physical display density from the display's real metrics.
///
/// ### 中文
/// 来自显示器真实度量的物理像素密度。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayDensity {
    pub xdpi: f32,
    pub ydpi: f32,
}

/// ### English
/// One display mode the host can switch to.
///
/// ### 中文
/// 宿主可切换的一个显示模式。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMode {
    pub id: i32,
    pub size: PhysicalSize<u32>,
    pub refresh_rate: f32,
}

/// ### English
/// One pointer event forwarded to the virtualized system.
///
/// ### 中文
/// 转发给虚拟系统的单个指针事件。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    pub action: i32,
    pub pointer_id: i32,
    pub position: PhysicalPosition<f32>,
    pub pressure: f32,
    pub event_time_ms: i64,
}

/// ### English
/// Loading-screen messages shown while the root filesystem is extracted.
///
/// ### 中文
/// 解压根文件系统期间显示的加载提示。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum BootMessage {
    Extracting = 0,
    FirstBoot = 1,
    FirstBootStillWorking = 2,
    FirstBootAlmostDone = 3,
}

/// ### English
/// External renderer that owns GPU/compositor state.
///
/// ### 中文
/// 持有 GPU/合成器状态的外部渲染器。
pub trait Renderer {
    /// ### English
    /// Establishes a binding for `surface`. Must be callable again after `remove_window`.
    ///
    /// ### 中文
    /// 为 `surface` 建立绑定；在 `remove_window` 之后必须可再次调用。
    fn init(
        &self,
        surface: SurfaceHandle,
        loader_path: &Path,
        density: DisplayDensity,
        fps: u32,
    ) -> Result<(), RendererError>;

    /// ### English
    /// Tears down the binding; tolerates surfaces that were never bound or already removed.
    ///
    /// ### 中文
    /// 拆除绑定；需容忍从未绑定或已移除的 surface。
    fn remove_window(&self, surface: SurfaceHandle) -> Result<(), RendererError>;

    fn reset_window(
        &self,
        surface: SurfaceHandle,
        origin: PhysicalPosition<i32>,
        size: PhysicalSize<u32>,
    ) -> Result<(), RendererError>;

    /// ### English
    /// Runs one frame's worth of composition.
    ///
    /// ### 中文
    /// 执行一帧的合成/绘制工作。
    fn repaint(&self) -> Result<(), RendererError>;

    fn handle_touch(&self, event: &TouchEvent);

    fn send_keycode(&self, code: i32);
}

/// ### English
/// Display queries and surface release.
///
/// ### 中文
/// 显示器查询与 surface 释放。
pub trait DisplayHost {
    fn refresh_rate(&self) -> f32;

    fn density(&self) -> DisplayDensity;

    fn supported_modes(&self) -> Vec<DisplayMode>;

    fn request_display_mode(&self, mode_id: i32);

    /// ### English
    /// Releases the host-side surface object. Called once per surface, after `remove_window`.
    ///
    /// ### 中文
    /// 释放宿主侧 surface 对象；每个 surface 调用一次，且在 `remove_window` 之后。
    fn release_surface(&self, surface: SurfaceHandle);
}

/// ### English
/// Host vertical-sync registration.
///
/// A posted callback is answered by exactly one `on_vsync` call on the UI thread.
///
/// ### 中文
/// 宿主垂直同步注册。
///
/// 每次 post 的回调会在 UI 线程上对应恰好一次 `on_vsync` 调用。
pub trait FrameClock {
    fn post_frame_callback(&self);

    fn remove_frame_callback(&self);
}

/// ### English
/// Loading-screen and view-tree mutations.
///
/// ### 中文
/// 加载界面与视图树的变更。
pub trait BootUi {
    fn show_loading(&self);

    fn set_loading_message(&self, message: BootMessage);

    fn show_boot_log(&self);

    /// ### English
    /// Inserts the presentation surface's view into the view tree.
    ///
    /// ### 中文
    /// 将呈现 surface 的 view 插入视图树。
    fn attach_surface_view(&self);

    /// ### English
    /// Stops the boot animation and hides the loading layout.
    ///
    /// ### 中文
    /// 停止启动动画并隐藏加载布局。
    fn reveal_display(&self);

    fn show_boot_failure_notice(&self);
}

/// ### English
/// Root-filesystem installation collaborator.
///
/// ### 中文
/// 根文件系统安装协作方。
pub trait RootfsManager: Send + Sync {
    fn rom_exist(&self) -> bool;

    /// ### English
    /// Whether the bundled factory image changed since the last extraction.
    ///
    /// ### 中文
    /// 内置出厂镜像自上次解压后是否有更新。
    fn needs_upgrade(&self) -> bool;

    /// ### English
    /// Blocking; may take a long time.
    ///
    /// ### 中文
    /// 阻塞调用，可能耗时较长。
    fn extract_rootfs(&self, facts: &ExtractionFacts) -> Result<(), RootfsError>;

    fn init_rootfs(&self) -> Result<(), RootfsError>;

    fn loader_path(&self) -> PathBuf;

    /// ### English
    /// Restarts the whole client flow.
    ///
    /// ### 中文
    /// 重启整个客户端流程。
    fn reboot(&self);
}

/// ### English
/// Readiness of the virtualized system.
///
/// ### 中文
/// 虚拟系统的就绪状态。
pub trait StatusBeacon: Send + Sync {
    fn is_started(&self) -> bool;

    /// ### English
    /// Clears prior boot state for a new attempt.
    ///
    /// ### 中文
    /// 为新的启动尝试清除之前的状态。
    fn reset(&self);

    /// ### English
    /// Blocks (without polling) until ready or `timeout` elapses; `Ok(false)` on timeout.
    ///
    /// ### 中文
    /// 阻塞（不轮询）直到就绪或超时；超时返回 `Ok(false)`。
    fn wait_boot(&self, timeout: Duration) -> Result<bool, StatusError>;

    fn update_visibility(&self, has_focus: bool);
}

pub trait Telemetry: Send + Sync {
    fn track_boot_failure(&self);
}

/// ### English
/// Screen/process teardown.
///
/// ### 中文
/// 界面/进程的终止。
pub trait ProcessControl: Send + Sync {
    fn finish_screen(&self);

    fn terminate(&self, code: i32);
}

/// ### English
/// Asks the host to call `dispatch` on its UI thread soon.
///
/// ### 中文
/// 请求宿主尽快在 UI 线程调用 `dispatch`。
pub trait UiWaker: Send + Sync {
    fn wake(&self);
}

/// ### English
/// Everything the controller needs from the host, bundled for construction.
///
/// ### 中文
/// 控制器所需的全部宿主对象，打包用于构造。
#[derive(Clone)]
pub struct HostBindings {
    pub renderer: Rc<dyn Renderer>,
    pub display: Rc<dyn DisplayHost>,
    pub frame_clock: Rc<dyn FrameClock>,
    pub ui: Rc<dyn BootUi>,
    pub rootfs: Arc<dyn RootfsManager>,
    pub status: Arc<dyn StatusBeacon>,
    pub telemetry: Arc<dyn Telemetry>,
    pub process: Arc<dyn ProcessControl>,
    pub waker: Arc<dyn UiWaker>,
}
