//! ### English
//! C ABI bindings for the presentation surface and vsync.
//!
//! ### 中文
//! 呈现 surface 与 vsync 相关的 C ABI 绑定。

use std::ffi::c_void;

use dpi::PhysicalSize;

use super::TwoyiDisplay;
use crate::engine::{FrameTick, SurfaceHandle};

#[unsafe(no_mangle)]
/// ### English
/// The host surface (e.g. an `ANativeWindow*`) became available.
///
/// Replaces any previous surface and binds the renderer at the current refresh rate.
///
/// ### 中文
/// 宿主 surface（例如 `ANativeWindow*`）可用。
///
/// 替换之前的 surface，并以当前刷新率绑定渲染器。
pub unsafe extern "C" fn twoyi_display_surface_available(
    display: *mut TwoyiDisplay,
    surface: *mut c_void,
    width: u32,
    height: u32,
) {
    if display.is_null() {
        return;
    }
    let Some(handle) = SurfaceHandle::from_raw(surface as usize) else {
        return;
    };
    unsafe {
        (*display)
            .controller
            .on_surface_available(handle, PhysicalSize::new(width, height))
    };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn twoyi_display_surface_size_changed(
    display: *mut TwoyiDisplay,
    width: u32,
    height: u32,
) {
    if display.is_null() {
        return;
    }
    unsafe {
        (*display)
            .controller
            .on_surface_size_changed(PhysicalSize::new(width, height))
    };
}

#[unsafe(no_mangle)]
/// ### English
/// The host surface is being destroyed. The surface pointer must stay valid until this returns.
///
/// ### 中文
/// 宿主 surface 正在销毁；在本函数返回前 surface 指针必须保持有效。
pub unsafe extern "C" fn twoyi_display_surface_destroyed(display: *mut TwoyiDisplay) {
    if display.is_null() {
        return;
    }
    unsafe { (*display).controller.on_surface_destroyed() };
}

#[unsafe(no_mangle)]
/// ### English
/// Answers one `post_frame_callback`.
///
/// Returns `0` idle, `1` painted, `2` repaint failed and the pump disarmed.
///
/// ### 中文
/// 响应一次 `post_frame_callback`。
///
/// 返回 `0` 空闲，`1` 已绘制，`2` 重绘失败且泵已解除。
pub unsafe extern "C" fn twoyi_display_on_vsync(
    display: *mut TwoyiDisplay,
    frame_time_nanos: i64,
) -> u32 {
    if display.is_null() {
        return 0;
    }
    match unsafe { (*display).controller.on_vsync(frame_time_nanos) } {
        FrameTick::Idle => 0,
        FrameTick::Painted => 1,
        FrameTick::Disarmed => 2,
    }
}
