use super::{TwoyiDisplay, TwoyiTouchEvent};
use crate::engine::TouchEvent;

#[unsafe(no_mangle)]
/// ### English
/// Forwards one touch event to the virtualized system.
///
/// ### 中文
/// 将单个触摸事件转发给虚拟系统。
pub unsafe extern "C" fn twoyi_display_on_touch(
    display: *mut TwoyiDisplay,
    event: *const TwoyiTouchEvent,
) {
    if display.is_null() || event.is_null() {
        return;
    }
    let event = TouchEvent::from(unsafe { *event });
    unsafe { (*display).controller.on_touch(&event) };
}

#[unsafe(no_mangle)]
/// ### English
/// Back press. Sent to the virtualized system as HOME; the host should not finish the screen.
///
/// ### 中文
/// 返回键。以 HOME 键发送给虚拟系统；宿主不应结束当前界面。
pub unsafe extern "C" fn twoyi_display_on_back_pressed(display: *mut TwoyiDisplay) {
    if display.is_null() {
        return;
    }
    unsafe { (*display).controller.on_back_pressed() };
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn twoyi_display_on_key_down(display: *mut TwoyiDisplay, key_code: i32) {
    if display.is_null() {
        return;
    }
    unsafe { (*display).controller.on_key_down(key_code) };
}
