/// ### English
/// `twoyi_display` crate root.
/// Exposes the C ABI via `ffi`; the display/boot controller lives under `engine`.
///
/// ### 中文
/// `twoyi_display` 的 crate 根。
/// 通过 `ffi` 导出 C ABI；显示与启动控制器位于 `engine` 模块。
pub mod engine;
mod ffi;
