//! ### English
//! Presentation-surface lifecycle and the renderer binding attached to it.
//!
//! Teardown is best-effort against the renderer: a failing `remove_window` is logged and the
//! local surface reference is cleared anyway.
//!
//! ### 中文
//! 呈现 surface 的生命周期，以及挂在其上的渲染器绑定。
//!
//! 针对渲染器的拆除是 best-effort：`remove_window` 失败只记录日志，本地 surface 引用仍会被清除。

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use dpi::{PhysicalPosition, PhysicalSize};
use log::{debug, info, warn};

use crate::engine::error::{RendererError, RendererOp};
use crate::engine::fps::{FrameRateBaseline, target_fps};
use crate::engine::host::{DisplayDensity, DisplayHost, Renderer, RootfsManager, SurfaceHandle};
use crate::engine::vsync::VsyncPump;

/// ### English
/// The single live drawable target, bound to the host's visible view.
///
/// ### 中文
/// 唯一存活的可绘制目标，绑定到宿主的可见 view。
#[derive(Debug)]
pub struct PresentationSurface {
    handle: SurfaceHandle,
    size: Cell<PhysicalSize<u32>>,
}

impl PresentationSurface {
    pub fn new(handle: SurfaceHandle, size: PhysicalSize<u32>) -> Self {
        Self {
            handle,
            size: Cell::new(size),
        }
    }

    pub fn handle(&self) -> SurfaceHandle {
        self.handle
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size.get()
    }
}

/// ### English
/// Parameters of the renderer binding for the live surface.
///
/// `loader_path` and `density` are captured once per surface; only `fps` changes on a
/// refresh-rate switch.
///
/// ### 中文
/// 当前 surface 的渲染器绑定参数。
///
/// `loader_path` 与 `density` 每个 surface 只获取一次；刷新率切换时只有 `fps` 改变。
#[derive(Clone, Debug, PartialEq)]
pub struct RendererBinding {
    pub loader_path: PathBuf,
    pub density: DisplayDensity,
    pub fps: u32,
    /// ### English
    /// Whether the last `init` succeeded (a binding exists inside the renderer).
    ///
    /// ### 中文
    /// 最近一次 `init` 是否成功（渲染器内部存在绑定）。
    pub active: bool,
}

pub struct SurfaceManager {
    renderer: Rc<dyn Renderer>,
    display: Rc<dyn DisplayHost>,
    rootfs: Arc<dyn RootfsManager>,
    surface: Option<Rc<PresentationSurface>>,
    binding: Option<RendererBinding>,
    baseline: FrameRateBaseline,
}

impl SurfaceManager {
    pub fn new(
        renderer: Rc<dyn Renderer>,
        display: Rc<dyn DisplayHost>,
        rootfs: Arc<dyn RootfsManager>,
    ) -> Self {
        Self {
            renderer,
            display,
            rootfs,
            surface: None,
            binding: None,
            baseline: FrameRateBaseline::default(),
        }
    }

    pub fn live_surface(&self) -> Option<&Rc<PresentationSurface>> {
        self.surface.as_ref()
    }

    pub fn binding(&self) -> Option<&RendererBinding> {
        self.binding.as_ref()
    }

    pub fn baseline(&self) -> Option<f32> {
        self.baseline.get()
    }

    pub(crate) fn baseline_ref(&self) -> &FrameRateBaseline {
        &self.baseline
    }

    pub(crate) fn adopt_baseline(&mut self, rate: f32) {
        self.baseline.commit(rate);
    }

    /// ### English
    /// Host surface became available: replaces any prior surface and binds the renderer.
    ///
    /// The new surface stays live even if `init` fails; the error is returned for logging.
    ///
    /// ### 中文
    /// 宿主 surface 可用：替换之前的 surface 并绑定渲染器。
    ///
    /// 即使 `init` 失败，新 surface 仍保持存活；错误返回给调用方记录。
    pub fn on_surface_available(
        &mut self,
        handle: SurfaceHandle,
        size: PhysicalSize<u32>,
    ) -> Result<(), RendererError> {
        if self.surface.is_some() {
            debug!("replacing live surface");
            self.release_current();
        }

        self.surface = Some(Rc::new(PresentationSurface::new(handle, size)));

        let loader_path = self.rootfs.loader_path();
        let density = self.display.density();
        let rate = self.display.refresh_rate();
        let fps = target_fps(rate);
        info!(
            "surface available {}x{}: refresh rate {rate} -> fps {fps}, dpi {}x{}",
            size.width, size.height, density.xdpi, density.ydpi
        );

        let result = self.renderer.init(handle, &loader_path, density, fps);
        let active = result.is_ok();
        self.binding = Some(RendererBinding {
            loader_path,
            density,
            fps,
            active,
        });
        if active {
            self.baseline.commit(rate);
        } else {
            self.baseline.clear();
        }
        result
    }

    /// ### English
    /// Resizes the live binding; a no-op when no surface exists yet.
    ///
    /// ### 中文
    /// 调整当前绑定的尺寸；尚无 surface 时不做任何事。
    pub fn on_surface_size_changed(&mut self, size: PhysicalSize<u32>) -> Result<(), RendererError> {
        let Some(surface) = &self.surface else {
            return Ok(());
        };
        surface.size.set(size);
        info!("surface changed: {}x{}", size.width, size.height);
        self.reapply_size()
    }

    /// ### English
    /// Host surface is going away. The pump is stopped before the renderer binding is removed
    /// so no repaint can target a dying surface.
    ///
    /// ### 中文
    /// 宿主 surface 即将销毁。先停止泵再移除渲染器绑定，确保不会向正在销毁的 surface 重绘。
    pub fn on_surface_destroyed(&mut self, pump: &mut VsyncPump) {
        pump.stop();
        if self.surface.is_some() {
            self.release_current();
        }
        info!("surface destroyed");
    }

    /// ### English
    /// Re-applies the current surface size to the renderer binding.
    ///
    /// ### 中文
    /// 将当前 surface 尺寸重新应用到渲染器绑定。
    pub fn reapply_size(&self) -> Result<(), RendererError> {
        let Some(surface) = &self.surface else {
            return Ok(());
        };
        self.renderer
            .reset_window(surface.handle, PhysicalPosition::new(0, 0), surface.size())
    }

    /// ### English
    /// Replaces the renderer binding with one at the fps derived from `rate`.
    ///
    /// The old binding is always removed first. The baseline moves to `rate` only if the new
    /// `init` succeeds. Returns the new target fps.
    ///
    /// ### 中文
    /// 以 `rate` 推导出的 fps 替换渲染器绑定。
    ///
    /// 总是先移除旧绑定；只有新的 `init` 成功时基线才更新为 `rate`。返回新的目标 fps。
    pub(crate) fn rebind_at_rate(&mut self, rate: f32) -> Result<u32, RendererError> {
        let Some(surface) = &self.surface else {
            return Err(RendererError::new(RendererOp::Init, "no live surface"));
        };
        let handle = surface.handle;

        let fps = target_fps(rate);
        let (loader_path, density) = match &self.binding {
            Some(binding) => (binding.loader_path.clone(), binding.density),
            None => (self.rootfs.loader_path(), self.display.density()),
        };

        if let Err(err) = self.renderer.remove_window(handle) {
            warn!("{err}; re-initializing anyway");
        }

        let result = self.renderer.init(handle, &loader_path, density, fps);
        let active = result.is_ok();
        self.binding = Some(RendererBinding {
            loader_path,
            density,
            fps,
            active,
        });
        result?;

        self.baseline.commit(rate);
        Ok(fps)
    }

    fn release_current(&mut self) {
        let Some(surface) = self.surface.take() else {
            return;
        };
        if let Err(err) = self.renderer.remove_window(surface.handle) {
            warn!("{err}; surface released anyway");
        }
        self.display.release_surface(surface.handle);
        self.binding = None;
    }
}
