/// ### English
/// Engine internals: surface lifecycle, vsync pump, refresh watchdog and boot orchestration.
///
/// ### 中文
/// 引擎内部模块（surface 生命周期、vsync 泵、刷新率看门狗、启动编排等）。
pub mod boot;
pub mod controller;
pub mod error;
pub mod flags;
pub mod fps;
pub mod host;
pub(crate) mod mailbox;
pub mod scheduler;
pub mod status;
pub mod surface;
pub mod tuning;
pub mod vsync;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod testing;

pub use boot::{
    BootContext, BootOrchestrator, BootOutcome, BootPath, BootPhase, BootStart, ExtractionFacts,
    HintStage,
};
pub use controller::DisplayController;
pub use error::{
    BootError, RendererError, RendererOp, RootfsError, SchedulerError, StatusError,
};
pub use flags::BootConfig;
pub use host::{
    BootMessage, BootUi, DisplayDensity, DisplayHost, DisplayMode, FrameClock, HostBindings,
    KEYCODE_HOME, ProcessControl, Renderer, RootfsManager, StatusBeacon, SurfaceHandle, Telemetry,
    TouchEvent, UiWaker,
};
pub use scheduler::{TaskScheduler, TimerHandle};
pub use status::ReadinessBeacon;
pub use surface::{PresentationSurface, RendererBinding, SurfaceManager};
pub use tuning::Tuning;
pub use vsync::{FrameTick, VsyncPump};
pub use watchdog::{RefreshWatchdog, WatchdogOutcome};
