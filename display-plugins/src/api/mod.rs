#[cfg(feature = "debug-hmd")]
mod debug;
#[cfg(feature = "debug-hmd")]
pub use self::debug::{DebugHmdControlMsg, DebugHmdDevice, DebugHmdState};

mod headless;
pub use self::headless::HeadlessSurface;

#[cfg(feature = "glwindow")]
mod glwindow;
#[cfg(feature = "glwindow")]
pub use self::glwindow::{GlWindowCursorHost, GlWindowHeartbeat, GlWindowSurface};
