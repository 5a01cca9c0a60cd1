extern crate display_plugins_api;
extern crate euclid;
#[cfg(feature = "glwindow")]
extern crate gleam;
#[cfg(feature = "glwindow")]
extern crate glutin;
#[macro_use]
extern crate log;
#[cfg(feature = "serde-serialization")]
#[macro_use]
extern crate serde_derive;

pub mod api;
pub mod backend;
pub mod compositor;
mod hmd_interface;
mod host_container;
mod plugin_manager;
mod session;

pub use display_plugins_api::*;

#[cfg(feature = "debug-hmd")]
pub use api::{DebugHmdControlMsg, DebugHmdDevice};
#[cfg(feature = "glwindow")]
pub use api::{GlWindowCursorHost, GlWindowHeartbeat, GlWindowSurface};
pub use api::HeadlessSurface;
pub use backend::{DisplayBackend, PresentStrategy, StereoLayout};
pub use compositor::{CompositorHelper, CursorHost, ReticleInterface, SimulatedCursorHost};
pub use host_container::HostContainer;
pub use hmd_interface::HmdScriptingInterface;
pub use plugin_manager::DisplayPluginManager;
pub use session::{SessionLease, VendorSession};
