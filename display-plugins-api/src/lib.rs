#[macro_use]
extern crate log;
extern crate euclid;
extern crate thiserror;
extern crate time;
extern crate toml;

#[cfg(feature = "serde-serialization")]
#[macro_use]
extern crate serde_derive;

pub mod container;
pub mod display_plugin;
pub mod error;
pub mod event;
pub mod eye;
pub mod frame;
pub mod frame_info;
pub mod gpu;
pub mod hand_laser;
pub mod hmd_device;
pub mod plugin;
pub mod settings;
pub mod surface;
pub mod utils;

pub use container::{MenuCallback, PluginContainer, PluginContainerPtr};
pub use container::{DEVELOPER_MENU_PATH, MENU_PATH};
pub use display_plugin::{present_frame, DisplayPlugin, DisplayPluginPtr, FrameScope};
pub use display_plugin::{DEFAULT_FAR_CLIP, DEFAULT_NEAR_CLIP};
pub use error::{Error, NoHit};
pub use event::DisplayEvent;
pub use eye::{for_each_eye, Eye, PerEye};
pub use frame::{Frame, Layer};
pub use frame_info::FrameInfo;
pub use gpu::{Batch, Command, FramebufferTarget, Geometry, PipelineKind};
pub use gpu::{TextureId, TextureSource, Uniforms};
pub use hand_laser::{Hand, HandLaserInfo, HandLaserMode, Hands};
pub use hmd_device::{EyeRenderDesc, HmdDevice, HmdDevicePtr, SubmitLayer, TrackingState};
pub use plugin::{Grouping, Plugin, PluginType};
pub use settings::{SettingValue, Settings};
pub use surface::{ContextGuard, Surface, SurfacePtr};
