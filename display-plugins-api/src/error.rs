use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The vendor runtime reports no device.
    #[error("display device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to activate {plugin}: {reason}")]
    Activation { plugin: String, reason: String },
    #[error("graphics context error: {0}")]
    Context(String),
    #[error("frame submission failed: {0}")]
    Submit(String),
    /// A present was attempted for a frame that never went through `begin_frame_render`.
    #[error("no frame info recorded for frame {0}")]
    MissingFrameInfo(u32),
    #[error("frame {0} is already in flight")]
    FrameInFlight(u32),
    #[error("plugin is not active")]
    NotActive,
    #[error("settings i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse settings: {0}")]
    SettingsParse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),
}

/// A pick ray that misses the UI sphere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("ray does not intersect the UI sphere")]
pub struct NoHit;
