use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PluginType {
    Display,
    Input,
}

/// Menu category the plugin is listed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Grouping {
    Standard,
    Advanced,
    Developer,
}

pub trait Plugin: Send + Sync {
    /// Returns unique plugin ID.
    fn id(&self) -> u32;

    /// Returns the display name of the plugin.
    fn name(&self) -> &str;

    fn grouping(&self) -> Grouping {
        Grouping::Standard
    }

    /// False when the backing device or window system is missing. Unsupported
    /// plugins are never offered as activation candidates.
    fn is_supported(&self) -> bool {
        true
    }

    /// Called once after registration.
    fn init(&self) {}

    /// Called once at shutdown.
    fn deinit(&self) {}

    /// Acquires device and window resources. On failure nothing may be left
    /// acquired and no context may be left current.
    fn activate(&self) -> Result<(), Error>;

    /// Releases everything acquired by `activate`. Safe to call while a frame
    /// is being presented from another thread.
    fn deactivate(&self);

    fn is_active(&self) -> bool;
}
