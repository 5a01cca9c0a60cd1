use crate::compositor::CompositorHelper;
use display_plugins_api::settings::IPD_SCALE_KEY;
use display_plugins_api::utils;
use display_plugins_api::PluginContainerPtr;
use std::sync::Arc;

pub const MIN_IPD_SCALE: f32 = -1.0;
pub const MAX_IPD_SCALE: f32 = 3.0;
// Eye height reported while no HMD is active, in meters
pub const DEFAULT_EYE_HEIGHT: f32 = 1.6;
// Distance from the eyes to the top of the head
const EYE_TO_TOP_OF_HEAD: f32 = 0.11;

/// Script-facing view of the active HMD.
pub struct HmdScriptingInterface {
    compositor: Arc<CompositorHelper>,
    container: PluginContainerPtr,
}

impl HmdScriptingInterface {
    pub fn new(compositor: Arc<CompositorHelper>, container: PluginContainerPtr) -> HmdScriptingInterface {
        HmdScriptingInterface { compositor, container }
    }

    /// True while the active display plugin is an HMD.
    pub fn active(&self) -> bool {
        self.compositor.is_hmd()
    }

    /// Interpupillary distance of the active HMD in meters, 0 otherwise.
    pub fn ipd(&self) -> f32 {
        match self.compositor.display_plugin() {
            Some(ref display) if display.is_hmd() => display.ipd(),
            _ => 0.0,
        }
    }

    pub fn ipd_scale(&self) -> f32 {
        self.container.float_setting(IPD_SCALE_KEY, 1.0)
    }

    /// Stores the scale clamped to [-1, 3] and forwards it to the active
    /// plugin.
    pub fn set_ipd_scale(&self, scale: f32) {
        let clamped = scale.clamp(MIN_IPD_SCALE, MAX_IPD_SCALE);
        if clamped != scale {
            debug!("Clamped IPD scale {} to {}", scale, clamped);
        }
        self.container.set_float_setting(IPD_SCALE_KEY, clamped);
        if let Some(display) = self.compositor.display_plugin() {
            display.set_ipd_scale(clamped);
        }
    }

    /// Height of the eyes above the tracking floor.
    pub fn eye_height(&self) -> f32 {
        match self.compositor.display_plugin() {
            Some(ref display) if display.is_hmd() => utils::translation_of(&display.head_pose()).y,
            _ => DEFAULT_EYE_HEIGHT,
        }
    }

    pub fn player_height(&self) -> f32 {
        self.eye_height() + EYE_TO_TOP_OF_HEAD
    }
}
