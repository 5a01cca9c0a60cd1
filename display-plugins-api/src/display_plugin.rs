use crate::error::Error;
use crate::event::DisplayEvent;
use crate::eye::Eye;
use crate::frame::Frame;
use crate::hand_laser::HandLaserMode;
use crate::hand_laser::Hands;
use crate::plugin::Plugin;
use crate::utils;
use euclid::default::Point2D;
use euclid::default::Rect;
use euclid::default::Size2D;
use euclid::default::Transform3D;
use euclid::default::Vector3D;
use std::sync::Arc;

pub const DEFAULT_NEAR_CLIP: f32 = 0.08;
pub const DEFAULT_FAR_CLIP: f32 = 16384.0;

/// The rendering and presentation contract shared by desktop, stereo and HMD
/// plugins.
///
/// A frame goes through `pre_render`, `begin_frame_render`, then `pre_display`,
/// `display` and `finish_frame`. `finish_frame` must run whenever `pre_display`
/// succeeded; `FrameScope` takes care of that.
pub trait DisplayPlugin: Plugin {
    fn is_hmd(&self) -> bool {
        false
    }

    fn is_stereo(&self) -> bool {
        self.is_hmd()
    }

    fn is_throttled(&self) -> bool {
        false
    }

    /// Size of the scene render target. Side-by-side for stereo plugins.
    fn recommended_render_size(&self) -> Size2D<u32>;

    /// Size of the 2D UI texture.
    fn recommended_ui_size(&self) -> Size2D<u32>;

    /// Region of the UI texture that is comfortably visible.
    fn recommended_overlay_rect(&self) -> Rect<u32> {
        Rect::from_size(self.recommended_ui_size())
    }

    fn device_pixel_ratio(&self) -> f32 {
        1.0
    }

    fn has_focus(&self) -> bool {
        true
    }

    fn is_vsync_enabled(&self) -> bool {
        true
    }

    fn enable_vsync(&self, _enable: bool) {}

    /// Mouse position in render target pixels.
    fn true_mouse_position(&self, window_position: Point2D<f32>) -> Point2D<f32> {
        window_position
    }

    /// Mouse position in UI texture pixels.
    fn ui_mouse_position(&self, window_position: Point2D<f32>) -> Point2D<f32> {
        let render = self.recommended_render_size();
        let ui = self.recommended_ui_size();
        if render.width == 0 || render.height == 0 {
            return window_position;
        }
        let position = self.true_mouse_position(window_position);
        Point2D::new(
            position.x * ui.width as f32 / render.width as f32,
            position.y * ui.height as f32 / render.height as f32,
        )
    }

    fn eye_projection(&self, _eye: Eye, base_projection: &Transform3D<f32>) -> Transform3D<f32> {
        *base_projection
    }

    /// Projection enclosing both eyes, for culling.
    fn culling_projection(&self, base_projection: &Transform3D<f32>) -> Transform3D<f32> {
        *base_projection
    }

    fn eye_to_head_transform(&self, _eye: Eye) -> Transform3D<f32> {
        Transform3D::identity()
    }

    /// Head pose for the frame being rendered.
    fn head_pose(&self) -> Transform3D<f32> {
        Transform3D::identity()
    }

    /// Interpupillary distance in meters.
    fn ipd(&self) -> f32 {
        let left = utils::translation_of(&self.eye_to_head_transform(Eye::Left));
        let right = utils::translation_of(&self.eye_to_head_transform(Eye::Right));
        (left - right).length()
    }

    fn set_ipd_scale(&self, _scale: f32) {}

    fn reset_sensors(&self) {}

    fn abandon_calibration(&self) {}

    fn is_hmd_mounted(&self) -> bool {
        false
    }

    /// Called once per frame before any rendering.
    fn pre_render(&self) {}

    /// Records the pose the frame is about to be rendered with. Returns false
    /// when the frame should be skipped.
    fn begin_frame_render(&self, _frame_index: u32) -> Result<bool, Error> {
        Ok(true)
    }

    /// Makes the presentation context current.
    fn pre_display(&self) -> Result<(), Error>;

    /// Presents a rendered frame. Only valid between `pre_display` and
    /// `finish_frame`.
    fn display(&self, frame: Frame) -> Result<(), Error>;

    /// Swaps and releases the context acquired by `pre_display`.
    fn finish_frame(&self);

    /// Returns false when the plugin draws no lasers.
    fn set_hand_laser(&self, _hands: Hands, _mode: HandLaserMode, _color: [f32; 4], _direction: Vector3D<f32>) -> bool {
        false
    }

    /// Presents per second, or -1 when not tracked.
    fn present_rate(&self) -> f32 {
        -1.0
    }

    /// Presents of a frame not shown before, per second.
    fn new_frame_present_rate(&self) -> f32 {
        -1.0
    }

    fn dropped_frame_rate(&self) -> f32 {
        -1.0
    }

    /// Presents that missed their deadline, per second.
    fn stutter_rate(&self) -> f32 {
        -1.0
    }

    fn poll_events(&self) -> Vec<DisplayEvent> {
        Vec::new()
    }
}

pub type DisplayPluginPtr = Arc<dyn DisplayPlugin>;

/// Brackets `display` between `pre_display` and `finish_frame`.
pub struct FrameScope<'a> {
    plugin: &'a dyn DisplayPlugin,
}

impl<'a> FrameScope<'a> {
    pub fn begin(plugin: &'a dyn DisplayPlugin) -> Result<FrameScope<'a>, Error> {
        plugin.pre_display()?;
        Ok(FrameScope { plugin })
    }

    pub fn display(&self, frame: Frame) -> Result<(), Error> {
        self.plugin.display(frame)
    }
}

impl<'a> Drop for FrameScope<'a> {
    fn drop(&mut self) {
        self.plugin.finish_frame();
    }
}

/// Runs one full present of `frame`.
pub fn present_frame(plugin: &dyn DisplayPlugin, frame: Frame) -> Result<(), Error> {
    let scope = FrameScope::begin(plugin)?;
    scope.display(frame)
}
