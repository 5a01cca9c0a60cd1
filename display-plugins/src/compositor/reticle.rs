use super::CompositorHelper;
use euclid::default::Point2D;
use std::sync::Arc;

/// Script-facing view of the reticle.
pub struct ReticleInterface {
    compositor: Arc<CompositorHelper>,
}

impl ReticleInterface {
    pub fn new(compositor: Arc<CompositorHelper>) -> ReticleInterface {
        ReticleInterface { compositor }
    }

    pub fn position(&self) -> Point2D<f32> {
        self.compositor.reticle_position()
    }

    pub fn set_position(&self, position: Point2D<f32>) {
        self.compositor.set_reticle_position(position, true);
    }

    pub fn is_visible(&self) -> bool {
        self.compositor.is_reticle_visible()
    }

    pub fn set_visible(&self, visible: bool) {
        self.compositor.set_reticle_visible(visible);
    }

    pub fn depth(&self) -> f32 {
        self.compositor.reticle_depth()
    }

    pub fn set_depth(&self, depth: f32) {
        self.compositor.set_reticle_depth(depth);
    }

    pub fn scale(&self) -> f32 {
        self.compositor.cursor_scale()
    }

    pub fn set_scale(&self, scale: f32) {
        self.compositor.set_cursor_scale(scale);
    }

    pub fn maximum_position(&self) -> Point2D<f32> {
        self.compositor.reticle_maximum_position()
    }

    pub fn allow_mouse_capture(&self) -> bool {
        self.compositor.allow_mouse_capture()
    }

    pub fn set_allow_mouse_capture(&self, allow: bool) {
        self.compositor.set_allow_mouse_capture(allow);
    }

    pub fn is_mouse_captured(&self) -> bool {
        self.compositor.should_capture_mouse()
    }

    pub fn is_pointing_at_system_overlay(&self) -> bool {
        !self.compositor.reticle_over_desktop()
    }
}
