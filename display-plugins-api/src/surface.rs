use crate::error::Error;
use crate::gpu::Batch;
use euclid::default::Size2D;
use std::sync::Arc;

/// A presentable window or offscreen target with its own graphics context.
///
/// Batches passed to `render` run in the context of the surface, between a
/// `make_current` and the matching `done_current`.
pub trait Surface: Send + Sync {
    fn make_current(&self) -> Result<(), Error>;

    fn done_current(&self);

    fn swap_buffers(&self) -> Result<(), Error>;

    fn render(&self, batch: Batch);

    /// Size in device pixels.
    fn size(&self) -> Size2D<u32>;

    fn device_pixel_ratio(&self) -> f32 {
        1.0
    }

    fn has_focus(&self) -> bool {
        true
    }

    /// Requests a swap interval and returns whether vsync ended up enabled.
    /// Drivers are free to ignore the request.
    fn set_vsync(&self, enabled: bool) -> bool;

    fn is_vsync_enabled(&self) -> bool;

    fn set_fullscreen(&self, _fullscreen: bool) {}

    fn set_visible(&self, _visible: bool) {}
}

pub type SurfacePtr = Arc<dyn Surface>;

/// Keeps the surface's context current until dropped.
pub struct ContextGuard<'a> {
    surface: &'a dyn Surface,
}

impl<'a> ContextGuard<'a> {
    pub fn acquire(surface: &'a dyn Surface) -> Result<ContextGuard<'a>, Error> {
        surface.make_current()?;
        Ok(ContextGuard { surface })
    }

    pub fn surface(&self) -> &dyn Surface {
        self.surface
    }
}

impl<'a> Drop for ContextGuard<'a> {
    fn drop(&mut self) {
        self.surface.done_current();
    }
}
