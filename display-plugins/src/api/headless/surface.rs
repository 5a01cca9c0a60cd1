use display_plugins_api::utils;
use display_plugins_api::Batch;
use display_plugins_api::Error;
use display_plugins_api::Surface;
use euclid::default::Size2D;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

/// An offscreen surface that records every batch it is asked to render.
pub struct HeadlessSurface {
    size: Mutex<Size2D<u32>>,
    device_pixel_ratio: Mutex<f32>,
    focus: AtomicBool,
    vsync: AtomicBool,
    // When false the driver ignores swap interval requests
    vsync_controllable: AtomicBool,
    fullscreen: AtomicBool,
    visible: AtomicBool,
    fail_make_current: AtomicBool,
    // Nesting depth of make_current
    current: AtomicUsize,
    make_current_calls: AtomicUsize,
    swaps: AtomicUsize,
    batches: Mutex<Vec<Batch>>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Arc<HeadlessSurface> {
        Arc::new(HeadlessSurface {
            size: Mutex::new(Size2D::new(width, height)),
            device_pixel_ratio: Mutex::new(1.0),
            focus: AtomicBool::new(true),
            vsync: AtomicBool::new(true),
            vsync_controllable: AtomicBool::new(true),
            fullscreen: AtomicBool::new(false),
            visible: AtomicBool::new(false),
            fail_make_current: AtomicBool::new(false),
            current: AtomicUsize::new(0),
            make_current_calls: AtomicUsize::new(0),
            swaps: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn resize(&self, width: u32, height: u32) {
        *utils::lock(&self.size) = Size2D::new(width, height);
    }

    pub fn set_device_pixel_ratio(&self, ratio: f32) {
        *utils::lock(&self.device_pixel_ratio) = ratio;
    }

    pub fn set_focus(&self, focus: bool) {
        self.focus.store(focus, Ordering::SeqCst);
    }

    /// Makes the surface ignore vsync requests, like drivers that force it.
    pub fn lock_vsync(&self, enabled: bool) {
        self.vsync.store(enabled, Ordering::SeqCst);
        self.vsync_controllable.store(false, Ordering::SeqCst);
    }

    pub fn set_fail_make_current(&self, fail: bool) {
        self.fail_make_current.store(fail, Ordering::SeqCst);
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) > 0
    }

    pub fn make_current_calls(&self) -> usize {
        self.make_current_calls.load(Ordering::SeqCst)
    }

    pub fn swap_count(&self) -> usize {
        self.swaps.load(Ordering::SeqCst)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Every batch rendered so far, oldest first.
    pub fn batches(&self) -> Vec<Batch> {
        utils::lock(&self.batches).clone()
    }

    pub fn take_batches(&self) -> Vec<Batch> {
        std::mem::take(&mut *utils::lock(&self.batches))
    }
}

impl Surface for HeadlessSurface {
    fn make_current(&self) -> Result<(), Error> {
        if self.fail_make_current.load(Ordering::SeqCst) {
            return Err(Error::Context("headless context lost".into()));
        }
        self.make_current_calls.fetch_add(1, Ordering::SeqCst);
        self.current.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn done_current(&self) {
        let released = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| depth.checked_sub(1));
        if released.is_err() {
            warn!("done_current without a current context");
        }
    }

    fn swap_buffers(&self) -> Result<(), Error> {
        if !self.is_current() {
            return Err(Error::Context("swap without a current context".into()));
        }
        self.swaps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn render(&self, batch: Batch) {
        if !self.is_current() {
            warn!("Rendering {} commands without a current context", batch.commands().len());
        }
        utils::lock(&self.batches).push(batch);
    }

    fn size(&self) -> Size2D<u32> {
        *utils::lock(&self.size)
    }

    fn device_pixel_ratio(&self) -> f32 {
        *utils::lock(&self.device_pixel_ratio)
    }

    fn has_focus(&self) -> bool {
        self.focus.load(Ordering::SeqCst)
    }

    fn set_vsync(&self, enabled: bool) -> bool {
        if self.vsync_controllable.load(Ordering::SeqCst) {
            self.vsync.store(enabled, Ordering::SeqCst);
        }
        self.vsync.load(Ordering::SeqCst)
    }

    fn is_vsync_enabled(&self) -> bool {
        self.vsync.load(Ordering::SeqCst)
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        self.fullscreen.store(fullscreen, Ordering::SeqCst);
    }

    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use display_plugins_api::{ContextGuard, Geometry, PipelineKind};

    #[test]
    fn records_batches_while_current() {
        let surface = HeadlessSurface::new(640, 480);
        {
            let guard = ContextGuard::acquire(&*surface).unwrap();
            let mut batch = Batch::new();
            batch.set_pipeline(PipelineKind::Present);
            batch.draw(Geometry::Quad);
            guard.surface().render(batch);
            guard.surface().swap_buffers().unwrap();
        }
        assert!(!surface.is_current());
        assert_eq!(surface.swap_count(), 1);
        assert_eq!(surface.batches()[0].draws(), vec![(PipelineKind::Present, Geometry::Quad)]);
        assert_eq!(surface.take_batches().len(), 1);
        assert!(surface.batches().is_empty());
    }

    #[test]
    fn swap_requires_current_context() {
        let surface = HeadlessSurface::new(640, 480);
        assert!(surface.swap_buffers().is_err());
    }

    #[test]
    fn locked_vsync_ignores_requests() {
        let surface = HeadlessSurface::new(640, 480);
        assert!(!surface.set_vsync(false));
        surface.lock_vsync(true);
        assert!(surface.set_vsync(false));
        assert!(surface.is_vsync_enabled());
    }
}
