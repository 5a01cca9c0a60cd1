use super::heartbeat::GlWindowHeartbeat;
use super::GlWindowMessage;
use super::WindowState;
use display_plugins_api::utils;
use display_plugins_api::Batch;
use display_plugins_api::Error;
use display_plugins_api::Surface;
use euclid::default::Size2D;
use glutin::dpi::LogicalSize;
use glutin::event_loop::EventLoop;
use glutin::window::WindowBuilder;
use glutin::ContextBuilder;
use glutin::GlProfile;
use glutin::GlRequest;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc::channel;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::sync::Mutex;

/// A glutin window seen from the render thread.
///
/// The window and its GL context live on the main thread, inside the
/// `GlWindowHeartbeat`. Batches and swaps are queued to it in order.
pub struct GlWindowSurface {
    sender: Mutex<Sender<GlWindowMessage>>,
    state: Arc<WindowState>,
    current: AtomicUsize,
}

impl GlWindowSurface {
    // This function should be called from the main thread.
    pub fn new(
        title: &str,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<(Arc<GlWindowSurface>, GlWindowHeartbeat), Error> {
        let event_loop = EventLoop::new();
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(LogicalSize::new(width, height))
            .with_visible(false);
        let context = ContextBuilder::new()
            .with_gl(GlRequest::Latest)
            .with_gl_profile(GlProfile::Core)
            .with_vsync(vsync)
            .build_windowed(window, &event_loop)
            .map_err(|err| Error::Context(format!("failed to create window: {}", err)))?;

        let size = context.window().inner_size();
        let state = Arc::new(WindowState::new(Size2D::new(size.width, size.height), vsync));
        let (sender, receiver) = channel();
        let heartbeat = GlWindowHeartbeat::new(receiver, context, event_loop, state.clone())?;
        let surface = GlWindowSurface {
            sender: Mutex::new(sender),
            state,
            current: AtomicUsize::new(0),
        };
        Ok((Arc::new(surface), heartbeat))
    }

    pub(crate) fn state(&self) -> &Arc<WindowState> {
        &self.state
    }

    pub(crate) fn send(&self, msg: GlWindowMessage) -> Result<(), Error> {
        utils::lock(&self.sender)
            .send(msg)
            .map_err(|_| Error::Context("window heartbeat has stopped".into()))
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Asks the heartbeat to close the window.
    pub fn close(&self) {
        let _ = self.send(GlWindowMessage::Exit);
    }

    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) > 0
    }
}

impl Drop for GlWindowSurface {
    fn drop(&mut self) {
        self.close();
    }
}

impl Surface for GlWindowSurface {
    fn make_current(&self) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::Context("window was closed".into()));
        }
        self.current.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn done_current(&self) {
        let _ = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |depth| depth.checked_sub(1));
    }

    fn swap_buffers(&self) -> Result<(), Error> {
        if !self.is_current() {
            return Err(Error::Context("swap without a current context".into()));
        }
        self.send(GlWindowMessage::Swap)
    }

    fn render(&self, batch: Batch) {
        if let Err(err) = self.send(GlWindowMessage::Render(batch)) {
            warn!("Dropped batch ({})", err);
        }
    }

    fn size(&self) -> Size2D<u32> {
        *utils::lock(&self.state.size)
    }

    fn device_pixel_ratio(&self) -> f32 {
        *utils::lock(&self.state.scale_factor)
    }

    fn has_focus(&self) -> bool {
        self.state.focused.load(Ordering::SeqCst)
    }

    // The swap interval is fixed when the context is created.
    fn set_vsync(&self, enabled: bool) -> bool {
        let vsync = self.is_vsync_enabled();
        if vsync != enabled {
            debug!("Window context keeps its swap interval");
        }
        vsync
    }

    fn is_vsync_enabled(&self) -> bool {
        self.state.vsync.load(Ordering::SeqCst)
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        let _ = self.send(GlWindowMessage::SetFullscreen(fullscreen));
    }

    fn set_visible(&self, visible: bool) {
        let _ = self.send(GlWindowMessage::SetVisible(visible));
    }
}
