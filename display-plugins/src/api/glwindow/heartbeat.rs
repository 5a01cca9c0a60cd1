use super::executor::BatchExecutor;
use super::GlWindowMessage;
use super::WindowState;
use display_plugins_api::utils;
use display_plugins_api::Error;
use euclid::default::Point2D;
use euclid::default::Rect;
use euclid::default::Size2D;
use gleam::gl;
use glutin::dpi::PhysicalPosition;
use glutin::event::Event;
use glutin::event::WindowEvent;
use glutin::event_loop::ControlFlow;
use glutin::event_loop::EventLoop;
use glutin::platform::run_return::EventLoopExtRunReturn;
use glutin::window::Fullscreen;
use glutin::window::Window;
use glutin::NotCurrent;
use glutin::PossiblyCurrent;
use glutin::WindowedContext;
use std::sync::atomic::Ordering;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(16);

/// Owns the window, its GL context and event loop. Must live on the thread
/// that created the window, which should call `heartbeat` regularly.
pub struct GlWindowHeartbeat {
    receiver: Receiver<GlWindowMessage>,
    context: WindowedContext<PossiblyCurrent>,
    event_loop: EventLoop<()>,
    executor: BatchExecutor,
    state: Arc<WindowState>,
    visible: bool,
}

impl GlWindowHeartbeat {
    pub(crate) fn new(
        receiver: Receiver<GlWindowMessage>,
        context: WindowedContext<NotCurrent>,
        event_loop: EventLoop<()>,
        state: Arc<WindowState>,
    ) -> Result<GlWindowHeartbeat, Error> {
        debug!("Creating window heartbeat");
        let context = match unsafe { context.make_current() } {
            Ok(context) => context,
            Err((_, err)) => {
                error!("Failed to make window current ({:?})", err);
                return Err(Error::Context(err.to_string()));
            },
        };
        let gl = unsafe { gl::GlFns::load_with(|symbol| context.get_proc_address(symbol) as *const _) };
        let executor = BatchExecutor::new(gl)?;

        let heartbeat = GlWindowHeartbeat {
            receiver,
            context,
            event_loop,
            executor,
            state,
            visible: false,
        };
        update_geometry(&heartbeat.state, heartbeat.context.window());
        Ok(heartbeat)
    }

    /// Pumps window events, then runs queued requests. While the window is
    /// shown this blocks until the render thread swaps or goes quiet.
    pub fn heartbeat(&mut self) {
        self.handle_window_events();
        loop {
            let msg = if self.visible {
                self.receiver.recv_timeout(TIMEOUT).ok()
            } else {
                self.receiver.try_recv().ok()
            };

            match msg {
                Some(msg) => {
                    if self.handle_msg(msg) {
                        break;
                    }
                },
                None => break,
            };
        }
    }

    pub fn heart_racing(&self) -> bool {
        self.visible
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    // Returns true at the end of a frame
    fn handle_msg(&mut self, msg: GlWindowMessage) -> bool {
        match msg {
            GlWindowMessage::Render(batch) => {
                self.executor.execute(&batch);
                false
            },
            GlWindowMessage::Swap => {
                if let Err(err) = self.context.swap_buffers() {
                    error!("Window swap failed ({:?})", err);
                }
                true
            },
            GlWindowMessage::SetFullscreen(fullscreen) => {
                let mode = if fullscreen {
                    Some(Fullscreen::Borderless(None))
                } else {
                    None
                };
                self.context.window().set_fullscreen(mode);
                false
            },
            GlWindowMessage::SetVisible(visible) => {
                debug!("Window {}", if visible { "shown" } else { "hidden" });
                self.context.window().set_visible(visible);
                self.visible = visible;
                false
            },
            GlWindowMessage::WarpCursor(position) => {
                let local = position - utils::lock(&self.state.geometry).origin.to_vector();
                let target = PhysicalPosition::new(local.x, local.y);
                if let Err(err) = self.context.window().set_cursor_position(target) {
                    debug!("Cursor warp unsupported ({:?})", err);
                }
                false
            },
            GlWindowMessage::Exit => {
                self.state.closed.store(true, Ordering::SeqCst);
                self.visible = false;
                true
            },
        }
    }

    fn handle_window_events(&mut self) {
        let context = &self.context;
        let state = &self.state;
        self.event_loop.run_return(|event, _, control_flow| {
            *control_flow = ControlFlow::Poll;
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::Resized(size) => {
                        context.resize(size);
                        *utils::lock(&state.size) = Size2D::new(size.width, size.height);
                        update_geometry(state, context.window());
                    },
                    WindowEvent::Moved(_) => update_geometry(state, context.window()),
                    WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                        *utils::lock(&state.scale_factor) = scale_factor as f32;
                    },
                    WindowEvent::Focused(focused) => state.focused.store(focused, Ordering::SeqCst),
                    WindowEvent::CursorMoved { position, .. } => {
                        let origin = utils::lock(&state.geometry).origin;
                        *utils::lock(&state.cursor) =
                            Point2D::new(origin.x + position.x as i32, origin.y + position.y as i32);
                    },
                    WindowEvent::CloseRequested => {
                        info!("Window closed");
                        state.closed.store(true, Ordering::SeqCst);
                        *control_flow = ControlFlow::Exit;
                    },
                    _ => {},
                },
                Event::MainEventsCleared => *control_flow = ControlFlow::Exit,
                _ => {},
            }
        });
    }
}

impl Drop for GlWindowHeartbeat {
    fn drop(&mut self) {
        self.state.closed.store(true, Ordering::SeqCst);
        self.executor.deinit();
    }
}

fn update_geometry(state: &WindowState, window: &Window) {
    let size = window.inner_size();
    let origin = window
        .inner_position()
        .map(|p| Point2D::new(p.x, p.y))
        .unwrap_or_else(|_| Point2D::origin());
    *utils::lock(&state.geometry) = Rect::new(origin, Size2D::new(size.width as i32, size.height as i32));
    *utils::lock(&state.scale_factor) = window.scale_factor() as f32;
    if let Some(monitor) = window.current_monitor() {
        let position = monitor.position();
        let size = monitor.size();
        *utils::lock(&state.screen) = Rect::new(
            Point2D::new(position.x, position.y),
            Size2D::new(size.width as i32, size.height as i32),
        );
    }
}
