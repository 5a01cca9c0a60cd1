mod cursor;
mod executor;
mod heartbeat;
mod surface;

pub use self::cursor::GlWindowCursorHost;
pub use self::heartbeat::GlWindowHeartbeat;
pub use self::surface::GlWindowSurface;

use display_plugins_api::Batch;
use euclid::default::Point2D;
use euclid::default::Rect;
use euclid::default::Size2D;
use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

// Requests from the render thread, executed by the heartbeat on the thread
// that owns the window.
pub(crate) enum GlWindowMessage {
    Render(Batch),
    Swap,
    SetFullscreen(bool),
    SetVisible(bool),
    WarpCursor(Point2D<i32>),
    Exit,
}

// Window state mirrored from the event loop for other threads to read.
pub(crate) struct WindowState {
    pub size: Mutex<Size2D<u32>>,
    pub scale_factor: Mutex<f32>,
    // Inner area in global screen pixels
    pub geometry: Mutex<Rect<i32>>,
    pub screen: Mutex<Rect<i32>>,
    // Last known cursor position, in global screen pixels
    pub cursor: Mutex<Point2D<i32>>,
    pub focused: AtomicBool,
    pub vsync: AtomicBool,
    pub closed: AtomicBool,
}

impl WindowState {
    pub fn new(size: Size2D<u32>, vsync: bool) -> WindowState {
        let geometry = Rect::from_size(size.to_i32());
        WindowState {
            size: Mutex::new(size),
            scale_factor: Mutex::new(1.0),
            geometry: Mutex::new(geometry),
            screen: Mutex::new(geometry),
            cursor: Mutex::new(geometry.center()),
            focused: AtomicBool::new(false),
            vsync: AtomicBool::new(vsync),
            closed: AtomicBool::new(false),
        }
    }
}
