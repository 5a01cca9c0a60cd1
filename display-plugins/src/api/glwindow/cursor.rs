use super::surface::GlWindowSurface;
use super::GlWindowMessage;
use crate::compositor::CursorHost;
use display_plugins_api::utils;
use euclid::default::Point2D;
use euclid::default::Rect;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

/// Cursor and window geometry of a glutin window.
///
/// There are no native menus or other top-level windows. Synthetic mouse
/// moves are kept for the host application to pick up.
pub struct GlWindowCursorHost {
    surface: Arc<GlWindowSurface>,
    mouse_moves: Mutex<Vec<Point2D<f32>>>,
}

impl GlWindowCursorHost {
    pub fn new(surface: Arc<GlWindowSurface>) -> GlWindowCursorHost {
        GlWindowCursorHost {
            surface,
            mouse_moves: Mutex::new(Vec::new()),
        }
    }

    pub fn take_mouse_moves(&self) -> Vec<Point2D<f32>> {
        std::mem::take(&mut *utils::lock(&self.mouse_moves))
    }
}

impl CursorHost for GlWindowCursorHost {
    fn cursor_position(&self) -> Point2D<i32> {
        *utils::lock(&self.surface.state().cursor)
    }

    fn set_cursor_position(&self, position: Point2D<i32>) {
        *utils::lock(&self.surface.state().cursor) = position;
        if let Err(err) = self.surface.send(GlWindowMessage::WarpCursor(position)) {
            debug!("Cursor warp dropped ({})", err);
        }
    }

    fn widget_geometry(&self) -> Rect<i32> {
        *utils::lock(&self.surface.state().geometry)
    }

    fn screen_geometry(&self) -> Rect<i32> {
        *utils::lock(&self.surface.state().screen)
    }

    fn other_window_frames(&self) -> Vec<Rect<i32>> {
        Vec::new()
    }

    fn has_active_window(&self) -> bool {
        self.surface.state().focused.load(Ordering::SeqCst)
    }

    fn is_menu_shown(&self) -> bool {
        false
    }

    fn send_mouse_move(&self, position: Point2D<f32>) {
        utils::lock(&self.mouse_moves).push(position);
    }
}
