use display_plugins_api::utils;
use euclid::default::Point2D;
use euclid::default::Rect;
use euclid::default::Vector2D;
use std::sync::Mutex;

/// The window system as seen by the compositor's mouse capture logic.
///
/// Positions are in global screen pixels unless stated otherwise.
pub trait CursorHost: Send + Sync {
    fn cursor_position(&self) -> Point2D<i32>;

    /// Warps the OS cursor. Typically produces a mouse move event.
    fn set_cursor_position(&self, position: Point2D<i32>);

    /// Geometry of the rendering widget.
    fn widget_geometry(&self) -> Rect<i32>;

    fn map_from_global(&self, position: Point2D<i32>) -> Point2D<i32> {
        position - self.widget_geometry().origin.to_vector()
    }

    fn map_to_global(&self, position: Point2D<i32>) -> Point2D<i32> {
        position + self.widget_geometry().origin.to_vector()
    }

    fn screen_geometry(&self) -> Rect<i32>;

    /// Frames of the visible top-level windows other than the main window.
    fn other_window_frames(&self) -> Vec<Rect<i32>>;

    /// Whether one of the application's windows has OS focus.
    fn has_active_window(&self) -> bool;

    /// Whether a native menu is open.
    fn is_menu_shown(&self) -> bool;

    /// Dispatches a synthetic mouse move at a widget-local position.
    fn send_mouse_move(&self, position: Point2D<f32>);
}

struct SimulatedState {
    cursor: Point2D<i32>,
    widget: Rect<i32>,
    screen: Rect<i32>,
    other_windows: Vec<Rect<i32>>,
    active: bool,
    menu_shown: bool,
    warps: Vec<Point2D<i32>>,
    mouse_moves: Vec<Point2D<f32>>,
}

/// An in-memory desktop, for headless sessions and tests.
pub struct SimulatedCursorHost {
    state: Mutex<SimulatedState>,
}

impl SimulatedCursorHost {
    pub fn new(screen: Rect<i32>, widget: Rect<i32>) -> SimulatedCursorHost {
        SimulatedCursorHost {
            state: Mutex::new(SimulatedState {
                cursor: widget.center(),
                widget,
                screen,
                other_windows: Vec::new(),
                active: true,
                menu_shown: false,
                warps: Vec::new(),
                mouse_moves: Vec::new(),
            }),
        }
    }

    /// Moves the cursor the way the user would, without recording a warp.
    pub fn move_cursor(&self, delta: Vector2D<i32>) {
        let mut state = utils::lock(&self.state);
        state.cursor += delta;
    }

    pub fn place_cursor(&self, position: Point2D<i32>) {
        utils::lock(&self.state).cursor = position;
    }

    pub fn set_active(&self, active: bool) {
        utils::lock(&self.state).active = active;
    }

    pub fn set_menu_shown(&self, shown: bool) {
        utils::lock(&self.state).menu_shown = shown;
    }

    pub fn add_window(&self, frame: Rect<i32>) {
        utils::lock(&self.state).other_windows.push(frame);
    }

    /// Positions the cursor was warped to, oldest first.
    pub fn warps(&self) -> Vec<Point2D<i32>> {
        utils::lock(&self.state).warps.clone()
    }

    pub fn mouse_moves(&self) -> Vec<Point2D<f32>> {
        utils::lock(&self.state).mouse_moves.clone()
    }
}

impl CursorHost for SimulatedCursorHost {
    fn cursor_position(&self) -> Point2D<i32> {
        utils::lock(&self.state).cursor
    }

    fn set_cursor_position(&self, position: Point2D<i32>) {
        let mut state = utils::lock(&self.state);
        state.cursor = position;
        state.warps.push(position);
    }

    fn widget_geometry(&self) -> Rect<i32> {
        utils::lock(&self.state).widget
    }

    fn screen_geometry(&self) -> Rect<i32> {
        utils::lock(&self.state).screen
    }

    fn other_window_frames(&self) -> Vec<Rect<i32>> {
        utils::lock(&self.state).other_windows.clone()
    }

    fn has_active_window(&self) -> bool {
        utils::lock(&self.state).active
    }

    fn is_menu_shown(&self) -> bool {
        utils::lock(&self.state).menu_shown
    }

    fn send_mouse_move(&self, position: Point2D<f32>) {
        utils::lock(&self.state).mouse_moves.push(position);
    }
}
