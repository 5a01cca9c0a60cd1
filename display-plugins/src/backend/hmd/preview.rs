use euclid::default::Point2D;
use euclid::default::Rect;
use euclid::default::Size2D;

/// Sampled region of the composite for the desktop mirror.
pub fn preview_uv_rect(mono: bool) -> [f32; 4] {
    if mono {
        // Left eye only
        [0.0, 0.0, 0.5, 1.0]
    } else {
        [0.0, 0.0, 1.0, 1.0]
    }
}

/// Largest viewport of the composite's aspect ratio centered in the
/// window, letterboxed or pillarboxed as needed.
pub fn mirror_viewport(window: Size2D<u32>, composite: Size2D<u32>, mono: bool) -> Rect<i32> {
    if window.width == 0 || window.height == 0 || composite.width == 0 || composite.height == 0 {
        return Rect::from_size(window.to_i32());
    }
    let window_aspect = window.width as f32 / window.height as f32;
    let mut scene_aspect = composite.width as f32 / composite.height as f32;
    if mono {
        scene_aspect /= 2.0;
    }
    let aspect_ratio = scene_aspect / window_aspect;

    let mut target = window.to_f32();
    if aspect_ratio < 1.0 {
        target.width *= aspect_ratio;
    } else {
        target.height /= aspect_ratio;
    }
    let target = target.round().to_i32();

    let mut origin = Point2D::zero();
    if target.width < window.width as i32 {
        origin.x = (window.width as i32 - target.width) / 2;
    } else if target.height < window.height as i32 {
        origin.y = (window.height as i32 - target.height) / 2;
    }
    Rect::new(origin, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_composite_is_letterboxed() {
        // 2:1 stereo composite into a 16:9 window
        let viewport = mirror_viewport(Size2D::new(1920, 1080), Size2D::new(3024, 1512), false);
        assert_eq!(viewport, Rect::new(Point2D::new(0, 60), Size2D::new(1920, 960)));
    }

    #[test]
    fn mono_composite_is_pillarboxed() {
        // One 1:1 eye into a 16:9 window
        let viewport = mirror_viewport(Size2D::new(1920, 1080), Size2D::new(3024, 1512), true);
        assert_eq!(viewport, Rect::new(Point2D::new(420, 0), Size2D::new(1080, 1080)));
    }

    #[test]
    fn matching_aspect_fills_window() {
        let viewport = mirror_viewport(Size2D::new(1600, 900), Size2D::new(3200, 900), true);
        assert_eq!(viewport, Rect::new(Point2D::new(0, 0), Size2D::new(1600, 900)));
    }

    #[test]
    fn empty_window_is_passed_through() {
        let viewport = mirror_viewport(Size2D::new(0, 0), Size2D::new(3024, 1512), false);
        assert_eq!(viewport.size, Size2D::new(0, 0));
    }
}
