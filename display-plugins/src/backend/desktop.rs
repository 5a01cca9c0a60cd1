use crate::compositor::CompositorHelper;
use display_plugins_api::Batch;
use display_plugins_api::Frame;
use display_plugins_api::FramebufferTarget;
use display_plugins_api::Geometry;
use display_plugins_api::PipelineKind;
use display_plugins_api::TextureSource;
use display_plugins_api::Uniforms;
use euclid::default::Rect;
use euclid::default::Size2D;
use euclid::default::Transform3D;
use euclid::default::Vector3D;

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
pub const FULL_UV_RECT: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
pub const NO_GLOW_POINTS: [[f32; 2]; 2] = [[-1.0, -1.0]; 2];

/// Scene, flat UI overlay and cursor into the window's back buffer.
pub fn composite(frame: &Frame, window: Size2D<u32>, compositor: &CompositorHelper) -> Batch {
    let viewport = Rect::from_size(window.to_i32());
    let mut batch = begin_window_batch(viewport);
    batch.set_pipeline(PipelineKind::Present);
    batch.set_texture(TextureSource::External(frame.scene.texture));
    batch.set_uniforms(Uniforms::Present { uv_rect: FULL_UV_RECT });
    batch.draw(Geometry::Quad);
    composite_flat_overlay(&mut batch, frame, compositor, &[viewport]);
    composite_flat_pointer(&mut batch, compositor, &[viewport]);
    batch
}

pub fn begin_window_batch(viewport: Rect<i32>) -> Batch {
    let mut batch = Batch::new();
    batch.set_framebuffer(FramebufferTarget::Default);
    batch.set_viewport(viewport);
    batch.clear(CLEAR_COLOR);
    batch
}

/// Draws the UI texture as a full viewport quad in each viewport.
pub fn composite_flat_overlay(batch: &mut Batch, frame: &Frame, compositor: &CompositorHelper, viewports: &[Rect<i32>]) {
    let overlay = match frame.overlay {
        Some(overlay) => overlay,
        None => return,
    };
    batch.set_pipeline(PipelineKind::Overlay);
    batch.set_texture(TextureSource::External(overlay.texture));
    batch.set_uniforms(Uniforms::Overlay {
        mvp: Transform3D::identity(),
        alpha: compositor.alpha(),
        glow_points: NO_GLOW_POINTS,
        glow_colors: [[0.0; 4]; 2],
    });
    for viewport in viewports {
        batch.set_viewport(*viewport);
        batch.draw(Geometry::Quad);
    }
}

/// Draws the cursor sprite at the OS cursor in each viewport.
pub fn composite_flat_pointer(batch: &mut Batch, compositor: &CompositorHelper, viewports: &[Rect<i32>]) {
    if !compositor.is_reticle_visible() {
        return;
    }
    batch.set_pipeline(PipelineKind::Cursor);
    batch.set_texture(TextureSource::Cursor);
    batch.set_uniforms(Uniforms::Cursor {
        mvp: compositor.reticle_transform(&Transform3D::identity(), Vector3D::zero()),
    });
    for viewport in viewports {
        batch.set_viewport(*viewport);
        batch.draw(Geometry::Quad);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::SimulatedCursorHost;
    use display_plugins_api::Layer;
    use euclid::default::Point2D;
    use std::sync::Arc;

    fn compositor() -> Arc<CompositorHelper> {
        let screen = Rect::new(Point2D::new(0, 0), Size2D::new(1920, 1080));
        CompositorHelper::new(Arc::new(SimulatedCursorHost::new(screen, screen)))
    }

    #[test]
    fn scene_then_overlay_then_cursor() {
        let compositor = compositor();
        let frame = Frame::new(1, Layer::new(1, 1920, 1080)).with_overlay(Layer::new(2, 1920, 1080));
        let batch = composite(&frame, Size2D::new(1920, 1080), &compositor);
        assert_eq!(
            batch.draws(),
            vec![
                (PipelineKind::Present, Geometry::Quad),
                (PipelineKind::Overlay, Geometry::Quad),
                (PipelineKind::Cursor, Geometry::Quad),
            ]
        );
    }

    #[test]
    fn hidden_reticle_and_missing_overlay_are_skipped() {
        let compositor = compositor();
        compositor.set_reticle_visible(false);
        let frame = Frame::new(1, Layer::new(1, 1920, 1080));
        let batch = composite(&frame, Size2D::new(1920, 1080), &compositor);
        assert_eq!(batch.draws(), vec![(PipelineKind::Present, Geometry::Quad)]);
    }
}
