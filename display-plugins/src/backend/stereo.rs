use super::desktop;
use crate::compositor::CompositorHelper;
use display_plugins_api::Batch;
use display_plugins_api::Eye;
use display_plugins_api::Frame;
use display_plugins_api::Geometry;
use display_plugins_api::PerEye;
use display_plugins_api::PipelineKind;
use display_plugins_api::TextureSource;
use display_plugins_api::Uniforms;
use euclid::default::Point2D;
use euclid::default::Rect;
use euclid::default::Size2D;
use euclid::default::Transform3D;

pub const DEFAULT_IPD: f32 = 0.064;

/// How a passive 3D display expects the two eyes to be packed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StereoLayout {
    // Left eye in the left half of the window, right eye in the right half
    SideBySide,
    // Even rows for the left eye, odd rows for the right eye
    Interleaved,
}

impl StereoLayout {
    pub fn name(self) -> &'static str {
        match self {
            StereoLayout::SideBySide => "3D TV - Side by Side Stereo",
            StereoLayout::Interleaved => "3D TV - Interleaved",
        }
    }

    /// Both eyes side by side at full window resolution each. Interleaving
    /// keeps every other row so each eye only needs half the height.
    pub fn render_size(self, window: Size2D<u32>) -> Size2D<u32> {
        match self {
            StereoLayout::SideBySide => Size2D::new(window.width * 2, window.height),
            StereoLayout::Interleaved => Size2D::new(window.width * 2, window.height / 2),
        }
    }

    pub fn eye_viewports(self, window: Size2D<u32>) -> PerEye<Rect<i32>> {
        let half = Size2D::new(window.width as i32 / 2, window.height as i32);
        PerEye::new(
            Rect::new(Point2D::new(0, 0), half),
            Rect::new(Point2D::new(window.width as i32 - half.width, 0), half),
        )
    }

    /// Parallel frusta shifted by half the IPD. No toe-in.
    pub fn eye_projection(self, eye: Eye, base_projection: &Transform3D<f32>, ipd: f32) -> Transform3D<f32> {
        let shift = match eye {
            Eye::Left => ipd / 2.0,
            Eye::Right => -ipd / 2.0,
        };
        Transform3D::translation(shift, 0.0, 0.0).then(base_projection)
    }

    pub fn eye_to_head(self, eye: Eye, ipd: f32) -> Transform3D<f32> {
        match eye {
            Eye::Left => Transform3D::translation(-ipd / 2.0, 0.0, 0.0),
            Eye::Right => Transform3D::translation(ipd / 2.0, 0.0, 0.0),
        }
    }

    pub fn composite(self, frame: &Frame, window: Size2D<u32>, compositor: &CompositorHelper) -> Batch {
        let viewport = Rect::from_size(window.to_i32());
        let mut batch = desktop::begin_window_batch(viewport);
        batch.set_texture(TextureSource::External(frame.scene.texture));
        match self {
            StereoLayout::SideBySide => {
                batch.set_pipeline(PipelineKind::Present);
                batch.set_uniforms(Uniforms::Present {
                    uv_rect: desktop::FULL_UV_RECT,
                });
                batch.draw(Geometry::Quad);
                let eyes = self.eye_viewports(window);
                let viewports = [eyes[Eye::Left], eyes[Eye::Right]];
                desktop::composite_flat_overlay(&mut batch, frame, compositor, &viewports);
                desktop::composite_flat_pointer(&mut batch, compositor, &viewports);
            },
            StereoLayout::Interleaved => {
                batch.set_pipeline(PipelineKind::Interleaved);
                batch.set_uniforms(Uniforms::Interleaved { size: window });
                batch.draw(Geometry::Quad);
                // Zero parallax UI on top of the interleaved scene
                desktop::composite_flat_overlay(&mut batch, frame, compositor, &[viewport]);
                desktop::composite_flat_pointer(&mut batch, compositor, &[viewport]);
            },
        }
        batch
    }
}
