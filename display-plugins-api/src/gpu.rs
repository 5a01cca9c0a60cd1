use crate::eye::PerEye;
use euclid::default::Rect;
use euclid::default::Size2D;
use euclid::default::Transform3D;

/// Name of a texture owned by the application's share group.
pub type TextureId = u32;

/// Shader programs a display backend must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    // Textured quad, no blending
    Present,
    // Rotation-only timewarp of the scene texture
    Reprojection,
    // UI texture on the sphere section, alpha blended
    Overlay,
    // Reticle sprite, alpha blended
    Cursor,
    // Hand laser line, alpha blended
    Laser,
    // Row interleaving of a side-by-side stereo texture
    Interleaved,
}

impl PipelineKind {
    pub fn is_blended(self) -> bool {
        match self {
            PipelineKind::Overlay | PipelineKind::Cursor | PipelineKind::Laser => true,
            PipelineKind::Present | PipelineKind::Reprojection | PipelineKind::Interleaved => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureSource {
    External(TextureId),
    // The color attachment of the composite framebuffer
    Composite,
    // The backend's reticle image
    Cursor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramebufferTarget {
    // The window's back buffer
    Default,
    // Offscreen target the HMD passes composite into, created on demand
    Composite(Size2D<u32>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Geometry {
    // Unit quad in [-1, 1]
    Quad,
    // Sphere section built by the backend from the compositor FOV
    OverlaySphere,
    // Segment from the origin to (0, 0, -1)
    LaserLine,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Uniforms {
    Present {
        // Sampled region of the source texture: x, y, width, height in [0, 1]
        uv_rect: [f32; 4],
    },
    Reprojection {
        // Column-major mat3
        reprojection: [f32; 9],
        projections: PerEye<Transform3D<f32>>,
        inverse_projections: PerEye<Transform3D<f32>>,
    },
    Overlay {
        mvp: Transform3D<f32>,
        alpha: f32,
        // Overlay texture coordinates of the hand laser hits, (-1, -1) for none
        glow_points: [[f32; 2]; 2],
        glow_colors: [[f32; 4]; 2],
    },
    Cursor {
        mvp: Transform3D<f32>,
    },
    Laser {
        mvp: Transform3D<f32>,
        color: [f32; 4],
    },
    Interleaved {
        size: Size2D<u32>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    SetFramebuffer(FramebufferTarget),
    SetViewport(Rect<i32>),
    Clear([f32; 4]),
    SetPipeline(PipelineKind),
    SetTexture(TextureSource),
    SetUniforms(Uniforms),
    Draw(Geometry),
}

/// A recorded list of GPU commands, executed later by the surface backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Batch {
        Batch::default()
    }

    pub fn set_framebuffer(&mut self, target: FramebufferTarget) {
        self.commands.push(Command::SetFramebuffer(target));
    }

    pub fn set_viewport(&mut self, viewport: Rect<i32>) {
        self.commands.push(Command::SetViewport(viewport));
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(Command::Clear(color));
    }

    pub fn set_pipeline(&mut self, pipeline: PipelineKind) {
        self.commands.push(Command::SetPipeline(pipeline));
    }

    pub fn set_texture(&mut self, texture: TextureSource) {
        self.commands.push(Command::SetTexture(texture));
    }

    pub fn set_uniforms(&mut self, uniforms: Uniforms) {
        self.commands.push(Command::SetUniforms(uniforms));
    }

    pub fn draw(&mut self, geometry: Geometry) {
        self.commands.push(Command::Draw(geometry));
    }

    pub fn append(&mut self, other: Batch) {
        self.commands.extend(other.commands);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The pipeline bound at each draw, in submission order.
    pub fn draws(&self) -> Vec<(PipelineKind, Geometry)> {
        let mut pipeline = None;
        let mut draws = Vec::new();
        for command in &self.commands {
            match *command {
                Command::SetPipeline(kind) => pipeline = Some(kind),
                Command::Draw(geometry) => {
                    if let Some(kind) = pipeline {
                        draws.push((kind, geometry));
                    }
                },
                _ => {},
            }
        }
        draws
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_follow_bound_pipeline() {
        let mut batch = Batch::new();
        batch.draw(Geometry::Quad);
        batch.set_pipeline(PipelineKind::Present);
        batch.set_texture(TextureSource::External(3));
        batch.draw(Geometry::Quad);
        batch.set_pipeline(PipelineKind::Overlay);
        batch.draw(Geometry::OverlaySphere);
        batch.draw(Geometry::OverlaySphere);
        assert_eq!(
            batch.draws(),
            vec![
                (PipelineKind::Present, Geometry::Quad),
                (PipelineKind::Overlay, Geometry::OverlaySphere),
                (PipelineKind::Overlay, Geometry::OverlaySphere),
            ]
        );
    }

    #[test]
    fn append_keeps_order() {
        let mut first = Batch::new();
        first.clear([0.0; 4]);
        let mut second = Batch::new();
        second.set_pipeline(PipelineKind::Laser);
        first.append(second);
        assert_eq!(first.commands().len(), 2);
        assert_eq!(first.commands()[1], Command::SetPipeline(PipelineKind::Laser));
    }
}
