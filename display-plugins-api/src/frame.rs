use crate::gpu::TextureId;
use euclid::default::Size2D;
use euclid::default::Transform3D;

/// A texture and the size of its used region.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialization", derive(Deserialize, Serialize))]
pub struct Layer {
    pub texture: TextureId,
    pub size: Size2D<u32>,
}

impl Layer {
    pub fn new(texture: TextureId, width: u32, height: u32) -> Layer {
        Layer {
            texture,
            size: Size2D::new(width, height),
        }
    }
}

/// One rendered frame handed to `DisplayPlugin::display`.
///
/// Stereo plugins expect the scene to hold both eyes side by side.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialization", derive(Deserialize, Serialize))]
pub struct Frame {
    pub frame_index: u32,
    pub scene: Layer,
    // The 2D UI, composited by the plugin. Desktop plugins draw it flat,
    // HMD plugins map it onto the UI sphere.
    pub overlay: Option<Layer>,
    // Head pose the scene was rendered with
    pub pose: Transform3D<f32>,
}

impl Frame {
    pub fn new(frame_index: u32, scene: Layer) -> Frame {
        Frame {
            frame_index,
            scene,
            overlay: None,
            pose: Transform3D::identity(),
        }
    }

    pub fn with_overlay(mut self, overlay: Layer) -> Frame {
        self.overlay = Some(overlay);
        self
    }

    pub fn with_pose(mut self, pose: Transform3D<f32>) -> Frame {
        self.pose = pose;
        self
    }
}
