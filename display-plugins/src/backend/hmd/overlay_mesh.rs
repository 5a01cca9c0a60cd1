use crate::compositor::geometry::sphere_point;
use crate::compositor::geometry::VIRTUAL_UI_ASPECT_RATIO;
use crate::compositor::geometry::VIRTUAL_UI_TARGET_FOV_Y;

pub const OVERLAY_STACKS: u16 = 128;
pub const OVERLAY_SLICES: u16 = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct OverlayVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// The section of the unit sphere the UI texture is mapped onto, spanning
/// the compositor's target field of view.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayMesh {
    pub vertices: Vec<OverlayVertex>,
    // Triangle list
    pub indices: Vec<u16>,
}

impl OverlayMesh {
    pub fn build() -> OverlayMesh {
        OverlayMesh::with_resolution(OVERLAY_STACKS, OVERLAY_SLICES)
    }

    // UV mapping follows http://www.mvps.org/directx/articles/spheremap.htm
    pub fn with_resolution(stacks: u16, slices: u16) -> OverlayMesh {
        let fov = VIRTUAL_UI_TARGET_FOV_Y;
        let mut vertices = Vec::with_capacity(stacks as usize * slices as usize);
        for i in 0..stacks {
            // First stack is 0, last stack is 1
            let v = i as f32 / (stacks - 1) as f32;
            let pitch = -fov * (v - 0.5);
            for j in 0..slices {
                let u = j as f32 / (slices - 1) as f32;
                let yaw = -fov * VIRTUAL_UI_ASPECT_RATIO * (u - 0.5);
                let p = sphere_point(yaw, pitch);
                vertices.push(OverlayVertex {
                    position: [p.x, p.y, p.z],
                    uv: [u, v],
                });
            }
        }

        let rectangles = (stacks as usize - 1) * (slices as usize - 1);
        let mut indices = Vec::with_capacity(rectangles * 6);
        for i in 0..stacks - 1 {
            for j in 0..slices - 1 {
                let bottom_left = i * slices + j;
                let bottom_right = bottom_left + 1;
                let top_left = bottom_left + slices;
                let top_right = top_left + 1;
                indices.extend_from_slice(&[top_left, bottom_left, top_right]);
                indices.extend_from_slice(&[top_right, bottom_left, bottom_right]);
            }
        }

        OverlayMesh { vertices, indices }
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::geometry::VIRTUAL_UI_TARGET_FOV_X;

    #[test]
    fn full_resolution_counts() {
        let mesh = OverlayMesh::build();
        assert_eq!(mesh.vertices.len(), 128 * 64);
        assert_eq!(mesh.index_count(), 127 * 63 * 6);
        let max_index = *mesh.indices.iter().max().unwrap() as usize;
        assert_eq!(max_index, mesh.vertices.len() - 1);
    }

    #[test]
    fn mesh_spans_target_fov() {
        let mesh = OverlayMesh::with_resolution(3, 3);
        let center = mesh.vertices[4];
        assert_eq!(center.uv, [0.5, 0.5]);
        assert!((center.position[2] + 1.0).abs() < 1.0e-6);

        // u = 0 is half the horizontal FOV to the left
        let left = mesh.vertices[3];
        let yaw = (-left.position[0]).atan2(-left.position[2]);
        assert!((yaw - VIRTUAL_UI_TARGET_FOV_X / 2.0).abs() < 1.0e-4);
    }

    #[test]
    fn vertices_lie_on_unit_sphere() {
        for vertex in OverlayMesh::with_resolution(8, 8).vertices {
            let [x, y, z] = vertex.position;
            assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1.0e-5);
        }
    }
}
