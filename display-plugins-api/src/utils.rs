use euclid::default::Rotation3D;
use euclid::default::Transform3D;
use euclid::default::Vector3D;
use euclid::Angle;
use std::f32::consts::PI;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;
use time::OffsetDateTime;

pub const EPSILON: f32 = 1.0e-6;

static PLUGIN_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

// Generates a unique identifier for any DisplayPlugin
pub fn new_id() -> u32 {
    PLUGIN_ID_COUNTER.fetch_add(1, SeqCst) as u32
}

// Returns the current time in milliseconds
pub fn timestamp() -> f64 {
    let now = OffsetDateTime::now_utc();
    now.unix_timestamp_nanos() as f64 * 1e-6
}

// Returns the current time in seconds
pub fn seconds() -> f64 {
    timestamp() * 1e-3
}

// A panic on another thread leaves plain data behind, keep using it
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn read<T: ?Sized>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write<T: ?Sized>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub fn translation_of(m: &Transform3D<f32>) -> Vector3D<f32> {
    Vector3D::new(m.m41, m.m42, m.m43)
}

pub fn with_translation(m: &Transform3D<f32>, translation: Vector3D<f32>) -> Transform3D<f32> {
    let mut result = *m;
    result.m41 = translation.x;
    result.m42 = translation.y;
    result.m43 = translation.z;
    result
}

pub fn is_identity(m: &Transform3D<f32>) -> bool {
    *m == Transform3D::identity()
}

/// Extracts the rotation of an affine transform. Basis scale is divided out first.
// Adapted from http://www.euclideanspace.com/maths/geometry/rotations/conversions/matrixToQuaternion/index.htm
pub fn rotation_of(m: &Transform3D<f32>) -> Rotation3D<f32> {
    let a = m.to_arrays();
    let mut r = [[0.0f32; 3]; 3];
    for i in 0..3 {
        let len = (a[i][0] * a[i][0] + a[i][1] * a[i][1] + a[i][2] * a[i][2]).sqrt();
        if len > EPSILON {
            for j in 0..3 {
                r[i][j] = a[i][j] / len;
            }
        }
    }

    // Rows hold the images of the basis vectors, so element (i, j) of the
    // column-vector rotation matrix is r[j][i].
    let m = |i: usize, j: usize| r[j][i];
    let trace = m(0, 0) + m(1, 1) + m(2, 2);
    let (x, y, z, w) = if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        ((m(2, 1) - m(1, 2)) / s, (m(0, 2) - m(2, 0)) / s, (m(1, 0) - m(0, 1)) / s, 0.25 * s)
    } else if m(0, 0) > m(1, 1) && m(0, 0) > m(2, 2) {
        let s = (1.0 + m(0, 0) - m(1, 1) - m(2, 2)).sqrt() * 2.0;
        (0.25 * s, (m(0, 1) + m(1, 0)) / s, (m(0, 2) + m(2, 0)) / s, (m(2, 1) - m(1, 2)) / s)
    } else if m(1, 1) > m(2, 2) {
        let s = (1.0 + m(1, 1) - m(0, 0) - m(2, 2)).sqrt() * 2.0;
        ((m(0, 1) + m(1, 0)) / s, 0.25 * s, (m(1, 2) + m(2, 1)) / s, (m(0, 2) - m(2, 0)) / s)
    } else {
        let s = (1.0 + m(2, 2) - m(0, 0) - m(1, 1)).sqrt() * 2.0;
        ((m(0, 2) + m(2, 0)) / s, (m(1, 2) + m(2, 1)) / s, 0.25 * s, (m(1, 0) - m(0, 1)) / s)
    };

    Rotation3D::unit_quaternion(x, y, z, w)
}

fn from_basis(x: Vector3D<f32>, y: Vector3D<f32>, z: Vector3D<f32>, t: Vector3D<f32>) -> Transform3D<f32> {
    #[rustfmt::skip]
    let m = Transform3D::new(
        x.x, x.y, x.z, 0.0,
        y.x, y.y, y.z, 0.0,
        z.x, z.y, z.z, 0.0,
        t.x, t.y, t.z, 1.0,
    );
    m
}

/// Keeps the facing direction of `orientation` and levels it so its up axis
/// lies in the plane containing world up.
pub fn cancel_out_roll(orientation: &Rotation3D<f32>) -> Rotation3D<f32> {
    let forward = orientation.transform_vector3d(Vector3D::new(0.0, 0.0, -1.0));
    let up = Vector3D::new(0.0, 1.0, 0.0);
    let side = forward.cross(up);
    if side.length() < EPSILON || forward.length() < EPSILON {
        return *orientation;
    }
    let forward = forward.normalize();
    let x = side.normalize();
    let y = x.cross(forward);
    let basis = from_basis(x, y, -forward, Vector3D::zero());
    rotation_of(&basis)
}

/// Keeps only the yaw and the translation of a pose.
pub fn cancel_out_roll_and_pitch(m: &Transform3D<f32>) -> Transform3D<f32> {
    let z = Vector3D::new(m.m31, 0.0, m.m33);
    let z = if z.length() < EPSILON {
        Vector3D::new(0.0, 0.0, 1.0)
    } else {
        z.normalize()
    };
    let y = Vector3D::new(0.0, 1.0, 0.0);
    let x = y.cross(z);
    from_basis(x, y, z, translation_of(m))
}

/// Shortest rotation taking direction `from` onto direction `to`.
pub fn rotation_between(from: Vector3D<f32>, to: Vector3D<f32>) -> Rotation3D<f32> {
    if from.length() < EPSILON || to.length() < EPSILON {
        return Rotation3D::identity();
    }
    let from = from.normalize();
    let to = to.normalize();
    let d = from.dot(to);
    if d >= 1.0 - EPSILON {
        return Rotation3D::identity();
    }
    if d <= -1.0 + EPSILON {
        let mut axis = Vector3D::new(1.0, 0.0, 0.0).cross(from);
        if axis.length() < EPSILON {
            axis = Vector3D::new(0.0, 1.0, 0.0).cross(from);
        }
        return Rotation3D::around_axis(axis.normalize(), Angle::radians(PI));
    }
    let axis = from.cross(to);
    Rotation3D::unit_quaternion(axis.x, axis.y, axis.z, 1.0 + d)
}

/// Scale, then rotate, then translate.
pub fn scale_rotation_translation(
    scale: Vector3D<f32>,
    rotation: &Rotation3D<f32>,
    translation: Vector3D<f32>,
) -> Transform3D<f32> {
    Transform3D::scale(scale.x, scale.y, scale.z)
        .then(&rotation.to_transform())
        .then(&Transform3D::translation(translation.x, translation.y, translation.z))
}

/// Column-major 3x3 rotation matrix, as uploaded to a `mat3` uniform.
#[rustfmt::skip]
pub fn rotation_to_mat3(rotation: &Rotation3D<f32>) -> [f32; 9] {
    let m = rotation.to_transform();
    [
        m.m11, m.m12, m.m13,
        m.m21, m.m22, m.m23,
        m.m31, m.m32, m.m33,
    ]
}

pub fn is_identity_rotation(rotation: &Rotation3D<f32>) -> bool {
    rotation.i.abs() < EPSILON && rotation.j.abs() < EPSILON && rotation.k.abs() < EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_eq(a: Vector3D<f32>, b: Vector3D<f32>) {
        assert!((a - b).length() < 1.0e-4, "{:?} != {:?}", a, b);
    }

    #[test]
    fn rotation_of_recovers_rotation() {
        let rotation = Rotation3D::around_y(Angle::radians(0.7))
            .then(&Rotation3D::around_x(Angle::radians(-0.3)));
        let pose = rotation.to_transform().then(&Transform3D::translation(1.0, 2.0, 3.0));
        let recovered = rotation_of(&pose);
        let v = Vector3D::new(0.2, -0.5, 1.0);
        assert_vec_eq(recovered.transform_vector3d(v), rotation.transform_vector3d(v));
    }

    #[test]
    fn rotation_of_half_turn() {
        let rotation = Rotation3D::around_y(Angle::radians(PI));
        let recovered = rotation_of(&rotation.to_transform());
        let v = Vector3D::new(1.0, 0.0, 0.0);
        assert_vec_eq(recovered.transform_vector3d(v), Vector3D::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn cancel_out_roll_keeps_facing() {
        let yaw = Rotation3D::around_y(Angle::radians(0.5));
        let rolled = Rotation3D::around_z(Angle::radians(0.4)).then(&yaw);
        let level = cancel_out_roll(&rolled);
        let forward = Vector3D::new(0.0, 0.0, -1.0);
        assert_vec_eq(level.transform_vector3d(forward), yaw.transform_vector3d(forward));
        let up = level.transform_vector3d(Vector3D::new(0.0, 1.0, 0.0));
        assert_vec_eq(up, Vector3D::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn cancel_out_roll_and_pitch_keeps_yaw_and_position() {
        let rotation = Rotation3D::around_x(Angle::radians(0.6))
            .then(&Rotation3D::around_y(Angle::radians(1.0)));
        let pose = rotation.to_transform().then(&Transform3D::translation(0.5, 1.7, -2.0));
        let level = cancel_out_roll_and_pitch(&pose);
        assert_vec_eq(translation_of(&level), Vector3D::new(0.5, 1.7, -2.0));
        let up = level.transform_vector3d(Vector3D::new(0.0, 1.0, 0.0));
        assert_vec_eq(up, Vector3D::new(0.0, 1.0, 0.0));
        let yaw_only = Rotation3D::around_y(Angle::radians(1.0));
        let forward = Vector3D::new(0.0, 0.0, -1.0);
        assert_vec_eq(level.transform_vector3d(forward), yaw_only.transform_vector3d(forward));
    }

    #[test]
    fn rotation_between_directions() {
        let from = Vector3D::new(0.0, 0.0, -1.0);
        let to = Vector3D::new(1.0, 1.0, 0.0).normalize();
        assert_vec_eq(rotation_between(from, to).transform_vector3d(from), to);
        assert_vec_eq(rotation_between(from, -from).transform_vector3d(from), -from);
        assert!(is_identity_rotation(&rotation_between(from, from)));
    }

    #[test]
    fn scale_rotation_translation_order() {
        let rotation = Rotation3D::around_y(Angle::radians(PI / 2.0));
        let m = scale_rotation_translation(Vector3D::new(2.0, 2.0, 2.0), &rotation, Vector3D::new(0.0, 1.0, 0.0));
        let p = m.transform_point3d(euclid::default::Point3D::new(1.0, 0.0, 0.0)).unwrap();
        assert_vec_eq(p.to_vector(), Vector3D::new(0.0, 1.0, -2.0));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
