mod device;

pub use self::device::{DebugHmdDevice, DebugHmdState};

use euclid::default::Rotation3D;
use euclid::default::Transform3D;

pub enum DebugHmdControlMsg {
    SetHeadPose(Transform3D<f32>),
    SetHandPoses([Transform3D<f32>; 2]),
    // Rotation the head makes between render and present
    SetPresentDrift(Rotation3D<f32>),
    Mount,
    Unmount,
    SetAvailable(bool),
    FailAcquire(bool),
    FailNextSubmit,
}
