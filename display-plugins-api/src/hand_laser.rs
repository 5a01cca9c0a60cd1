use bitflags::bitflags;
use euclid::default::Vector3D;

bitflags! {
    /// Set of hands a laser setting applies to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Hands: u8 {
        const LEFT = 0b01;
        const RIGHT = 0b10;
        const BOTH = Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }

    pub fn flag(self) -> Hands {
        match self {
            Hand::Left => Hands::LEFT,
            Hand::Right => Hands::RIGHT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialization", derive(Deserialize, Serialize))]
pub enum HandLaserMode {
    #[default]
    None,
    // Laser is clipped against the UI sphere
    Overlay,
    World,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialization", derive(Deserialize, Serialize))]
pub struct HandLaserInfo {
    pub mode: HandLaserMode,
    // RGBA
    pub color: [f32; 4],
    // Unit direction in hand space
    pub direction: Vector3D<f32>,
}

impl Default for HandLaserInfo {
    fn default() -> HandLaserInfo {
        HandLaserInfo {
            mode: HandLaserMode::None,
            color: [0.0; 4],
            direction: Vector3D::zero(),
        }
    }
}

impl HandLaserInfo {
    pub fn valid(&self) -> bool {
        self.mode != HandLaserMode::None && self.color[3] > 0.0 && self.direction != Vector3D::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_laser_is_invalid() {
        assert!(!HandLaserInfo::default().valid());
    }

    #[test]
    fn transparent_laser_is_invalid() {
        let laser = HandLaserInfo {
            mode: HandLaserMode::Overlay,
            color: [1.0, 0.0, 0.0, 0.0],
            direction: Vector3D::new(0.0, 0.0, -1.0),
        };
        assert!(!laser.valid());
        assert!(HandLaserInfo { color: [1.0, 0.0, 0.0, 1.0], ..laser }.valid());
    }

    #[test]
    fn both_hands_contains_each() {
        assert!(Hands::BOTH.contains(Hand::Left.flag()));
        assert!(Hands::BOTH.contains(Hand::Right.flag()));
        assert!(!Hands::LEFT.contains(Hand::Right.flag()));
    }
}
