use std::ops::Index;
use std::ops::IndexMut;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialization", derive(Deserialize, Serialize))]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

pub fn for_each_eye<F: FnMut(Eye)>(mut f: F) {
    for eye in Eye::BOTH.iter() {
        f(*eye);
    }
}

/// One value per eye.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialization", derive(Deserialize, Serialize))]
pub struct PerEye<T> {
    pub left: T,
    pub right: T,
}

impl<T> PerEye<T> {
    pub fn new(left: T, right: T) -> PerEye<T> {
        PerEye { left, right }
    }

    pub fn from_fn<F: FnMut(Eye) -> T>(mut f: F) -> PerEye<T> {
        PerEye {
            left: f(Eye::Left),
            right: f(Eye::Right),
        }
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> PerEye<U> {
        PerEye {
            left: f(&self.left),
            right: f(&self.right),
        }
    }
}

impl<T> Index<Eye> for PerEye<T> {
    type Output = T;

    fn index(&self, eye: Eye) -> &T {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }
}

impl<T> IndexMut<Eye> for PerEye<T> {
    fn index_mut(&mut self, eye: Eye) -> &mut T {
        match eye {
            Eye::Left => &mut self.left,
            Eye::Right => &mut self.right,
        }
    }
}
