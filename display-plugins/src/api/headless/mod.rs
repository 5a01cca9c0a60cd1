mod surface;

pub use self::surface::HeadlessSurface;
