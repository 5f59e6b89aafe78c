#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use lidarkit_3d as k3d;

#[doc(inline)]
pub use lidarkit_analysis as analysis;

#[doc(inline)]
pub use lidarkit_storage as storage;
