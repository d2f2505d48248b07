pub mod f32;
pub mod frame;
pub mod io;
pub mod traits;
pub mod u16;

pub use self::f32::ImageF32;
pub use self::frame::{ColorFrame, GrayFrame, RawDepthFrame, SensorFrame};
pub use self::traits::ImageView;
pub use self::u16::ImageU16;
