pub mod codec;
pub mod kernel;
pub mod partition;
pub mod pixel;
