pub mod device;
pub mod utils;
