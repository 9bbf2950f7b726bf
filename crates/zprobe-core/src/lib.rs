pub mod config;
pub mod error;

pub use config::ZprobeConfig;
pub use error::{ZprobeError, ZprobeResult};
