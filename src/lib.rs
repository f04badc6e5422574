pub mod config;
pub mod core;
pub mod error;
pub mod scheduler;
pub mod utils;

pub use error::LaunchError;
