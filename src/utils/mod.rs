pub mod config;
pub mod python;

pub use config::Config;
