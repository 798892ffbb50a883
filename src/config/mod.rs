pub mod catalog_config;

pub use catalog_config::*;
