pub mod config;
pub mod errors;
pub mod kernel;
pub mod selection;
pub mod traits;
pub mod types;
