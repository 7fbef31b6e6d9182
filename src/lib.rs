pub mod core;
pub mod providers;

pub use crate::core::{errors::SessionError, traits::DashboardSource, types::*};
pub use providers::polygon::{build_session, PolygonClient, PolygonSession};
