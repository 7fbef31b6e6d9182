pub mod auth;
pub mod builder;
pub mod connector;
pub mod conversions;
pub mod parser;
pub mod payload;
pub mod rest;
pub mod types;

// Re-export main types for easier importing
pub use auth::{PolygonAuth, Session};
pub use builder::{build_session, login, login_and_build, PolygonClient};
pub use connector::PolygonSession;
pub use rest::PolygonRest;
pub use types::{RawAccountRecord, RawKeyDetail, RawKeySummary};
