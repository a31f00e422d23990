pub mod types;
pub mod error;
pub mod config;
pub mod redis;
pub mod rate_limit;

pub use types::*;
pub use error::*;
pub use config::*;
pub use redis::*;
pub use rate_limit::*;
