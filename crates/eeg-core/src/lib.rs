pub mod auth;
pub mod bus;
pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod time_buckets;

pub use config::{AppEnv, EegConfig};
pub use error::{map_db_error, AppError};
