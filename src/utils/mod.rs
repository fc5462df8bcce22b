pub mod config;
pub mod export;

pub use config::{ConnectionProfile, ProfileStore};
