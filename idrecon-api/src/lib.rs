pub mod config;
pub mod database;
pub mod handlers;
pub mod helpers;
pub mod identity;

pub use database::{Database, IdentityBackend, MemoryDatabase};
