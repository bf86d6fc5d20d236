//! Command handlers.

pub mod export;
pub mod launch;
pub mod monitor;
pub mod status;
pub mod tasks;
