//! # tarmed-service
//!
//! Runs the packaging core as a single tokio task.
//!
//! All session state (case table, categories, rules) lives in one
//! [`PackageManager`](tarmed_loader::PackageManager) owned by the core task.
//! Other tasks send requests through a [`PackagerHandle`]; loading and export
//! run on the blocking pool and are applied by the core once finished.

#![warn(missing_docs)]

pub mod config;
mod error;
mod server;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use server::{PackagerHandle, PackagerServer};
