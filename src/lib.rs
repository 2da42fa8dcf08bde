//! Unattended payslip retrieval: logs into the employee document portal,
//! filters the document list to a time window, downloads each payslip and
//! copies it to a destination built from the dates in its file name.

pub mod app;
pub mod browser;
pub mod chromedriver_manager;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod download;
pub mod error;
pub mod logging;
pub mod materialize;
pub mod models;
pub mod portal;

pub use error::{RunError, RunResult};
