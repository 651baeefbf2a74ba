//! I/O support for dgflow.
//!
//! This crate provides:
//! - **JSON parameter files** with defaults and eager validation on load
//! - **Run reports** (`.json` plus a short `.sta` status table) with solver statistics

pub mod error;
mod parameters;
mod report;

pub use error::{IoError, Result};
pub use parameters::{load_parameters, save_parameters};
pub use report::{
    ReportPaths, RunReport, RunStatus, SolveStatistics, load_report, write_report, write_sta,
};
