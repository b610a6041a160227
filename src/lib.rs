//! viewstats library
//!
//! Hit path resolution over region trees and session segmentation over
//! visit events, plus the file and metrics edges used by the CLI.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
