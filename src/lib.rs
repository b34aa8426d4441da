//! Pain-point labeling and subtopic clustering for app-store review tables.

pub mod config;
pub mod display;
pub mod qj;
