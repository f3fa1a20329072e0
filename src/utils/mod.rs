//! Filesystem, process and terminal helpers.

pub mod exec;
pub mod fs;
pub mod git;
pub mod log;
