//! Output formatting for batch reports

pub mod console;
