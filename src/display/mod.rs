//! Display formatting for terminal output
//!
//! Provides utilities for formatting backups, inspection results and
//! restore outcomes for terminal display.

pub mod backup;

pub use backup::{
    format_age, format_backup_info, format_backup_list, format_created_backup,
    format_restore_summary, format_size,
};
