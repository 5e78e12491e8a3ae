//! Planner Backup - local backup and restore for an offline planner
//!
//! This library snapshots the planner's entities (events, meals, tasks and
//! notifications) into a single compressed, optionally encrypted file, and
//! restores such files back into the store with fresh identities.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path resolution and user settings
//! - `error`: Error types for every pipeline stage
//! - `models`: Planner entities and their enumerations
//! - `snapshot`: Snapshot records and the versioned JSON codec
//! - `crypto`: AES-256-GCM containers, Argon2id keys, device key stores
//! - `storage`: The entity store contract and a JSON file store
//! - `backup`: Compression, artifact files, the backup manager and importer
//! - `cli` / `display`: The `planner backup` commands and their output
//!
//! # Example
//!
//! ```rust,ignore
//! use planner_backup::cli::open_manager;
//! use planner_backup::config::{PlannerPaths, Settings};
//!
//! let paths = PlannerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let manager = open_manager(&paths, &settings)?;
//! let created = manager.create_backup(None, false)?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod models;
pub mod snapshot;
pub mod storage;

pub use error::{PlannerError, PlannerResult};
