//! Sinks for the scraped news items.
//!
//! # Submodules
//!
//! - [`json`]: Writes the whole run to a single JSON array for the web client
//! - [`database`]: Inserts items not yet stored into the MySQL `news` table
//!
//! Both sinks report how many items they saved and never abort the process
//! on a write error; only the initial database connection is fatal.

pub mod database;
pub mod json;
