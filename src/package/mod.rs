//! # Package records
//!
//! The `package` table: a name, a count and a period, plus audit timestamps.
//! Records are only created and read; nothing updates or deletes them.

/// sea-orm entity of the `package` table.
pub mod entity;

mod repository;

pub use entity::Model as Package;
pub use repository::{NewPackage, PackageRepository};
