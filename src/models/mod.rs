//! Data models for flatstore.
//!
//! The only model a store needs is the [`Record`] contract its element type
//! implements.

mod record;

pub use record::{Record, short_type_name};
