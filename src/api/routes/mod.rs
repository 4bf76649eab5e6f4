//! API Routes
//!
//! Route handlers organized by functionality.

pub mod dashboard;
pub mod health;
pub mod import;
pub mod map;
pub mod records;
pub mod regions;
