//! Persistence layer: one module per relation family.
//!
//! Functions take either a pool or a generic SQLite executor so multi-step
//! flows can run them inside a single transaction.

pub mod items;
pub mod lists;
pub mod titles;
pub mod users;
pub mod viewing;
