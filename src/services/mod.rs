//! Business logic above the stores: catalog access and multi-step flows.

pub mod catalog;
pub mod tracker;
