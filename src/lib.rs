// ABOUTME: Library root for cosimport - exposes the import controller and its collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod cloud;
pub mod config;
pub mod error;
pub mod events;
pub mod output;
pub mod reconcile;
pub mod resource;
pub mod scope;
pub mod store;
pub mod types;
