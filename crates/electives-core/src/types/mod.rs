//! Core type definitions used across the Electives workspace.

pub mod id;

pub use id::*;
