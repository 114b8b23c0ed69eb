//! Core domain concepts shared across all subdomains.
//!
//! - [`entity::EntityId`]: opaque identifier of a stored entity
//! - [`error::DomainError`]: domain-level errors
//! - [`error::ValidationError`]: problems with a submitted batch spec

pub mod entity;
pub mod error;
