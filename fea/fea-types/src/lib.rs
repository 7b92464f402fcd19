//! Core types for the kinematic-constraint subsystem.
//!
//! This crate provides the foundational types shared by the constraint
//! family, the constraint container, and the wire protocol:
//!
//! - [`NodeId`], [`ElementId`] - mesh entity identifiers
//! - [`ConstraintTag`], [`CaseTag`], [`LoadTag`] - per-store unique tags
//! - [`ConstraintKind`], [`ConstraintRef`] - the back-reference vocabulary
//! - [`FeaError`] - the shared error enum
//! - [`RegistryConfig`] - container capacity and verbosity hints
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no behavior beyond accessors
//! and carry no references to live mesh objects. They're the common
//! language between:
//!
//! - The constraint type family (fea-constraint)
//! - The constraint container (fea-domain)
//! - The wire protocol (fea-wire)
//! - The owning analysis domain (external)
//!
//! # Tag Scoping
//!
//! A tag is unique *within one store*: two single-point constraints can
//! never share a [`ConstraintTag`], but a single-point and a multi-point
//! constraint can. Case registries have their own [`CaseTag`] space.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod config;
mod error;
mod id;

pub use config::RegistryConfig;
pub use error::FeaError;
pub use id::{CaseTag, ConstraintKind, ConstraintRef, ConstraintTag, ElementId, LoadTag, NodeId};

/// Result type for constraint-subsystem operations.
pub type Result<T> = std::result::Result<T, FeaError>;
