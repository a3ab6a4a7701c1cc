//! cairn-core - domain layer for the cairn project tracker.
//!
//! This crate owns everything that does not touch HTTP or durable storage
//! directly:
//!
//! - the entity model ([`model`]) and its partial-merge patch types,
//! - the authorization policy ([`policy`]) as pure predicate functions,
//! - the store traits ([`store`]) with in-memory implementations,
//! - the fire-and-forget activity recorder ([`recorder`]),
//! - credentials and bearer tokens ([`auth`]),
//! - configuration ([`config`]) and the error taxonomy ([`error`]).
//!
//! The server crate implements the store traits against SQLite and wires
//! the handlers; nothing in here depends on axum.

pub mod auth;
pub mod config;
pub mod error;
pub mod model;
pub mod page;
pub mod policy;
pub mod recorder;
pub mod store;

pub use error::Error;
pub use page::{Page, PageParams, Sort};
pub use policy::{Caller, can_access_project, can_mutate_privileged};
pub use recorder::ActivityRecorder;
