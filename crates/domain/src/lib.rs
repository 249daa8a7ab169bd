//! # boardhub-domain
//!
//! Pure domain model for the boardhub collaboration hub.
//!
//! ## Responsibilities
//! - Define **rooms** (one collaboration channel per kanban board)
//! - Define **event envelopes** (the typed message unit broadcast to room
//!   members) and the closed set of event kinds
//! - Define the error taxonomy shared across the workspace
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod event;
pub mod room;
