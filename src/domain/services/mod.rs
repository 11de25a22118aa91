//! # Domain Services
//!
//! Domain services encapsulate business rules that don't naturally belong to
//! a single entity, plus the contracts of the collaborators the coordinators
//! depend on.
//!
//! ## Services
//!
//! - **GroupPolicy**: Group role map rules and admin continuity
//! - **IdentityProvider / BlobStore / FanoutTransport**: Collaborator contracts

mod collaborators;
mod group_policy;

pub use collaborators::*;
pub use group_policy::*;
