//! # Domain Layer
//!
//! The domain layer contains the entities and rules of the coordination
//! service. It is independent of any external frameworks or infrastructure
//! concerns.
//!
//! ## Structure
//!
//! - **entities**: Documents of the persistent store and their repository traits
//! - **services**: Group role policy and collaborator contracts
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Entities encapsulate their own state rules (status maps, transitions)

pub mod entities;
pub mod services;

// Re-export commonly used types
pub use entities::*;
pub use services::*;
