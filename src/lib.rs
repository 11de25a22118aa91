//! # Chat Coordinator Library
//!
//! Real-time coordination for a multi-device chat application:
//! - Presence tracking across many live connections per user
//! - Message delivery and read tracking per recipient
//! - Group membership with admin continuity
//! - Call lifecycle and WebRTC signaling relay
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, repository traits and collaborator contracts
//! - **Application Layer**: The coordinators and their DTOs
//! - **Infrastructure Layer**: PostgreSQL, Redis, in-memory, blob and identity backends
//! - **Presentation Layer**: HTTP handlers and WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! chat_coordinator/
//! +-- config/         Configuration management
//! +-- domain/         Entities, repository traits, group policy
//! +-- application/    Coordinators, fan-out and DTOs
//! +-- infrastructure/ Store, registry, blob and identity implementations
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors, ids, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
