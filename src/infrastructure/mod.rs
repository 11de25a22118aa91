//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Document repositories (PostgreSQL JSONB)
//! - Connection registry (Redis)
//! - In-memory backends for development and tests
//! - Blob storage, identity tokens and Prometheus metrics

pub mod blob;
pub mod cache;
pub mod database;
pub mod identity;
pub mod memory;
pub mod metrics;
pub mod repositories;
