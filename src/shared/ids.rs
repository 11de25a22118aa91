//! Identifier Generation
//!
//! Entity ids are UUIDv7 strings: time-ordered, so their string ordering
//! follows creation order within the same millisecond resolution.

use uuid::Uuid;

/// Generate a new entity id.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Generate a connection id for a freshly accepted socket.
pub fn new_connection_id() -> String {
    Uuid::new_v4().to_string()
}
