//! # Domain Entities
//!
//! Core domain entities of the coordination service. Every entity is a
//! document in the persistent store, keyed by its id.
//!
//! ## Entities
//!
//! - **User**: Profile and settings of a registered user
//! - **ConnectionEntry**: Live connection ids of a user and last disconnect
//! - **Chat**: Individual (two users) or Group (wraps a group id) conversation
//! - **Message**: Content plus per-user Sent/Delivered/Read and delete markers
//! - **Group**: Group profile and participant role map
//! - **Call**: Voice/video call signaling state
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access
//! operations. The store offers no multi-document transactions, so the traits
//! expose point reads, whole-document writes and single-key patches only.
//! Implementations live in the infrastructure layer.

use std::sync::Arc;

mod user;
mod connection;
mod chat;
mod message;
mod group;
mod call;

pub use user::{Theme, User, UserRepository, UserSettings};

pub use connection::{ConnectionEntry, ConnectionRepository, Removal};

pub use chat::{earliest, Chat, ChatRepository, ChatType};

pub use message::{
    presentation_order, sort_for_presentation, ContentKind, DeleteScope, Message,
    MessageRepository, MessageStatus, StatusKind,
};

pub use group::{Group, GroupRepository, GroupRole};

pub use call::{Call, CallRepository, CallStatus, CallType};

/// The persistent store as the coordinators see it: one repository per
/// document collection, behind trait objects so backends can be swapped.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub connections: Arc<dyn ConnectionRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub calls: Arc<dyn CallRepository>,
}
