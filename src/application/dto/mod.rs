//! Data Transfer Objects
//!
//! Inbound request payloads, structured operation results and the events
//! pushed to live connections.

pub mod events;
pub mod request;
pub mod response;

pub use events::{
    ArchiveChanged, CallDeleted, ClientEvent, MessageEnvelope, PresenceChanged, SignalPayload,
    SignalRelayed,
};
pub use request::PhotoRef;
pub use response::{
    ChatSummary, ClearOutcome, GroupProfile, IndividualChat, MessageOutcome, ParticipantProfile,
    Presence, Recipient, RelayOutcome, UserProfile,
};
