//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the
//! payloads exchanged on the message bus, the telemetry packet, and the
//! network abstraction used to move them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Navigation payload types (poses, remote commands, modes)
pub mod nav;

/// Bus topics and the parsing of inbound messages
pub mod msg;

/// Telemetry published by the navigation controller
pub mod tm;

/// Network module
pub mod net;
