//! # retrouve-shared
//!
//! Types shared between the Retrouvé chat backend crates: identifiers, the
//! message status state machine, the realtime wire protocol, and the preview
//! date formatting used by the inbox.
//!
//! This crate performs no I/O.

pub mod constants;
pub mod preview;
pub mod protocol;
pub mod types;

mod error;

pub use error::ProtocolError;
