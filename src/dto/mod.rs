//! Wire payloads exchanged with the consultation backend.

pub mod health;
