//! Domain types and DTOs
//!
//! These types define the data structures shared by the store, the
//! backing service clients and the HTTP surface.

pub mod chat;
pub mod incidents;
pub mod stats;
pub mod technicians;

// Re-export commonly used types
pub use chat::*;
pub use incidents::*;
pub use stats::*;
pub use technicians::*;
