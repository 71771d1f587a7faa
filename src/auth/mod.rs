//! Route access control.
//!
//! Auth is a capability check with three outcomes. The [`guard`] function
//! decides what a route may do with each outcome and the middleware applies
//! that decision at dispatch time.

pub mod context;
pub mod guard;
pub mod middleware;

pub use context::{AuthProvider, AuthStatus, Principal};
pub use guard::{guard, Access, GuardDecision};
pub use middleware::{require_auth, RequireAuth};
