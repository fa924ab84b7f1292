//! Shared client state.
//!
//! DESIGN
//! ======
//! Two stores, each owned by the application root and handed to consumers
//! through [`crate::context::AppContext`]. Neither is reachable through a
//! global; code that needs one receives it explicitly.

pub mod session;
pub mod theme;
