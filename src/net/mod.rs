//! Backend wire layer: transport seam, DTOs, and typed endpoint helpers.

pub mod api;
pub mod transport;
pub mod types;
