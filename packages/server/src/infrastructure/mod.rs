//! Infrastructure layer: concrete transports and storage behind the domain traits.

pub mod repository;
pub mod transport;
