//! Ports layer: the pool's API and its external collaborators.

pub mod inbound;
pub mod outbound;

pub use inbound::PoolApi;
pub use outbound::{AddressFormat, LeaseStore, LeaseTx, NewAddress, NewReservation};
