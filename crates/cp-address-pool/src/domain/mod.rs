//! Domain layer: the allocation algorithm and its value objects.

pub mod config;
pub mod errors;
pub mod pool;
pub mod value_objects;

pub use config::PoolConfig;
pub use errors::PoolError;
pub use pool::AddressPool;
pub use value_objects::{
    LeasedAddress, PoolCounts, PoolHealth, PoolStatus, ProvisionReport,
};
