//! Instance identity and configuration.
//!
//! An instance has no stored record: its existence is whatever the container
//! runtime reports for the deterministic names in [`wiring`].

mod config;
mod live;
pub mod wiring;

pub use config::{
    ConfigOverrides, ConfigTable, InstanceConfig, InstanceDefaults, Limit, Ports,
    DEFAULT_INSTANCE,
};
pub use live::reconstruct_from_live;
pub use wiring::{InstanceNames, Role};
