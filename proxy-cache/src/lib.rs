//! Bounded key→response cache with selectable eviction policy and per-entry
//! hit-count expiry, plus the periodic cleaner that sweeps it.

pub mod cache;
pub mod cleaner;
pub mod policy;

pub use cache::ResponseCache;
pub use cleaner::spawn_cleaner;
pub use policy::EvictionPolicy;
