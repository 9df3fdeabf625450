use clap::ValueEnum;

/// The rule applied when `put` would push the store past `size_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EvictionPolicy {
    /// Clear the entire store.
    Entire,
    /// Remove the single least-recently-used entry.
    Lru,
    /// Do nothing; the store may grow past `size_limit`.
    None,
}
