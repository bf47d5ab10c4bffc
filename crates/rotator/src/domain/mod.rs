pub mod admission;
#[cfg(test)]
pub(crate) mod mock;
pub mod queue;
pub mod rate_limiter;
pub mod reconciler;
pub mod replacement;
pub mod traits;
pub mod types;
