//! Resolver policy definitions and attribution post-filters.

pub mod filter;
pub mod v1;

pub use filter::{AgreementFilter, AttributionFilter};
pub use v1::{InputMode, ResolverPolicy, WalkMode};
