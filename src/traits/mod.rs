//! Core traits for the lifecycle container.

mod dispose;
mod ordered;
mod resolver;

pub use dispose::{Dispose, DisposeFn};
pub use ordered::{Ordered, Precedence};
pub use resolver::{ComponentResolver, ResolverCore};

pub(crate) use ordered::{sort_by_precedence, Tier};
