//! Internal implementation details.

pub(crate) mod guard;
