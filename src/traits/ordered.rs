//! Ordering capability for lifecycle extensions.

use std::cmp::Ordering;

/// Priority tier an extension declares.
///
/// Extensions are processed strictly tier by tier: every
/// [`Precedence::Priority`] extension before any [`Precedence::Ordered`] one,
/// and those before every [`Precedence::Unordered`] one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precedence {
    /// Highest-priority tier with an order value (lower runs first).
    Priority(i32),
    /// Ordered tier with an order value (lower runs first).
    Ordered(i32),
    /// No declared order.
    Unordered,
}

impl Precedence {
    /// Declared order value, if any.
    pub fn order_value(self) -> Option<i32> {
        match self {
            Precedence::Priority(order) | Precedence::Ordered(order) => Some(order),
            Precedence::Unordered => None,
        }
    }

    pub(crate) fn tier(self) -> Tier {
        match self {
            Precedence::Priority(_) => Tier::Priority,
            Precedence::Ordered(_) => Tier::Ordered,
            Precedence::Unordered => Tier::Unordered,
        }
    }

    /// Compares by declared order; values without an order sort after every ordered one.
    pub fn compare(self, other: Precedence) -> Ordering {
        match (self.order_value(), other.order_value()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tier {
    Priority,
    Ordered,
    Unordered,
}

/// Capability tag implemented by every extension variant.
///
/// The default is [`Precedence::Unordered`]; override it to move an
/// extension into an earlier tier.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{Ordered, Precedence};
///
/// struct PlaceholderResolver;
///
/// impl Ordered for PlaceholderResolver {
///     fn precedence(&self) -> Precedence {
///         Precedence::Priority(10)
///     }
/// }
///
/// assert_eq!(PlaceholderResolver.precedence().order_value(), Some(10));
/// ```
pub trait Ordered {
    /// Tier and order value of this extension.
    fn precedence(&self) -> Precedence {
        Precedence::Unordered
    }
}

/// Stable sort by declared order; ties keep discovery order.
pub(crate) fn sort_by_precedence<T, F>(items: &mut [T], precedence: F)
where
    F: Fn(&T) -> Precedence,
{
    items.sort_by(|a, b| precedence(a).compare(precedence(b)));
}
