// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt::Debug;

/// A join semi-lattice with a least element. The state of a basic block and the value
/// associated with a single entity are both elements of such domains.
///
/// merge must be idempotent, commutative and monotone: merge(a, b) is at least as imprecise
/// as a and as b, and merge(a, bottom()) == a.
pub trait AbstractDomain: Clone + PartialEq + Debug {
    /// The element that carries no information, i.e. corresponds to code that was not reached.
    fn bottom() -> Self;

    /// Returns the least upper bound (or a sound over approximation of it) of self and other.
    #[must_use]
    fn merge(&self, other: &Self) -> Self;

    /// Returns an upper bound of previous and self that is coarse enough to guarantee that
    /// repeatedly widening a growing chain of values terminates. Domains of finite height can
    /// use the default, which is just merge.
    #[must_use]
    fn widen(&self, previous: &Self) -> Self {
        previous.merge(self)
    }

    /// True if self is at least as precise as other.
    fn subset(&self, other: &Self) -> bool {
        self.merge(other) == *other
    }
}

/// A domain for the values associated with individual entities and operations.
/// In addition to bottom it has a distinguished top element that is used whenever the
/// analysis does not know, or cannot afford to know, anything about a value.
pub trait AbstractValueDomain: AbstractDomain {
    /// The maximally conservative element.
    fn unknown_or_may_be_value() -> Self;

    fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }

    fn is_unknown(&self) -> bool {
        *self == Self::unknown_or_may_be_value()
    }
}
