// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::abstract_domains::{AbstractDomain, AbstractValueDomain};

use log_derive::logfn_inputs;
use serde::{Deserialize, Serialize};

/// A standard set-based abstraction for Booleans. `Bottom` represents the empty set,
/// `False` and `True` represent singleton sets {false} and {true}, respectively, and
/// `Top` represents {false, true}. Location keyed analyses use it to record per heap location
/// facts such as "may have been disposed".
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Copy, Clone, Serialize, Deserialize, Hash)]
pub enum BoolDomain {
    Bottom,
    False,
    True,
    Top,
}

impl From<bool> for BoolDomain {
    #[logfn_inputs(TRACE)]
    fn from(b: bool) -> BoolDomain {
        if b {
            BoolDomain::True
        } else {
            BoolDomain::False
        }
    }
}

/// Transfer functions
impl BoolDomain {
    /// The union of the two sets. Two different singletons make up the full set.
    #[logfn_inputs(TRACE)]
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        match (*self, *other) {
            (b1, b2) if b1 == b2 => b1,
            (BoolDomain::Bottom, b) | (b, BoolDomain::Bottom) => b,
            _ => BoolDomain::Top,
        }
    }

    /// Returns Some(b) if the set is the singleton {b}.
    pub fn as_bool_if_known(&self) -> Option<bool> {
        match self {
            BoolDomain::True => Some(true),
            BoolDomain::False => Some(false),
            _ => None,
        }
    }
}

impl AbstractDomain for BoolDomain {
    fn bottom() -> Self {
        BoolDomain::Bottom
    }

    fn merge(&self, other: &Self) -> Self {
        self.join(other)
    }
}

impl AbstractValueDomain for BoolDomain {
    fn unknown_or_may_be_value() -> Self {
        BoolDomain::Top
    }
}
