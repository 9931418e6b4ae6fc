// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::abstract_domains::{AbstractDomain, AbstractValueDomain};
use crate::abstract_location::AbstractLocation;
use crate::k_limits;

use log_derive::logfn_inputs;
use mirai_annotations::*;
use rpds::RedBlackTreeSetSync;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::hash::{Hash, Hasher};

pub type LocationSet = RedBlackTreeSetSync<AbstractLocation>;

/// The set of heap locations a reference may point to.
///
/// The lattice is Undefined < NoLocation < Unknown and Undefined < Known(s) < Unknown, with
/// Known(s1) < Known(s2) iff s1 is a subset of s2. Sets larger than
/// k_limits::MAX_TRACKED_LOCATIONS are not represented, they become Unknown.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum PointsToAbstractValue {
    /// Nothing is known yet, e.g. a local variable that has not been assigned on this path.
    Undefined,
    /// The value has no heap identity: a constant or a value with copy semantics.
    NoLocation,
    /// The value refers to one of these locations. Never empty.
    Known(LocationSet),
    /// The value may refer to anything.
    Unknown,
}

impl Debug for PointsToAbstractValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            PointsToAbstractValue::Undefined => f.write_str("Undefined"),
            PointsToAbstractValue::NoLocation => f.write_str("NoLocation"),
            PointsToAbstractValue::Known(locations) => f.debug_set().entries(locations.iter()).finish(),
            PointsToAbstractValue::Unknown => f.write_str("Unknown"),
        }
    }
}

impl Hash for PointsToAbstractValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        if let PointsToAbstractValue::Known(locations) = self {
            // The set iterates in order, so equal sets hash equally.
            for location in locations.iter() {
                location.hash(state);
            }
        }
    }
}

impl From<AbstractLocation> for PointsToAbstractValue {
    fn from(location: AbstractLocation) -> Self {
        PointsToAbstractValue::Known(RedBlackTreeSetSync::new_sync().insert(location))
    }
}

/// Constructors
impl PointsToAbstractValue {
    /// A value that refers to one of the given locations. Collapses to Unknown if there are
    /// too many of them and to Undefined if there are none.
    #[logfn_inputs(TRACE)]
    pub fn known(locations: Vec<AbstractLocation>) -> PointsToAbstractValue {
        let mut set = RedBlackTreeSetSync::new_sync();
        for location in locations {
            set.insert_mut(location);
        }
        Self::from_set(set)
    }

    fn from_set(set: LocationSet) -> PointsToAbstractValue {
        if set.is_empty() {
            PointsToAbstractValue::Undefined
        } else if set.size() > k_limits::MAX_TRACKED_LOCATIONS {
            debug!("points-to set of size {} widened to Unknown", set.size());
            PointsToAbstractValue::Unknown
        } else {
            PointsToAbstractValue::Known(set)
        }
    }
}

/// Queries
impl PointsToAbstractValue {
    pub fn is_known(&self) -> bool {
        matches!(self, PointsToAbstractValue::Known(..))
    }

    /// The locations of a Known value, None for the other kinds.
    pub fn locations(&self) -> Option<&LocationSet> {
        if let PointsToAbstractValue::Known(locations) = self {
            debug_checked_assume!(!locations.is_empty());
            Some(locations)
        } else {
            None
        }
    }

    pub fn contains(&self, location: &AbstractLocation) -> bool {
        self.locations().map_or(false, |l| l.contains(location))
    }

    /// True unless the two values are known to refer to disjoint sets of heap locations.
    /// Values without heap identity never alias anything.
    #[logfn_inputs(TRACE)]
    pub fn may_alias(&self, other: &PointsToAbstractValue) -> bool {
        use PointsToAbstractValue::*;
        match (self, other) {
            (Undefined, _) | (_, Undefined) | (NoLocation, _) | (_, NoLocation) => false,
            (Unknown, _) | (_, Unknown) => true,
            (Known(l1), Known(l2)) => l1.iter().any(|l| l2.contains(l)),
        }
    }
}

impl AbstractDomain for PointsToAbstractValue {
    fn bottom() -> Self {
        PointsToAbstractValue::Undefined
    }

    /// [Undefined merge x] -> x
    /// [Unknown merge _] -> Unknown
    /// [NoLocation merge NoLocation] -> NoLocation
    /// [NoLocation merge Known] -> Unknown
    /// [Known(s1) merge Known(s2)] -> Known(s1 union s2), Unknown if too large
    #[logfn_inputs(TRACE)]
    fn merge(&self, other: &Self) -> Self {
        use PointsToAbstractValue::*;
        match (self, other) {
            (Undefined, x) | (x, Undefined) => x.clone(),
            (Unknown, _) | (_, Unknown) => Unknown,
            (NoLocation, NoLocation) => NoLocation,
            (NoLocation, Known(..)) | (Known(..), NoLocation) => Unknown,
            (Known(l1), Known(l2)) => {
                let (mut larger, smaller) = if l1.size() >= l2.size() {
                    (l1.clone(), l2)
                } else {
                    (l2.clone(), l1)
                };
                for location in smaller.iter() {
                    larger.insert_mut(location.clone());
                }
                Self::from_set(larger)
            }
        }
    }

    /// [x widen Undefined] -> x
    /// [x widen previous] -> previous, if x adds nothing to previous
    /// [x widen previous] -> Unknown, otherwise
    #[logfn_inputs(TRACE)]
    fn widen(&self, previous: &Self) -> Self {
        if *previous == PointsToAbstractValue::Undefined {
            self.clone()
        } else if self.subset(previous) {
            previous.clone()
        } else {
            PointsToAbstractValue::Unknown
        }
    }
}

impl AbstractValueDomain for PointsToAbstractValue {
    fn unknown_or_may_be_value() -> Self {
        PointsToAbstractValue::Unknown
    }
}
