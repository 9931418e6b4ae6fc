// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! State for analyses that attribute facts to what references point to, rather than to the
//! variables that hold the references. Such analyses run after a points-to analysis of the
//! same routine, which tells them which heap locations an operation may refer to.

use crate::abstract_domains::{AbstractDomain, AbstractValueDomain};
use crate::abstract_location::AbstractLocation;
use crate::analysis_entity::AnalysisEntity;
use crate::environment::Environment;
use crate::operation_visitor::EntityState;
use crate::points_to_value::PointsToAbstractValue;

use log_derive::*;
use std::fmt::{Debug, Formatter, Result};
use std::sync::Arc;

#[derive(Clone, PartialEq)]
pub struct LocationAnalysisData<V: AbstractValueDomain> {
    pub entities: Environment<Arc<AnalysisEntity>, V>,
    pub locations: Environment<AbstractLocation, V>,
}

impl<V: AbstractValueDomain> Default for LocationAnalysisData<V> {
    fn default() -> Self {
        LocationAnalysisData {
            entities: Environment::default(),
            locations: Environment::default(),
        }
    }
}

impl<V: AbstractValueDomain> Debug for LocationAnalysisData<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("LocationAnalysisData")
            .field("entities", &self.entities)
            .field("locations", &self.locations)
            .finish()
    }
}

impl<V: AbstractValueDomain> EntityState<V> for LocationAnalysisData<V> {
    fn entities(&self) -> &Environment<Arc<AnalysisEntity>, V> {
        &self.entities
    }

    fn entities_mut(&mut self) -> &mut Environment<Arc<AnalysisEntity>, V> {
        &mut self.entities
    }
}

impl<V: AbstractValueDomain> LocationAnalysisData<V> {
    /// The merge of the values of the locations a reference may point to. The default is used
    /// for locations that have no value yet. A reference that may point anywhere has the
    /// unknown value and a reference that points nowhere has the bottom value.
    pub fn value_at<F>(&self, points_to: &PointsToAbstractValue, default: F) -> V
    where
        F: Fn(&AbstractLocation) -> V,
    {
        match points_to.locations() {
            Some(locations) => locations
                .iter()
                .map(|location| match self.locations.value_at(location) {
                    Some(value) => value.clone(),
                    None => default(location),
                })
                .fold(V::bottom(), |acc, value| acc.merge(&value)),
            None if *points_to == PointsToAbstractValue::Unknown => V::unknown_or_may_be_value(),
            None => V::bottom(),
        }
    }

    /// Updates the locations a reference may point to. A reference to a single allocation site
    /// or parameter location gets a strong update. Otherwise the value is merged into the
    /// existing values, since it is not known which of the locations is actually updated.
    #[logfn_inputs(TRACE)]
    pub fn set_value_at(&mut self, points_to: &PointsToAbstractValue, value: V) {
        let locations = match points_to.locations() {
            Some(locations) => locations,
            None => {
                trace!("no location to update with {:?}", value);
                return;
            }
        };
        if locations.size() == 1 {
            for location in locations.iter() {
                self.locations.update_value_at(location.clone(), value.clone());
            }
            return;
        }
        for location in locations.iter() {
            let merged = match self.locations.value_at(location) {
                Some(existing) => existing.merge(&value),
                None => value.clone(),
            };
            self.locations.update_value_at(location.clone(), merged);
        }
    }

    /// Forgets everything known about heap locations, without dropping any of them.
    pub fn reset_locations(&mut self) {
        self.locations.widen_all_to(&V::unknown_or_may_be_value());
    }
}

impl<V: AbstractValueDomain> AbstractDomain for LocationAnalysisData<V> {
    fn bottom() -> Self {
        LocationAnalysisData::default()
    }

    fn merge(&self, other: &Self) -> Self {
        LocationAnalysisData {
            entities: self.entities.merge(&other.entities),
            locations: self.locations.merge(&other.locations),
        }
    }

    fn subset(&self, other: &Self) -> bool {
        self.entities.subset(&other.entities) && self.locations.subset(&other.locations)
    }
}
