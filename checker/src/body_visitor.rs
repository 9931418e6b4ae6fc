// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::abstract_domains::AbstractValueDomain;
use crate::abstract_location::AbstractLocation;
use crate::analysis_entity::{AnalysisEntity, AnalysisEntityFactory};
use crate::cfg::RoutineBody;
use crate::fixed_point_visitor::{DataFlowAnalysisResult, FixedPointVisitor};
use crate::operation::{Operation, OperationId, OperationKind};
use crate::operation_visitor::{EntityState, OperationVisitor};
use crate::options::Options;
use crate::points_to_value::PointsToAbstractValue;

use log_derive::*;
use mirai_annotations::*;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::sync::Arc;

/// Holds the state for the routine body visitor.
pub struct BodyVisitor<'analysis, A: OperationVisitor> {
    pub analysis: &'analysis A,
    pub body: &'analysis RoutineBody,
    pub options: &'analysis Options,
    pub entity_factory: AnalysisEntityFactory,
    /// The state at the program point that is currently being interpreted.
    pub current_data: A::Data,
    /// The value computed for each operation during the most recent visit of its block.
    pub operation_values: HashMap<OperationId, A::Value>,
    /// The creations whose initializers are being visited, innermost last.
    pub creation_stack: Vec<OperationId>,
}

impl<'analysis, A: OperationVisitor> Debug for BodyVisitor<'analysis, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "BodyVisitor".fmt(f)
    }
}

impl<'analysis, A: OperationVisitor> BodyVisitor<'analysis, A> {
    pub fn new(
        analysis: &'analysis A,
        body: &'analysis RoutineBody,
        options: &'analysis Options,
    ) -> BodyVisitor<'analysis, A> {
        // The self instance is the same location for the entire routine.
        let this_value = match &body.containing_type {
            Some(ty) => AbstractLocation::for_this_or_me(ty.clone()).into(),
            None => PointsToAbstractValue::Undefined,
        };
        BodyVisitor {
            analysis,
            body,
            options,
            entity_factory: AnalysisEntityFactory::new(body.containing_type.clone(), this_value),
            current_data: A::Data::default(),
            operation_values: HashMap::new(),
            creation_stack: Vec::new(),
        }
    }

    /// Analyze the body and return the state computed for each of its blocks.
    #[logfn_inputs(TRACE)]
    pub fn visit_body(&mut self) -> DataFlowAnalysisResult<A::Value, A::Data> {
        debug!("analyzing routine {}", self.body.name);
        let analysis = self.analysis;
        let first_state = analysis.initial_state(self);
        let mut fixed_point_visitor = FixedPointVisitor::new(self, first_state);
        fixed_point_visitor.visit_blocks();
        fixed_point_visitor.into_result()
    }

    /// The location of the self instance, Undefined for static routines.
    pub fn this_value(&self) -> PointsToAbstractValue {
        self.entity_factory
            .this_or_me()
            .map_or(PointsToAbstractValue::Undefined, |this| {
                this.instance_location.clone()
            })
    }

    /// The value computed for an operation that has already been visited.
    pub fn value_of(&self, operation: &Operation) -> A::Value {
        match self.operation_values.get(&operation.id) {
            Some(value) => value.clone(),
            None => {
                debug_checked_assume!(false, "{:?} has not been visited", operation.id);
                A::Value::unknown_or_may_be_value()
            }
        }
    }

    pub fn cache_value(&mut self, id: OperationId, value: A::Value) {
        self.operation_values.insert(id, value);
    }

    /// The value of the innermost creation whose initializer is being visited.
    pub fn value_of_current_creation(&self) -> Option<A::Value> {
        let id = self.creation_stack.last()?;
        self.operation_values.get(id).cloned()
    }

    /// The entity denoted by an already visited reference operation.
    pub fn try_create_entity(&self, operation: &Operation) -> Option<Arc<AnalysisEntity>> {
        let analysis = self.analysis;
        self.entity_factory
            .try_create(operation, &|instance| analysis.points_to_value(self, instance))
    }

    /// The current value of the entity.
    #[logfn_inputs(TRACE)]
    pub fn read_entity(&self, entity: &Arc<AnalysisEntity>) -> A::Value {
        match self.current_data.entities().value_at(entity) {
            Some(value) => value.clone(),
            None => self.analysis.default_entity_value(entity),
        }
    }

    /// Strong update of the entity. Entities that may be the same storage as the updated entity,
    /// and members of the updated entity, are widened since their values are no longer
    /// known to be accurate.
    #[logfn_inputs(TRACE)]
    pub fn write_entity(&mut self, entity: Arc<AnalysisEntity>, value: A::Value) {
        let analysis = self.analysis;
        let value = analysis.value_for_assignment(&entity, value);
        analysis.reset_entities(&mut self.current_data, |other| {
            entity.may_overlap_with(other) || entity.is_ancestor_of(other)
        });
        self.current_data.entities_mut().update_value_at(entity, value);
    }

    /// Called when a member or element is updated via an instance whose location is not known
    /// precisely enough to identify the updated entity.
    #[logfn_inputs(TRACE)]
    pub fn forget_member_updates(&mut self, target: &Operation) {
        let analysis = self.analysis;
        match &target.kind {
            OperationKind::FieldReference { field: member, .. }
            | OperationKind::PropertyReference {
                property: member, ..
            } => {
                analysis.reset_entities(&mut self.current_data, |e| e.is_member_named_by(member));
            }
            OperationKind::ArrayElementReference { .. } => {
                analysis.reset_entities(&mut self.current_data, AnalysisEntity::is_array_element);
            }
            _ => {}
        }
    }

    /// Forgets everything known about heap objects and static members.
    pub fn reset_heap(&mut self) {
        let analysis = self.analysis;
        analysis.reset_entities(&mut self.current_data, AnalysisEntity::is_heap_member);
    }

    /// Forgets everything that is known, keeping only pinned entities.
    pub fn reset_all(&mut self) {
        let analysis = self.analysis;
        analysis.reset_all(&mut self.current_data);
    }
}
