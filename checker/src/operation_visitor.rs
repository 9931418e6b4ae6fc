// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The seam between the generic interpreter and a concrete analysis.
//!
//! The block, call and body visitors walk operations and keep entity keyed state up to date
//! for any analysis. What values operations produce, what entities hold before they are
//! assigned, and how block states combine is decided by an implementation of OperationVisitor.

use crate::abstract_domains::{AbstractDomain, AbstractValueDomain};
use crate::analysis_entity::AnalysisEntity;
use crate::body_visitor::BodyVisitor;
use crate::environment::Environment;
use crate::operation::{ConversionKind, Operation, TypeInfo};
use crate::points_to_value::PointsToAbstractValue;

use std::fmt::Debug;
use std::sync::Arc;

/// The state an entity keyed analysis associates with a program point.
pub trait EntityState<V: AbstractValueDomain>: Clone + Default + PartialEq + Debug {
    fn entities(&self) -> &Environment<Arc<AnalysisEntity>, V>;

    fn entities_mut(&mut self) -> &mut Environment<Arc<AnalysisEntity>, V>;
}

impl<V: AbstractValueDomain> EntityState<V> for Environment<Arc<AnalysisEntity>, V> {
    fn entities(&self) -> &Environment<Arc<AnalysisEntity>, V> {
        self
    }

    fn entities_mut(&mut self) -> &mut Environment<Arc<AnalysisEntity>, V> {
        self
    }
}

/// An analysis that can be run by the fixed point engine.
///
/// The hooks that compute operation values get the body visitor, so that they can consult
/// the values already computed for sub-operations and the current state. Implementations
/// are shared by routines that are analyzed in parallel, so per routine state belongs in the
/// body visitor, never in the analysis.
pub trait OperationVisitor: Sized + Sync {
    type Value: AbstractValueDomain;
    type Data: EntityState<Self::Value>;

    /// The value of an entity that has no entry in the current state.
    fn default_entity_value(&self, entity: &AnalysisEntity) -> Self::Value;

    /// The state on entry to the routine.
    fn initial_state(&self, bv: &BodyVisitor<'_, Self>) -> Self::Data;

    /// The conservative value of an operation that is not modeled more precisely.
    fn default_visit(&self, bv: &BodyVisitor<'_, Self>, operation: &Operation) -> Self::Value;

    /// The value of a creation operation. Called before the arguments and the initializer of the
    /// creation are visited, so that they can refer to the created instance.
    fn visit_creation(&self, bv: &BodyVisitor<'_, Self>, operation: &Operation) -> Self::Value {
        self.default_visit(bv, operation)
    }

    /// The value returned by an invocation, after its arguments have been visited. The state
    /// may be updated to reflect what the callee is known to do.
    fn visit_invocation(
        &self,
        bv: &mut BodyVisitor<'_, Self>,
        operation: &Operation,
        _return_type: &TypeInfo,
    ) -> Self::Value {
        self.default_visit(bv, operation)
    }

    /// The value of a conversion of an operand whose value has already been computed.
    fn visit_conversion(
        &self,
        bv: &BodyVisitor<'_, Self>,
        operation: &Operation,
        _conversion: ConversionKind,
        _operand_value: Self::Value,
    ) -> Self::Value {
        self.default_visit(bv, operation)
    }

    /// A chance to override the value computed for any operation before it is cached.
    fn post_process(
        &self,
        _bv: &BodyVisitor<'_, Self>,
        _operation: &Operation,
        value: Self::Value,
    ) -> Self::Value {
        value
    }

    /// Called before each top level operation of a block is interpreted.
    fn before_statement(&self, _bv: &mut BodyVisitor<'_, Self>) {}

    /// Entities whose value never changes once the routine has been entered.
    fn is_pinned(&self, _entity: &AnalysisEntity) -> bool {
        false
    }

    /// The value that is actually stored when value is assigned to entity.
    fn value_for_assignment(&self, _entity: &AnalysisEntity, value: Self::Value) -> Self::Value {
        value
    }

    /// The heap locations an already visited operation may refer to. Used to identify the
    /// members of heap objects.
    fn points_to_value(&self, bv: &BodyVisitor<'_, Self>, operation: &Operation) -> PointsToAbstractValue;

    /// Forgets everything that is known about the entities that satisfy the predicate.
    fn reset_entities<P>(&self, data: &mut Self::Data, predicate: P)
    where
        P: Fn(&AnalysisEntity) -> bool,
    {
        let unknown = Self::Value::unknown_or_may_be_value();
        data.entities_mut()
            .widen_matching(|entity, _| !self.is_pinned(entity) && predicate(entity), &unknown);
    }

    /// Forgets everything that is known, without dropping any entries.
    fn reset_all(&self, data: &mut Self::Data) {
        self.reset_entities(data, |_| true);
    }

    /// Combines the states that flow into a block along different edges.
    fn merge_data(&self, data1: &Self::Data, data2: &Self::Data) -> Self::Data;

    /// Combines the state previously computed for a loop anchor with a newer one, in a way
    /// that forces the loop to stabilize. Merging suffices for value domains of finite height.
    fn widen_data(&self, data: &Self::Data, previous: &Self::Data) -> Self::Data {
        self.merge_data(previous, data)
    }
}

/// Merges two entity maps, treating an entity missing on one side as having the value the
/// analysis gives to entities it has not seen yet, merged with unknown.
pub fn merge_entity_maps<A: OperationVisitor>(
    analysis: &A,
    map1: &Environment<Arc<AnalysisEntity>, A::Value>,
    map2: &Environment<Arc<AnalysisEntity>, A::Value>,
) -> Environment<Arc<AnalysisEntity>, A::Value> {
    map1.merge_with(map2, |entity, value| {
        let merged = value.merge(&A::Value::unknown_or_may_be_value());
        analysis.value_for_assignment(entity, merged)
    })
}
