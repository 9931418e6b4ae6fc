// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Computes, for every reference valued storage location and operation of a routine, the
//! set of abstract heap locations it may refer to.

use crate::abstract_domains::AbstractDomain;
use crate::abstract_location::AbstractLocation;
use crate::analysis_entity::{AnalysisEntity, EntityKind};
use crate::body_visitor::BodyVisitor;
use crate::cfg::RoutineBody;
use crate::environment::Environment;
use crate::fixed_point_visitor::DataFlowAnalysisResult;
use crate::operation::{ConversionKind, Operation, OperationId, RefKind, Symbol, TypeInfo};
use crate::operation_visitor::{merge_entity_maps, OperationVisitor};
use crate::options::Options;
use crate::points_to_value::PointsToAbstractValue;
use crate::summaries::Summary;

use log_derive::*;
use std::fmt::{Debug, Formatter, Result};
use std::sync::Arc;

/// The state of the points-to analysis at a program point.
pub type PointsToAnalysisData = Environment<Arc<AnalysisEntity>, PointsToAbstractValue>;

/// A flow sensitive, intra-procedural points-to analysis. Callees are not analyzed, their
/// results are fresh locations and their effects are approximated by forgetting what they
/// could have updated.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointsToAnalysis;

impl PointsToAnalysis {
    /// Analyzes a single routine body.
    #[logfn_inputs(DEBUG)]
    pub fn analyze(&self, body: &RoutineBody, options: &Options) -> PointsToAnalysisResult {
        let mut body_visitor = BodyVisitor::new(self, body, options);
        let this_value = body_visitor.this_value();
        let data_flow = body_visitor.visit_body();
        if data_flow.reached_iteration_limit {
            info!("routine {} did not reach a fixed point", body.name);
        }
        let summary = Summary::new(
            body,
            data_flow.routine_exit_state(),
            data_flow.reached_iteration_limit,
        );
        PointsToAnalysisResult {
            data_flow,
            this_value,
            summary,
        }
    }
}

/// The value a parameter has on entry to the routine.
fn parameter_value(parameter: &Symbol) -> PointsToAbstractValue {
    if parameter.ty.has_copy_semantics() {
        PointsToAbstractValue::NoLocation
    } else if parameter.ref_kind() == RefKind::Out {
        // The callee must assign an out parameter before reading it.
        PointsToAbstractValue::Undefined
    } else {
        AbstractLocation::for_symbol(parameter.clone()).into()
    }
}

/// The location of the object allocated by an operation.
fn allocation(operation: &Operation, ty: Option<&TypeInfo>) -> PointsToAbstractValue {
    let ty = ty
        .cloned()
        .unwrap_or_else(|| TypeInfo::type_parameter("?"));
    AbstractLocation::for_creation(operation.id, ty).into()
}

impl OperationVisitor for PointsToAnalysis {
    type Value = PointsToAbstractValue;
    type Data = PointsToAnalysisData;

    #[logfn_inputs(TRACE)]
    fn default_entity_value(&self, entity: &AnalysisEntity) -> PointsToAbstractValue {
        if entity.has_copy_semantics() {
            return PointsToAbstractValue::NoLocation;
        }
        match &entity.kind {
            EntityKind::ThisOrMe => entity.instance_location.clone(),
            EntityKind::Parameter { symbol } => parameter_value(symbol),
            _ if entity.is_routine_local() => PointsToAbstractValue::Undefined,
            _ => PointsToAbstractValue::Unknown,
        }
    }

    fn initial_state(&self, bv: &BodyVisitor<'_, Self>) -> PointsToAnalysisData {
        let mut state = PointsToAnalysisData::default();
        if let Some(this) = bv.entity_factory.this_or_me() {
            state.update_value_at(this.clone(), this.instance_location.clone());
        }
        for parameter in bv.body.parameters.iter() {
            state.update_value_at(
                AnalysisEntity::for_parameter(parameter),
                parameter_value(parameter),
            );
        }
        trace!("initial state {:?}", state);
        state
    }

    fn default_visit(&self, _bv: &BodyVisitor<'_, Self>, operation: &Operation) -> PointsToAbstractValue {
        if operation.has_constant() || operation.has_copy_semantics_type() {
            PointsToAbstractValue::NoLocation
        } else {
            PointsToAbstractValue::Unknown
        }
    }

    fn visit_creation(&self, _bv: &BodyVisitor<'_, Self>, operation: &Operation) -> PointsToAbstractValue {
        if operation.has_copy_semantics_type() {
            PointsToAbstractValue::NoLocation
        } else {
            allocation(operation, operation.ty.as_ref())
        }
    }

    fn visit_invocation(
        &self,
        _bv: &mut BodyVisitor<'_, Self>,
        operation: &Operation,
        return_type: &TypeInfo,
    ) -> PointsToAbstractValue {
        if return_type.has_copy_semantics() || return_type.is_void() {
            PointsToAbstractValue::NoLocation
        } else {
            allocation(operation, Some(return_type))
        }
    }

    fn visit_conversion(
        &self,
        bv: &BodyVisitor<'_, Self>,
        operation: &Operation,
        conversion: ConversionKind,
        operand_value: PointsToAbstractValue,
    ) -> PointsToAbstractValue {
        match conversion {
            ConversionKind::Identity | ConversionKind::Reference => operand_value,
            ConversionKind::Boxing => allocation(operation, operation.ty.as_ref()),
            _ => self.default_visit(bv, operation),
        }
    }

    fn post_process(
        &self,
        _bv: &BodyVisitor<'_, Self>,
        operation: &Operation,
        value: PointsToAbstractValue,
    ) -> PointsToAbstractValue {
        if operation.has_constant() || operation.has_copy_semantics_type() {
            PointsToAbstractValue::NoLocation
        } else {
            value
        }
    }

    fn before_statement(&self, bv: &mut BodyVisitor<'_, Self>) {
        if let Some(this) = bv.entity_factory.this_or_me().cloned() {
            let value = this.instance_location.clone();
            bv.current_data.update_value_at(this, value);
        }
    }

    fn is_pinned(&self, entity: &AnalysisEntity) -> bool {
        entity.has_copy_semantics() || entity.is_this_or_me()
    }

    fn value_for_assignment(
        &self,
        entity: &AnalysisEntity,
        value: PointsToAbstractValue,
    ) -> PointsToAbstractValue {
        if entity.has_copy_semantics() {
            PointsToAbstractValue::NoLocation
        } else {
            value
        }
    }

    fn points_to_value(&self, bv: &BodyVisitor<'_, Self>, operation: &Operation) -> PointsToAbstractValue {
        bv.operation_values
            .get(&operation.id)
            .cloned()
            .unwrap_or(PointsToAbstractValue::Unknown)
    }

    #[logfn(TRACE)]
    fn merge_data(
        &self,
        data1: &PointsToAnalysisData,
        data2: &PointsToAnalysisData,
    ) -> PointsToAnalysisData {
        merge_entity_maps(self, data1, data2)
    }

    #[logfn(TRACE)]
    fn widen_data(
        &self,
        data: &PointsToAnalysisData,
        previous: &PointsToAnalysisData,
    ) -> PointsToAnalysisData {
        data.widen_with(previous, |entity, value| {
            let merged = value.merge(&PointsToAbstractValue::Unknown);
            self.value_for_assignment(entity, merged)
        })
    }
}

/// What the points-to analysis found out about a routine.
pub struct PointsToAnalysisResult {
    pub data_flow: DataFlowAnalysisResult<PointsToAbstractValue, PointsToAnalysisData>,
    /// The location of the self instance, Undefined for static routines.
    pub this_value: PointsToAbstractValue,
    pub summary: Summary,
}

impl Debug for PointsToAnalysisResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("PointsToAnalysisResult({})", self.data_flow.routine_name))
    }
}

impl PointsToAnalysisResult {
    pub fn routine_name(&self) -> &Arc<str> {
        &self.data_flow.routine_name
    }

    pub fn reached_iteration_limit(&self) -> bool {
        self.data_flow.reached_iteration_limit
    }

    /// The value computed for the operation, None if the operation is unreachable.
    pub fn value_of_operation(&self, id: OperationId) -> Option<&PointsToAbstractValue> {
        self.data_flow.value_of_operation(id)
    }

    /// The locations the operation may refer to. Unreachable operations refer to nothing.
    pub fn points_to_value_of(&self, id: OperationId) -> PointsToAbstractValue {
        self.value_of_operation(id)
            .cloned()
            .unwrap_or(PointsToAbstractValue::Undefined)
    }

    /// The value of the entity when control leaves the routine, if it is tracked there.
    pub fn entity_value_at_exit(&self, entity: &Arc<AnalysisEntity>) -> Option<&PointsToAbstractValue> {
        self.data_flow.routine_exit_state()?.value_at(entity)
    }

    /// The value of the local variable with the given name when control leaves the routine.
    pub fn local_value_at_exit(&self, name: &str) -> Option<&PointsToAbstractValue> {
        self.data_flow
            .routine_exit_state()?
            .iter()
            .find(|(entity, _)| {
                matches!(&entity.kind, EntityKind::Local { symbol } if symbol.name.as_ref() == name)
            })
            .map(|(_, value)| value)
    }

    /// True unless the two operations are known to refer to disjoint sets of locations.
    pub fn may_alias(&self, op1: OperationId, op2: OperationId) -> bool {
        self.points_to_value_of(op1)
            .may_alias(&self.points_to_value_of(op2))
    }
}
