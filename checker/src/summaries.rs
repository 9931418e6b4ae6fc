// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::analysis_entity::AnalysisEntity;
use crate::cfg::RoutineBody;
use crate::operation::{RefKind, SymbolKind};
use crate::points_to_analysis::PointsToAnalysisData;
use crate::points_to_value::PointsToAbstractValue;

use log_derive::logfn_inputs;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A summary is a declarative abstract description of what a routine makes visible to its
/// callers: what it returns and what it stores into the storage locations its callers passed
/// by reference. Parameters passed by value are not part of the summary, whatever the routine
/// did with them cannot be observed by the caller through the parameter.
///
/// This is calculated once per routine, from the state at the exit of the routine.
#[derive(Serialize, Deserialize, Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    /// If true this summary was computed. If false, it is a default summary.
    pub is_computed: bool,

    /// If true, the routine did not reach a fixed point within the iteration limit and the
    /// summary may be over specific.
    pub is_incomplete: bool,

    /// The heap locations the returned value may refer to. None if the routine does not
    /// return a value.
    pub return_value: Option<PointsToAbstractValue>,

    /// The values of the ref and out parameters at exit, in parameter order.
    pub by_ref_parameters: Vec<ParameterSummary>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct ParameterSummary {
    pub ordinal: usize,
    pub name: Arc<str>,
    pub ref_kind: RefKind,
    pub value: PointsToAbstractValue,
}

impl Summary {
    /// Builds the summary of body from its state at exit. A routine that never exits has
    /// nothing to publish, which is what Undefined values say.
    #[logfn_inputs(TRACE)]
    pub fn new(
        body: &RoutineBody,
        exit_state: Option<&PointsToAnalysisData>,
        is_incomplete: bool,
    ) -> Summary {
        let value_of = |entity: Arc<AnalysisEntity>| -> PointsToAbstractValue {
            exit_state
                .and_then(|state| state.value_at(&entity))
                .cloned()
                .unwrap_or(PointsToAbstractValue::Undefined)
        };
        let return_value = if body.return_type.is_void() {
            None
        } else if body.return_type.has_copy_semantics() {
            Some(PointsToAbstractValue::NoLocation)
        } else {
            Some(value_of(AnalysisEntity::for_result(body.return_type.clone())))
        };
        let by_ref_parameters = body
            .parameters
            .iter()
            .filter_map(|p| match p.kind {
                SymbolKind::Parameter { ordinal, ref_kind } if ref_kind.is_writable_by_callee() => {
                    Some(ParameterSummary {
                        ordinal,
                        name: p.name.clone(),
                        ref_kind,
                        value: value_of(AnalysisEntity::for_parameter(p)),
                    })
                }
                _ => None,
            })
            .collect();
        Summary {
            is_computed: true,
            is_incomplete,
            return_value,
            by_ref_parameters,
        }
    }

    /// The summary of the ref or out parameter with the given name, if there is one.
    pub fn by_ref_parameter(&self, name: &str) -> Option<&ParameterSummary> {
        self.by_ref_parameters
            .iter()
            .find(|p| p.name.as_ref() == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Summary> {
        serde_json::from_str(json)
    }
}
