// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use log_derive::*;
use std::fmt::{Debug, Formatter, Result};

use crate::abstract_domains::AbstractValueDomain;
use crate::block_visitor::BlockVisitor;
use crate::operation::{Argument, InvocationTarget, Operation, TypeInfo};
use crate::operation_visitor::OperationVisitor;

/// Interprets a call. Callees are not analyzed, so the effects of a call on the state of the
/// caller are approximated from what the callee could possibly reach.
pub struct CallVisitor<'call, 'block, 'analysis, A: OperationVisitor> {
    pub block_visitor: &'call mut BlockVisitor<'block, 'analysis, A>,
    pub operation: &'call Operation,
}

impl<'call, 'block, 'analysis, A: OperationVisitor> Debug for CallVisitor<'call, 'block, 'analysis, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "CallVisitor".fmt(f)
    }
}

impl<'call, 'block, 'analysis, A: OperationVisitor> CallVisitor<'call, 'block, 'analysis, A> {
    pub(crate) fn new(
        block_visitor: &'call mut BlockVisitor<'block, 'analysis, A>,
        operation: &'call Operation,
    ) -> CallVisitor<'call, 'block, 'analysis, A> {
        CallVisitor {
            block_visitor,
            operation,
        }
    }

    /// Visits the callee, the receiver and the arguments, in that order, and then computes the
    /// value returned by the call and applies its effects.
    #[logfn_inputs(TRACE)]
    pub fn visit_invocation(
        &mut self,
        target: &InvocationTarget,
        instance: Option<&Operation>,
        arguments: &[Argument],
    ) -> A::Value {
        if let InvocationTarget::Delegate { target } = target {
            self.block_visitor.visit_operation(target);
        }
        if let Some(instance) = instance {
            self.block_visitor.visit_operation(instance);
        }
        self.visit_arguments(arguments);
        let return_type = self.return_type(target);
        let bv = &mut *self.block_visitor.bv;
        let analysis = bv.analysis;
        let result = analysis.visit_invocation(bv, self.operation, &return_type);
        // Lambdas, delegates and local functions can update the locals they capture.
        let may_update_locals = !matches!(target, InvocationTarget::Method { .. });
        self.apply_call_effects(arguments, may_update_locals);
        result
    }

    /// A call that is bound at runtime.
    #[logfn_inputs(TRACE)]
    pub fn visit_dynamic_invocation(&mut self, callee: &Operation, arguments: &[Operation]) -> A::Value {
        self.block_visitor.visit_operation(callee);
        for argument in arguments.iter() {
            self.block_visitor.visit_operation(argument);
        }
        let return_type = self
            .operation
            .ty
            .clone()
            .unwrap_or_else(|| TypeInfo::type_parameter("dynamic"));
        let bv = &mut *self.block_visitor.bv;
        let analysis = bv.analysis;
        let result = analysis.visit_invocation(bv, self.operation, &return_type);
        bv.reset_heap();
        result
    }

    pub fn visit_arguments(&mut self, arguments: &[Argument]) {
        for argument in arguments.iter() {
            self.block_visitor.visit_operation(&argument.value);
        }
    }

    /// Forgets what the callee may have changed: the heap (or everything, if the callee may
    /// update the locals of the caller) and the storage passed to ref and out parameters.
    #[logfn_inputs(TRACE)]
    pub fn apply_call_effects(&mut self, arguments: &[Argument], may_update_locals: bool) {
        if may_update_locals {
            self.block_visitor.bv.reset_all();
        } else {
            self.block_visitor.bv.reset_heap();
        }
        for argument in arguments.iter() {
            let is_writable = argument.ref_kind.is_writable_by_callee()
                || argument
                    .parameter
                    .as_ref()
                    .map_or(false, |p| p.ref_kind().is_writable_by_callee());
            if is_writable {
                trace!("argument {:?} may be updated by the callee", argument.value.id);
                self.block_visitor
                    .assign_to(&argument.value, A::Value::unknown_or_may_be_value());
            }
        }
    }

    /// The static type of the value returned by the call.
    fn return_type(&self, target: &InvocationTarget) -> TypeInfo {
        if let Some(ty) = &self.operation.ty {
            return ty.clone();
        }
        match target {
            InvocationTarget::Method { method } => method.ty.clone(),
            InvocationTarget::LocalFunction { function } => function.ty.clone(),
            InvocationTarget::Delegate { .. } => TypeInfo::type_parameter("?"),
        }
    }
}
