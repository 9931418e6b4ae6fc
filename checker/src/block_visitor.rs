// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::abstract_domains::{AbstractDomain, AbstractValueDomain};
use crate::analysis_entity::AnalysisEntity;
use crate::body_visitor::BodyVisitor;
use crate::call_visitor::CallVisitor;
use crate::cfg::{BasicBlock, BlockId, BranchCondition};
use crate::operation::{BinaryOperator, ConstantValue, Operation, OperationKind};
use crate::operation_visitor::OperationVisitor;

use log_derive::*;
use mirai_annotations::*;
use std::fmt::{Debug, Formatter, Result};

/// Holds the state for the basic block visitor
pub struct BlockVisitor<'block, 'analysis, A: OperationVisitor> {
    pub bv: &'block mut BodyVisitor<'analysis, A>,
}

impl<'block, 'analysis, A: OperationVisitor> Debug for BlockVisitor<'block, 'analysis, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "BlockVisitor".fmt(f)
    }
}

/// Interprets the operations of a basic block, one at a time, in the state that the body
/// visitor holds on to.
impl<'block, 'analysis, A: OperationVisitor> BlockVisitor<'block, 'analysis, A> {
    pub fn new(body_visitor: &'block mut BodyVisitor<'analysis, A>) -> BlockVisitor<'block, 'analysis, A> {
        BlockVisitor { bv: body_visitor }
    }

    /// Visits each operation in order and then the branch value, if any. Returns the successors
    /// that control can flow to from this block.
    #[logfn_inputs(TRACE)]
    pub fn visit_basic_block(&mut self, block: &BasicBlock) -> Vec<BlockId> {
        let analysis = self.bv.analysis;
        for operation in block.operations.iter() {
            analysis.before_statement(self.bv);
            self.visit_operation(operation);
        }
        let mut branch_outcome = None;
        if let Some(branch_value) = &block.branch_value {
            analysis.before_statement(self.bv);
            self.visit_operation(branch_value);
            if let Some(ConstantValue::Bool(b)) = &branch_value.constant {
                branch_outcome = Some(*b);
            }
        }
        let mut successors: Vec<BlockId> = Vec::with_capacity(block.successors.len());
        for successor in block.successors.iter() {
            let is_feasible = !matches!(
                (successor.condition, branch_outcome),
                (BranchCondition::WhenTrue, Some(false)) | (BranchCondition::WhenFalse, Some(true))
            );
            if is_feasible && !successors.contains(&successor.target) {
                successors.push(successor.target);
            } else if !is_feasible {
                trace!("edge {:?} -> {:?} is never taken", block.id, successor.target);
            }
        }
        successors
    }

    /// Computes the value of the operation in the current state, updating the state with any
    /// side effects the operation has. The value is cached in the body visitor, so that
    /// operations that refer back to this one can find it.
    #[logfn_inputs(TRACE)]
    pub fn visit_operation(&mut self, operation: &Operation) -> A::Value {
        let analysis = self.bv.analysis;
        let value = match &operation.kind {
            OperationKind::LocalReference { .. }
            | OperationKind::ParameterReference { .. }
            | OperationKind::FlowCaptureReference { .. } => self.visit_reference(operation),
            OperationKind::FieldReference { .. } | OperationKind::ArrayElementReference { .. } => {
                self.visit_children(operation);
                self.visit_reference(operation)
            }
            OperationKind::PropertyReference {
                property,
                arguments,
                ..
            } => {
                self.visit_children(operation);
                if arguments.is_empty() {
                    self.visit_reference(operation)
                } else {
                    // An indexer is a call to a getter that is not modeled.
                    let return_type = operation.ty.clone().unwrap_or_else(|| property.ty.clone());
                    analysis.visit_invocation(self.bv, operation, &return_type)
                }
            }
            OperationKind::InstanceReference { receiver } => match receiver {
                Some(id) => match self.bv.operation_values.get(id) {
                    Some(value) => value.clone(),
                    None => {
                        debug_checked_assume!(false, "receiver {:?} has not been visited", id);
                        analysis.default_visit(self.bv, operation)
                    }
                },
                None => self.visit_reference(operation),
            },
            OperationKind::FlowCapture { value, .. } => {
                let captured = self.visit_operation(value);
                if let Some(entity) = self.bv.try_create_entity(operation) {
                    self.bv.write_entity(entity, captured.clone());
                }
                captured
            }
            OperationKind::VariableDeclarator { local, initializer } => match initializer {
                Some(initializer) => {
                    let initial_value = self.visit_operation(initializer);
                    self.bv
                        .write_entity(AnalysisEntity::for_local(local), initial_value.clone());
                    initial_value
                }
                None => analysis.default_visit(self.bv, operation),
            },
            OperationKind::SimpleAssignment { target, value } => {
                self.visit_assignment(target, value)
            }
            OperationKind::CompoundAssignment { target, value, .. } => {
                self.visit_operation(target);
                self.visit_operation(value);
                let result = analysis.default_visit(self.bv, operation);
                self.assign_to(target, result.clone());
                result
            }
            OperationKind::ObjectCreation {
                constructor,
                arguments,
                initializer,
            } => {
                let created = self.allocate(operation);
                let mut call_visitor = CallVisitor::new(self, operation);
                call_visitor.visit_arguments(arguments);
                if constructor.is_some() {
                    call_visitor.apply_call_effects(arguments, false);
                }
                self.visit_initializer(operation, initializer.as_deref(), &created);
                created
            }
            OperationKind::DynamicObjectCreation {
                arguments,
                initializer,
            } => {
                let created = self.allocate(operation);
                for argument in arguments.iter() {
                    self.visit_operation(argument);
                }
                self.bv.reset_heap();
                self.visit_initializer(operation, initializer.as_deref(), &created);
                created
            }
            OperationKind::ArrayCreation {
                dimension_sizes,
                initializer,
            } => {
                for size in dimension_sizes.iter() {
                    self.visit_operation(size);
                }
                let created = self.allocate(operation);
                self.visit_initializer(operation, initializer.as_deref(), &created);
                created
            }
            OperationKind::TypeParameterObjectCreation { initializer } => {
                let created = self.allocate(operation);
                self.visit_initializer(operation, initializer.as_deref(), &created);
                created
            }
            OperationKind::AnonymousObjectCreation { initializers } => {
                let created = self.allocate(operation);
                self.bv.creation_stack.push(operation.id);
                for initializer in initializers.iter() {
                    self.visit_operation(initializer);
                }
                self.bv.creation_stack.pop();
                created
            }
            OperationKind::DelegateCreation { target } => {
                let created = self.allocate(operation);
                self.visit_operation(target);
                created
            }
            OperationKind::ArrayInitializer { .. }
            | OperationKind::ObjectOrCollectionInitializer { .. } => {
                self.visit_children(operation);
                match self.bv.value_of_current_creation() {
                    Some(created) => created,
                    None => analysis.default_visit(self.bv, operation),
                }
            }
            OperationKind::Invocation {
                target,
                instance,
                arguments,
            } => CallVisitor::new(self, operation).visit_invocation(
                target,
                instance.as_deref(),
                arguments,
            ),
            OperationKind::DynamicInvocation {
                operation: callee,
                arguments,
            } => CallVisitor::new(self, operation).visit_dynamic_invocation(callee, arguments),
            OperationKind::Await { operation: awaited } => {
                self.visit_operation(awaited);
                // Other code may run before the routine resumes.
                self.bv.reset_heap();
                analysis.default_visit(self.bv, operation)
            }
            OperationKind::DeclarationPattern {
                declared_symbol, ..
            } => {
                if let Some(local) = declared_symbol {
                    self.bv.write_entity(
                        AnalysisEntity::for_local(local),
                        A::Value::unknown_or_may_be_value(),
                    );
                }
                analysis.default_visit(self.bv, operation)
            }
            OperationKind::Conversion {
                operand,
                conversion,
            } => {
                let operand_value = self.visit_operation(operand);
                analysis.visit_conversion(self.bv, operation, *conversion, operand_value)
            }
            OperationKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                self.visit_operation(condition);
                let state_before = self.bv.current_data.clone();
                let true_value = self.visit_operation(when_true);
                let state_after_true = std::mem::replace(&mut self.bv.current_data, state_before);
                let value = match when_false {
                    Some(when_false) => true_value.merge(&self.visit_operation(when_false)),
                    None => analysis.default_visit(self.bv, operation),
                };
                self.join_state(&state_after_true);
                value
            }
            OperationKind::Coalesce { value, when_null } => {
                let value = self.visit_operation(value);
                let state_when_not_null = self.bv.current_data.clone();
                let value = value.merge(&self.visit_operation(when_null));
                self.join_state(&state_when_not_null);
                value
            }
            OperationKind::Binary {
                operator: BinaryOperator::ConditionalAnd | BinaryOperator::ConditionalOr,
                left,
                right,
            } => {
                self.visit_operation(left);
                // The right operand is not evaluated if the left one decides the outcome.
                let state_after_left = self.bv.current_data.clone();
                self.visit_operation(right);
                self.join_state(&state_after_left);
                analysis.default_visit(self.bv, operation)
            }
            OperationKind::Return { value } => match value {
                Some(returned) => {
                    let returned_value = self.visit_operation(returned);
                    let return_type = &self.bv.body.return_type;
                    if !return_type.is_void() {
                        let result = AnalysisEntity::for_result(return_type.clone());
                        self.bv.write_entity(result, returned_value.clone());
                    }
                    returned_value
                }
                None => analysis.default_visit(self.bv, operation),
            },
            OperationKind::ExpressionStatement { operation } => self.visit_operation(operation),
            OperationKind::NameOf { .. } | OperationKind::AnonymousFunction { .. } => {
                // The operand is not evaluated.
                analysis.default_visit(self.bv, operation)
            }
            OperationKind::Literal
            | OperationKind::DefaultValue
            | OperationKind::IsType { .. }
            | OperationKind::IsPattern { .. }
            | OperationKind::ConstantPattern { .. }
            | OperationKind::InterpolatedString { .. }
            | OperationKind::Tuple { .. }
            | OperationKind::Binary { .. }
            | OperationKind::Unary { .. }
            | OperationKind::Throw { .. }
            | OperationKind::SizeOf { .. }
            | OperationKind::TypeOf { .. }
            | OperationKind::Other { .. } => {
                self.visit_children(operation);
                analysis.default_visit(self.bv, operation)
            }
        };
        let value = analysis.post_process(self.bv, operation, value);
        self.bv.cache_value(operation.id, value.clone());
        value
    }

    /// Merges the state of another path through the current expression into the current state.
    fn join_state(&mut self, other: &A::Data) {
        let analysis = self.bv.analysis;
        self.bv.current_data = analysis.merge_data(other, &self.bv.current_data);
    }

    /// Visits the immediate sub-operations of the operation, in evaluation order.
    fn visit_children(&mut self, operation: &Operation) {
        for child in operation.children() {
            self.visit_operation(child);
        }
    }

    /// The current value of the entity denoted by the reference, once the sub-operations that
    /// identify the entity have been visited.
    fn visit_reference(&mut self, operation: &Operation) -> A::Value {
        match self.bv.try_create_entity(operation) {
            Some(entity) => self.bv.read_entity(&entity),
            None => {
                let analysis = self.bv.analysis;
                analysis.default_visit(self.bv, operation)
            }
        }
    }

    fn visit_assignment(&mut self, target: &Operation, value: &Operation) -> A::Value {
        // The target is not read, but the operations that identify it are evaluated first.
        self.visit_children(target);
        let assigned_value = self.visit_operation(value);
        self.assign_to(target, assigned_value.clone());
        self.bv.cache_value(target.id, assigned_value.clone());
        assigned_value
    }

    /// Updates the storage denoted by the target with the value.
    #[logfn_inputs(TRACE)]
    pub fn assign_to(&mut self, target: &Operation, value: A::Value) {
        if let Some(entity) = self.bv.try_create_entity(target) {
            self.bv.write_entity(entity, value);
            return;
        }
        match &target.kind {
            OperationKind::Tuple { elements } => {
                // Deconstruction. The parts of the value are not tracked.
                for element in elements.iter() {
                    self.assign_to(element, A::Value::unknown_or_may_be_value());
                }
            }
            OperationKind::PropertyReference { arguments, .. } if !arguments.is_empty() => {
                // A call to an indexer setter that is not modeled.
                self.bv.reset_heap();
            }
            _ => self.bv.forget_member_updates(target),
        }
    }

    /// Computes and caches the value of a creation, before any of its sub-operations.
    fn allocate(&mut self, creation: &Operation) -> A::Value {
        let analysis = self.bv.analysis;
        let created = analysis.visit_creation(self.bv, creation);
        self.bv.cache_value(creation.id, created.clone());
        created
    }

    fn visit_initializer(
        &mut self,
        creation: &Operation,
        initializer: Option<&Operation>,
        created: &A::Value,
    ) {
        if let Some(initializer) = initializer {
            self.bv.creation_stack.push(creation.id);
            let initialized = self.visit_operation(initializer);
            self.bv.creation_stack.pop();
            debug_checked_assume_eq!(&initialized, created);
        }
    }
}
