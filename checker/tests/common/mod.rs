// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Helpers for building routine bodies by hand. Not every test file uses every helper.
#![allow(dead_code)]

use points_to::cfg::{BasicBlock, RoutineBody, Successor};
use points_to::operation::{
    Argument, BinaryOperator, CaptureId, ConstantValue, ConversionKind, InvocationTarget, Operation,
    OperationId, OperationKind, RefKind, Symbol, SymbolKind, TypeInfo,
};
use points_to::options::Options;
use points_to::points_to_analysis::{PointsToAnalysis, PointsToAnalysisResult};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn object_type(name: &str) -> TypeInfo {
    TypeInfo::reference(name)
}

pub fn int_type() -> TypeInfo {
    TypeInfo::value("int")
}

pub fn bool_type() -> TypeInfo {
    TypeInfo::value("bool")
}

pub fn analyze(body: &RoutineBody) -> PointsToAnalysisResult {
    init_logger();
    PointsToAnalysis.analyze(body, &Options::default())
}

pub fn analyze_with(body: &RoutineBody, options: &Options) -> PointsToAnalysisResult {
    init_logger();
    PointsToAnalysis.analyze(body, options)
}

/// Hands out operation and symbol ids that are unique within one routine body.
pub struct IrBuilder {
    next_operation_id: u32,
    next_symbol_id: u32,
}

impl IrBuilder {
    pub fn new() -> IrBuilder {
        IrBuilder {
            next_operation_id: 1,
            next_symbol_id: 1,
        }
    }

    fn operation(&mut self, kind: OperationKind) -> Operation {
        let id = self.next_operation_id;
        self.next_operation_id += 1;
        Operation::new(id, kind)
    }

    fn symbol_id(&mut self) -> u32 {
        let id = self.next_symbol_id;
        self.next_symbol_id += 1;
        id
    }

    pub fn local(&mut self, name: &str, ty: TypeInfo) -> Symbol {
        let id = self.symbol_id();
        Symbol::local(id, name, ty)
    }

    pub fn parameter(&mut self, name: &str, ordinal: usize, ref_kind: RefKind, ty: TypeInfo) -> Symbol {
        let id = self.symbol_id();
        Symbol::parameter(id, name, ordinal, ref_kind, ty)
    }

    pub fn field(&mut self, name: &str, ty: TypeInfo) -> Symbol {
        let id = self.symbol_id();
        Symbol::field(id, name, ty)
    }

    pub fn static_field(&mut self, name: &str, ty: TypeInfo) -> Symbol {
        let id = self.symbol_id();
        Symbol::static_field(id, name, ty)
    }

    pub fn method(&mut self, name: &str, return_type: TypeInfo) -> Symbol {
        let id = self.symbol_id();
        Symbol::method(id, name, return_type)
    }

    pub fn local_function(&mut self, name: &str, return_type: TypeInfo) -> Symbol {
        let id = self.symbol_id();
        Symbol::new(
            id,
            name,
            SymbolKind::LocalFunction,
            return_type,
        )
    }

    pub fn property(&mut self, name: &str, ty: TypeInfo) -> Symbol {
        let id = self.symbol_id();
        Symbol::new(id, name, SymbolKind::Property { is_static: false }, ty)
    }

    /// Takes an operation id for an operation that is built after its sub-operations, which
    /// need to refer to it.
    pub fn reserve(&mut self) -> OperationId {
        let id = self.next_operation_id;
        self.next_operation_id += 1;
        OperationId(id)
    }

    pub fn local_ref(&mut self, local: &Symbol) -> Operation {
        let kind = OperationKind::LocalReference {
            local: local.clone(),
        };
        self.operation(kind).with_type(local.ty.clone())
    }

    pub fn param_ref(&mut self, parameter: &Symbol) -> Operation {
        let kind = OperationKind::ParameterReference {
            parameter: parameter.clone(),
        };
        self.operation(kind).with_type(parameter.ty.clone())
    }

    pub fn field_ref(&mut self, instance: Option<Operation>, field: &Symbol) -> Operation {
        let kind = OperationKind::FieldReference {
            instance: instance.map(Box::new),
            field: field.clone(),
        };
        self.operation(kind).with_type(field.ty.clone())
    }

    pub fn element_ref(&mut self, array: Operation, index: Operation, element_type: TypeInfo) -> Operation {
        let kind = OperationKind::ArrayElementReference {
            array: Box::new(array),
            indices: vec![index],
        };
        self.operation(kind).with_type(element_type)
    }

    pub fn this_ref(&mut self, ty: &TypeInfo) -> Operation {
        self.operation(OperationKind::InstanceReference { receiver: None })
            .with_type(ty.clone())
    }

    pub fn property_ref(&mut self, instance: Option<Operation>, property: &Symbol) -> Operation {
        let kind = OperationKind::PropertyReference {
            instance: instance.map(Box::new),
            property: property.clone(),
            arguments: vec![],
        };
        self.operation(kind).with_type(property.ty.clone())
    }

    /// The implicit reference to the object being initialized by the creation operation.
    pub fn receiver_ref(&mut self, creation: OperationId, ty: &TypeInfo) -> Operation {
        self.operation(OperationKind::InstanceReference {
            receiver: Some(creation),
        })
        .with_type(ty.clone())
    }

    pub fn capture(&mut self, id: u32, value: Operation) -> Operation {
        let ty = value.ty.clone();
        let kind = OperationKind::FlowCapture {
            id: CaptureId(id),
            value: Box::new(value),
        };
        let capture = self.operation(kind);
        match ty {
            Some(ty) => capture.with_type(ty),
            None => capture,
        }
    }

    pub fn capture_ref(&mut self, id: u32, ty: &TypeInfo) -> Operation {
        self.operation(OperationKind::FlowCaptureReference { id: CaptureId(id) })
            .with_type(ty.clone())
    }

    pub fn new_object(&mut self, ty: &TypeInfo) -> Operation {
        let kind = OperationKind::ObjectCreation {
            constructor: None,
            arguments: vec![],
            initializer: None,
        };
        self.operation(kind).with_type(ty.clone())
    }

    /// new T { .. } where the initializers were built with receiver_ref(id, ..).
    pub fn new_object_initialized(&mut self, id: OperationId, ty: &TypeInfo, initializers: Vec<Operation>) -> Operation {
        let initializer = self
            .operation(OperationKind::ObjectOrCollectionInitializer { initializers })
            .with_type(ty.clone());
        let kind = OperationKind::ObjectCreation {
            constructor: None,
            arguments: vec![],
            initializer: Some(Box::new(initializer)),
        };
        Operation::new(id.0, kind).with_type(ty.clone())
    }

    pub fn new_anonymous_object(&mut self, id: OperationId, ty: &TypeInfo, initializers: Vec<Operation>) -> Operation {
        let kind = OperationKind::AnonymousObjectCreation { initializers };
        Operation::new(id.0, kind).with_type(ty.clone())
    }

    /// new T() where T is a type parameter.
    pub fn new_generic(&mut self, ty: &TypeInfo) -> Operation {
        let kind = OperationKind::TypeParameterObjectCreation { initializer: None };
        self.operation(kind).with_type(ty.clone())
    }

    /// A creation whose constructor is bound at runtime.
    pub fn new_dynamic(&mut self, ty: &TypeInfo, arguments: Vec<Operation>) -> Operation {
        let kind = OperationKind::DynamicObjectCreation {
            arguments,
            initializer: None,
        };
        self.operation(kind).with_type(ty.clone())
    }

    pub fn lambda(&mut self, name: &str, delegate_type: &TypeInfo) -> Operation {
        let id = self.symbol_id();
        let symbol = Symbol::new(id, name, SymbolKind::LocalFunction, TypeInfo::void());
        self.operation(OperationKind::AnonymousFunction { symbol })
            .with_type(delegate_type.clone())
    }

    pub fn new_delegate(&mut self, target: Operation, delegate_type: &TypeInfo) -> Operation {
        let kind = OperationKind::DelegateCreation {
            target: Box::new(target),
        };
        self.operation(kind).with_type(delegate_type.clone())
    }

    pub fn new_array(&mut self, element_type: &str, length: i64) -> Operation {
        let size = self.int(length);
        let kind = OperationKind::ArrayCreation {
            dimension_sizes: vec![size],
            initializer: None,
        };
        self.operation(kind)
            .with_type(object_type(&format!("{}[]", element_type)))
    }

    pub fn int(&mut self, value: i64) -> Operation {
        self.operation(OperationKind::Literal)
            .with_type(int_type())
            .with_constant(ConstantValue::Int(value))
    }

    pub fn null(&mut self, ty: &TypeInfo) -> Operation {
        self.operation(OperationKind::Literal)
            .with_type(ty.clone())
            .with_constant(ConstantValue::Null)
    }

    pub fn bool_constant(&mut self, value: bool) -> Operation {
        self.operation(OperationKind::Literal)
            .with_type(bool_type())
            .with_constant(ConstantValue::Bool(value))
    }

    /// A condition whose outcome is not known statically.
    pub fn opaque_condition(&mut self) -> Operation {
        self.operation(OperationKind::Other { children: vec![] })
            .with_type(bool_type())
    }

    /// An operation the analyses do not model, of the given type.
    pub fn opaque(&mut self, ty: &TypeInfo) -> Operation {
        self.operation(OperationKind::Other { children: vec![] })
            .with_type(ty.clone())
    }

    pub fn assign(&mut self, target: Operation, value: Operation) -> Operation {
        let ty = target.ty.clone();
        let kind = OperationKind::SimpleAssignment {
            target: Box::new(target),
            value: Box::new(value),
        };
        let assignment = self.operation(kind);
        match ty {
            Some(ty) => assignment.with_type(ty),
            None => assignment,
        }
    }

    /// local = value, as a statement.
    pub fn assign_local(&mut self, local: &Symbol, value: Operation) -> Operation {
        let target = self.local_ref(local);
        let assignment = self.assign(target, value);
        self.statement(assignment)
    }

    pub fn statement(&mut self, operation: Operation) -> Operation {
        let kind = OperationKind::ExpressionStatement {
            operation: Box::new(operation),
        };
        self.operation(kind)
    }

    pub fn declare(&mut self, local: &Symbol, initializer: Option<Operation>) -> Operation {
        let kind = OperationKind::VariableDeclarator {
            local: local.clone(),
            initializer: initializer.map(Box::new),
        };
        self.operation(kind)
    }

    pub fn call(&mut self, method: &Symbol, instance: Option<Operation>, arguments: Vec<Argument>) -> Operation {
        let kind = OperationKind::Invocation {
            target: InvocationTarget::Method {
                method: method.clone(),
            },
            instance: instance.map(Box::new),
            arguments,
        };
        self.operation(kind).with_type(method.ty.clone())
    }

    pub fn call_local_function(&mut self, function: &Symbol, arguments: Vec<Argument>) -> Operation {
        let kind = OperationKind::Invocation {
            target: InvocationTarget::LocalFunction {
                function: function.clone(),
            },
            instance: None,
            arguments,
        };
        self.operation(kind).with_type(function.ty.clone())
    }

    pub fn call_delegate(&mut self, delegate: Operation, return_type: &TypeInfo) -> Operation {
        let kind = OperationKind::Invocation {
            target: InvocationTarget::Delegate {
                target: Box::new(delegate),
            },
            instance: None,
            arguments: vec![],
        };
        self.operation(kind).with_type(return_type.clone())
    }

    /// A call that is bound at runtime. The provider may not know the type of the result.
    pub fn call_dynamic(&mut self, callee: Operation, arguments: Vec<Operation>, ty: Option<&TypeInfo>) -> Operation {
        let kind = OperationKind::DynamicInvocation {
            operation: Box::new(callee),
            arguments,
        };
        let call = self.operation(kind);
        match ty {
            Some(ty) => call.with_type(ty.clone()),
            None => call,
        }
    }

    /// value is T local
    pub fn is_declaration(&mut self, value: Operation, local: &Symbol) -> Operation {
        let pattern = self
            .operation(OperationKind::DeclarationPattern {
                declared_symbol: Some(local.clone()),
                matched_type: Some(local.ty.clone()),
            })
            .with_type(local.ty.clone());
        let kind = OperationKind::IsPattern {
            value: Box::new(value),
            pattern: Box::new(pattern),
        };
        self.operation(kind).with_type(bool_type())
    }

    pub fn tuple(&mut self, elements: Vec<Operation>) -> Operation {
        self.operation(OperationKind::Tuple { elements })
            .with_type(TypeInfo::value("ValueTuple"))
    }

    pub fn binary(&mut self, operator: BinaryOperator, left: Operation, right: Operation) -> Operation {
        let kind = OperationKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
        self.operation(kind).with_type(bool_type())
    }

    /// An operation the analyses do not model, which evaluates the given operations.
    pub fn opaque_over(&mut self, children: Vec<Operation>, ty: &TypeInfo) -> Operation {
        self.operation(OperationKind::Other { children })
            .with_type(ty.clone())
    }

    pub fn convert(&mut self, operand: Operation, conversion: ConversionKind, ty: &TypeInfo) -> Operation {
        let kind = OperationKind::Conversion {
            operand: Box::new(operand),
            conversion,
        };
        self.operation(kind).with_type(ty.clone())
    }

    pub fn conditional(&mut self, condition: Operation, when_true: Operation, when_false: Operation) -> Operation {
        let ty = when_true.ty.clone();
        let kind = OperationKind::Conditional {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: Some(Box::new(when_false)),
        };
        let conditional = self.operation(kind);
        match ty {
            Some(ty) => conditional.with_type(ty),
            None => conditional,
        }
    }

    pub fn coalesce(&mut self, value: Operation, when_null: Operation) -> Operation {
        let ty = value.ty.clone();
        let kind = OperationKind::Coalesce {
            value: Box::new(value),
            when_null: Box::new(when_null),
        };
        let coalesce = self.operation(kind);
        match ty {
            Some(ty) => coalesce.with_type(ty),
            None => coalesce,
        }
    }

    pub fn await_value(&mut self, awaited: Operation, ty: &TypeInfo) -> Operation {
        let kind = OperationKind::Await {
            operation: Box::new(awaited),
        };
        self.operation(kind).with_type(ty.clone())
    }

    pub fn ret(&mut self, value: Option<Operation>) -> Operation {
        let kind = OperationKind::Return {
            value: value.map(Box::new),
        };
        self.operation(kind)
    }
}

pub fn block(id: usize, operations: Vec<Operation>, successors: Vec<Successor>) -> BasicBlock {
    BasicBlock::new(id, operations, successors)
}

/// A block that ends in a two way branch on condition.
pub fn branch(id: usize, operations: Vec<Operation>, condition: Operation, when_true: usize, when_false: usize) -> BasicBlock {
    let mut block = BasicBlock::new(
        id,
        operations,
        vec![Successor::when(when_true, true), Successor::when(when_false, false)],
    );
    block.branch_value = Some(condition);
    block
}

pub fn goto(target: usize) -> Vec<Successor> {
    vec![Successor::always(target)]
}
