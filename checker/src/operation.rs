// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The operation tree handed over by the IR provider. One operation per node, each with
//! a stable id, its static type and its compile time constant value, if any.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::sync::Arc;

/// Identifies an operation within a routine body. Ids are unique per body and are used to key
/// allocation sites and the per operation value caches.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub u32);

impl Debug for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("op_{}", self.0))
    }
}

/// Identifies a symbol (local, parameter, field, method...) across the routine body.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// Identifies a compiler synthesized flow capture slot.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureId(pub u32);

/// The coarse shape of a type, which is all the analyses need to know about it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    /// Values of this type are copied on assignment and never have heap identity.
    Value,
    /// Values of this type are references to heap objects.
    Reference,
    /// A generic type parameter that may be instantiated with either kind of type.
    TypeParameter,
    /// The return type of routines that do not return anything.
    Void,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeInfo {
    pub name: Arc<str>,
    pub kind: TypeKind,
}

impl Debug for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.name)
    }
}

impl TypeInfo {
    pub fn new(name: &str, kind: TypeKind) -> TypeInfo {
        TypeInfo {
            name: Arc::from(name),
            kind,
        }
    }

    pub fn value(name: &str) -> TypeInfo {
        TypeInfo::new(name, TypeKind::Value)
    }

    pub fn reference(name: &str) -> TypeInfo {
        TypeInfo::new(name, TypeKind::Reference)
    }

    pub fn type_parameter(name: &str) -> TypeInfo {
        TypeInfo::new(name, TypeKind::TypeParameter)
    }

    pub fn void() -> TypeInfo {
        TypeInfo::new("void", TypeKind::Void)
    }

    /// True if values of this type are copied on assignment.
    pub fn has_copy_semantics(&self) -> bool {
        self.kind == TypeKind::Value
    }

    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Void
    }
}

/// How an argument is passed to, or a parameter is received from, a caller.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefKind {
    None,
    In,
    Ref,
    Out,
}

impl Default for RefKind {
    fn default() -> Self {
        RefKind::None
    }
}

impl RefKind {
    /// True if the callee can assign a new value to the caller's storage location.
    pub fn is_writable_by_callee(self) -> bool {
        matches!(self, RefKind::Ref | RefKind::Out)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Local,
    Parameter { ordinal: usize, ref_kind: RefKind },
    Field { is_static: bool },
    Property { is_static: bool },
    Method { is_static: bool },
    LocalFunction,
}

/// A declared program entity. For methods and local functions `ty` is the return type.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: Arc<str>,
    pub kind: SymbolKind,
    pub ty: TypeInfo,
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(&self.name)
    }
}

impl Symbol {
    pub fn new(id: u32, name: &str, kind: SymbolKind, ty: TypeInfo) -> Symbol {
        Symbol {
            id: SymbolId(id),
            name: Arc::from(name),
            kind,
            ty,
        }
    }

    pub fn local(id: u32, name: &str, ty: TypeInfo) -> Symbol {
        Symbol::new(id, name, SymbolKind::Local, ty)
    }

    pub fn parameter(id: u32, name: &str, ordinal: usize, ref_kind: RefKind, ty: TypeInfo) -> Symbol {
        Symbol::new(id, name, SymbolKind::Parameter { ordinal, ref_kind }, ty)
    }

    pub fn field(id: u32, name: &str, ty: TypeInfo) -> Symbol {
        Symbol::new(id, name, SymbolKind::Field { is_static: false }, ty)
    }

    pub fn static_field(id: u32, name: &str, ty: TypeInfo) -> Symbol {
        Symbol::new(id, name, SymbolKind::Field { is_static: true }, ty)
    }

    pub fn method(id: u32, name: &str, return_type: TypeInfo) -> Symbol {
        Symbol::new(id, name, SymbolKind::Method { is_static: false }, return_type)
    }

    pub fn is_static(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Field { is_static: true }
                | SymbolKind::Property { is_static: true }
                | SymbolKind::Method { is_static: true }
        )
    }

    /// The ref kind of a parameter symbol, RefKind::None for everything else.
    pub fn ref_kind(&self) -> RefKind {
        if let SymbolKind::Parameter { ref_kind, .. } = self.kind {
            ref_kind
        } else {
            RefKind::None
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstantValue {
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    Str(Arc<str>),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    And,
    Or,
    ExclusiveOr,
    ConditionalAnd,
    ConditionalOr,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LeftShift,
    RightShift,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
    BitwiseNegation,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    Identity,
    /// Implicit or explicit conversion between reference types. Does not change identity.
    Reference,
    /// Copies a value into a newly allocated heap object.
    Boxing,
    Unboxing,
    Numeric,
    UserDefined,
}

/// An argument of an invocation or creation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Argument {
    #[serde(default)]
    pub parameter: Option<Symbol>,
    #[serde(default)]
    pub ref_kind: RefKind,
    pub value: Operation,
}

impl Argument {
    pub fn by_value(value: Operation) -> Argument {
        Argument {
            parameter: None,
            ref_kind: RefKind::None,
            value,
        }
    }

    pub fn by_ref(value: Operation, ref_kind: RefKind) -> Argument {
        Argument {
            parameter: None,
            ref_kind,
            value,
        }
    }
}

/// What an invocation calls.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum InvocationTarget {
    Method { method: Symbol },
    LocalFunction { function: Symbol },
    /// Invokes a delegate (or lambda) value computed by the target operation.
    Delegate { target: Box<Operation> },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "op")]
pub enum OperationKind {
    Literal,
    DefaultValue,
    LocalReference {
        local: Symbol,
    },
    ParameterReference {
        parameter: Symbol,
    },
    /// A static field when instance is None.
    FieldReference {
        instance: Option<Box<Operation>>,
        field: Symbol,
    },
    PropertyReference {
        instance: Option<Box<Operation>>,
        property: Symbol,
        #[serde(default)]
        arguments: Vec<Argument>,
    },
    ArrayElementReference {
        array: Box<Operation>,
        indices: Vec<Operation>,
    },
    /// A reference to the instance of the containing type when receiver is None, otherwise
    /// an implicit reference to the object created by the receiver operation, e.g. inside
    /// an object initializer.
    InstanceReference {
        #[serde(default)]
        receiver: Option<OperationId>,
    },
    FlowCapture {
        id: CaptureId,
        value: Box<Operation>,
    },
    FlowCaptureReference {
        id: CaptureId,
    },
    VariableDeclarator {
        local: Symbol,
        initializer: Option<Box<Operation>>,
    },
    SimpleAssignment {
        target: Box<Operation>,
        value: Box<Operation>,
    },
    CompoundAssignment {
        operator: BinaryOperator,
        target: Box<Operation>,
        value: Box<Operation>,
    },
    ObjectCreation {
        constructor: Option<Symbol>,
        arguments: Vec<Argument>,
        initializer: Option<Box<Operation>>,
    },
    DynamicObjectCreation {
        arguments: Vec<Operation>,
        initializer: Option<Box<Operation>>,
    },
    ArrayCreation {
        dimension_sizes: Vec<Operation>,
        initializer: Option<Box<Operation>>,
    },
    ArrayInitializer {
        element_values: Vec<Operation>,
    },
    ObjectOrCollectionInitializer {
        initializers: Vec<Operation>,
    },
    AnonymousObjectCreation {
        initializers: Vec<Operation>,
    },
    TypeParameterObjectCreation {
        initializer: Option<Box<Operation>>,
    },
    DelegateCreation {
        target: Box<Operation>,
    },
    AnonymousFunction {
        symbol: Symbol,
    },
    Invocation {
        target: InvocationTarget,
        instance: Option<Box<Operation>>,
        arguments: Vec<Argument>,
    },
    DynamicInvocation {
        operation: Box<Operation>,
        arguments: Vec<Operation>,
    },
    Await {
        operation: Box<Operation>,
    },
    IsType {
        value_operand: Box<Operation>,
        type_operand: TypeInfo,
    },
    IsPattern {
        value: Box<Operation>,
        pattern: Box<Operation>,
    },
    DeclarationPattern {
        declared_symbol: Option<Symbol>,
        matched_type: Option<TypeInfo>,
    },
    ConstantPattern {
        value: Box<Operation>,
    },
    InterpolatedString {
        parts: Vec<Operation>,
    },
    Tuple {
        elements: Vec<Operation>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Operation>,
        right: Box<Operation>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Operation>,
    },
    Conversion {
        operand: Box<Operation>,
        conversion: ConversionKind,
    },
    Conditional {
        condition: Box<Operation>,
        when_true: Box<Operation>,
        when_false: Option<Box<Operation>>,
    },
    Coalesce {
        value: Box<Operation>,
        when_null: Box<Operation>,
    },
    Throw {
        exception: Option<Box<Operation>>,
    },
    Return {
        value: Option<Box<Operation>>,
    },
    ExpressionStatement {
        operation: Box<Operation>,
    },
    SizeOf {
        type_operand: TypeInfo,
    },
    TypeOf {
        type_operand: TypeInfo,
    },
    NameOf {
        argument: Box<Operation>,
    },
    /// Anything the provider does not model more precisely.
    Other {
        #[serde(default)]
        children: Vec<Operation>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    #[serde(default)]
    pub ty: Option<TypeInfo>,
    #[serde(default)]
    pub constant: Option<ConstantValue>,
}

impl Operation {
    pub fn new(id: u32, kind: OperationKind) -> Operation {
        Operation {
            id: OperationId(id),
            kind,
            ty: None,
            constant: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, ty: TypeInfo) -> Operation {
        self.ty = Some(ty);
        self
    }

    #[must_use]
    pub fn with_constant(mut self, constant: ConstantValue) -> Operation {
        self.constant = Some(constant);
        self
    }

    pub fn has_constant(&self) -> bool {
        self.constant.is_some()
    }

    /// True if the static type of the operation is known to have copy semantics.
    pub fn has_copy_semantics_type(&self) -> bool {
        self.ty.as_ref().map_or(false, TypeInfo::has_copy_semantics)
    }

    /// The immediate sub-operations, in evaluation order.
    pub fn children(&self) -> Vec<&Operation> {
        use OperationKind::*;
        let mut result: Vec<&Operation> = Vec::new();
        match &self.kind {
            Literal
            | DefaultValue
            | LocalReference { .. }
            | ParameterReference { .. }
            | InstanceReference { .. }
            | FlowCaptureReference { .. }
            | AnonymousFunction { .. }
            | DeclarationPattern { .. }
            | SizeOf { .. }
            | TypeOf { .. } => {}
            FieldReference { instance, .. } => result.extend(instance.as_deref()),
            PropertyReference {
                instance,
                arguments,
                ..
            } => {
                result.extend(instance.as_deref());
                result.extend(arguments.iter().map(|a| &a.value));
            }
            ArrayElementReference { array, indices } => {
                result.push(array);
                result.extend(indices.iter());
            }
            FlowCapture { value, .. } => result.push(value),
            VariableDeclarator { initializer, .. } => result.extend(initializer.as_deref()),
            SimpleAssignment { target, value } | CompoundAssignment { target, value, .. } => {
                result.push(target);
                result.push(value);
            }
            ObjectCreation {
                arguments,
                initializer,
                ..
            } => {
                result.extend(arguments.iter().map(|a| &a.value));
                result.extend(initializer.as_deref());
            }
            DynamicObjectCreation {
                arguments,
                initializer,
            } => {
                result.extend(arguments.iter());
                result.extend(initializer.as_deref());
            }
            ArrayCreation {
                dimension_sizes,
                initializer,
            } => {
                result.extend(dimension_sizes.iter());
                result.extend(initializer.as_deref());
            }
            ArrayInitializer { element_values } => result.extend(element_values.iter()),
            ObjectOrCollectionInitializer { initializers }
            | AnonymousObjectCreation { initializers } => result.extend(initializers.iter()),
            TypeParameterObjectCreation { initializer } => result.extend(initializer.as_deref()),
            DelegateCreation { target } => result.push(target),
            Invocation {
                target,
                instance,
                arguments,
            } => {
                if let InvocationTarget::Delegate { target } = target {
                    result.push(target);
                }
                result.extend(instance.as_deref());
                result.extend(arguments.iter().map(|a| &a.value));
            }
            DynamicInvocation {
                operation,
                arguments,
            } => {
                result.push(operation);
                result.extend(arguments.iter());
            }
            Await { operation } => result.push(operation),
            IsType { value_operand, .. } => result.push(value_operand),
            IsPattern { value, pattern } => {
                result.push(value);
                result.push(pattern);
            }
            ConstantPattern { value } => result.push(value),
            InterpolatedString { parts } => result.extend(parts.iter()),
            Tuple { elements } => result.extend(elements.iter()),
            Binary { left, right, .. } => {
                result.push(left);
                result.push(right);
            }
            Unary { operand, .. } | Conversion { operand, .. } => result.push(operand),
            Conditional {
                condition,
                when_true,
                when_false,
            } => {
                result.push(condition);
                result.push(when_true);
                result.extend(when_false.as_deref());
            }
            Coalesce { value, when_null } => {
                result.push(value);
                result.push(when_null);
            }
            Throw { exception } => result.extend(exception.as_deref()),
            Return { value } => result.extend(value.as_deref()),
            ExpressionStatement { operation } => result.push(operation),
            NameOf { argument } => result.push(argument),
            Other { children } => result.extend(children.iter()),
        }
        result
    }
}
