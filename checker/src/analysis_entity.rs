// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::abstract_domains::AbstractDomain;
use crate::environment::EnvironmentKey;
use crate::operation::{
    CaptureId, ConstantValue, Operation, OperationId, OperationKind, Symbol, TypeInfo,
};
use crate::points_to_value::PointsToAbstractValue;

use log_derive::*;
use std::collections::hash_map::DefaultHasher;
use std::fmt::{Debug, Formatter, Result};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An index into an array, as far as it is known.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum AbstractIndex {
    Constant(i64),
    /// An index that is not a compile time constant, identified by the operation computing it.
    Operation(OperationId),
}

impl Debug for AbstractIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            AbstractIndex::Constant(i) => i.fmt(f),
            AbstractIndex::Operation(id) => id.fmt(f),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Local { symbol: Symbol },
    Parameter { symbol: Symbol },
    /// A field or property. Qualified by the parent entity for members of values with copy
    /// semantics, and by the instance location for members of heap objects.
    Member { symbol: Symbol },
    ArrayElement { indices: Vec<AbstractIndex> },
    /// The instance the routine was invoked on.
    ThisOrMe,
    /// A compiler synthesized slot that holds an intermediate value.
    FlowCapture { id: CaptureId },
    /// The value returned by the routine.
    Result,
}

/// An entity is a storage location that the analysis tracks: a variable, a parameter, a member
/// of an instance, an array element, the self instance or a synthesized slot.
///
/// Entities are immutable values. Joins and widenings copy them from one environment to another,
/// causing them to get rehashed, so the hash is computed once and cached.
#[derive(Clone)]
pub struct AnalysisEntity {
    pub kind: EntityKind,
    /// The static type of the stored value. Not part of the identity of the entity.
    pub ty: TypeInfo,
    pub parent: Option<Arc<AnalysisEntity>>,
    /// The heap instance this entity belongs to. NoLocation for entities that are not part of
    /// a heap object.
    pub instance_location: PointsToAbstractValue,
    hash: u64,
    hash_ignoring_location: u64,
}

impl Debug for AnalysisEntity {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if let Some(parent) = &self.parent {
            parent.fmt(f)?;
        } else if self.instance_location.is_known() {
            f.write_fmt(format_args!("<{:?}>", self.instance_location))?;
        }
        match &self.kind {
            EntityKind::Local { symbol } | EntityKind::Parameter { symbol } => symbol.fmt(f),
            EntityKind::Member { symbol } => f.write_fmt(format_args!(".{:?}", symbol)),
            EntityKind::ArrayElement { indices } => f.write_fmt(format_args!("{:?}", indices)),
            EntityKind::ThisOrMe => f.write_str("this"),
            EntityKind::FlowCapture { id } => f.write_fmt(format_args!("capture_{}", id.0)),
            EntityKind::Result => f.write_str("result"),
        }
    }
}

impl Hash for AnalysisEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialEq for AnalysisEntity {
    fn eq(&self, other: &AnalysisEntity) -> bool {
        self.hash == other.hash
            && self.equals_ignoring_instance_location(other)
            && self.instance_location == other.instance_location
    }
}

impl Eq for AnalysisEntity {}

/// Constructors
impl AnalysisEntity {
    #[logfn_inputs(TRACE)]
    pub fn new(
        kind: EntityKind,
        ty: TypeInfo,
        parent: Option<Arc<AnalysisEntity>>,
        instance_location: PointsToAbstractValue,
    ) -> Arc<AnalysisEntity> {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        parent.hash(&mut hasher);
        let hash_ignoring_location = hasher.finish();
        instance_location.hash(&mut hasher);
        Arc::new(AnalysisEntity {
            kind,
            ty,
            parent,
            instance_location,
            hash: hasher.finish(),
            hash_ignoring_location,
        })
    }

    pub fn for_local(symbol: &Symbol) -> Arc<AnalysisEntity> {
        let ty = symbol.ty.clone();
        let kind = EntityKind::Local {
            symbol: symbol.clone(),
        };
        AnalysisEntity::new(kind, ty, None, PointsToAbstractValue::NoLocation)
    }

    pub fn for_parameter(symbol: &Symbol) -> Arc<AnalysisEntity> {
        let ty = symbol.ty.clone();
        let kind = EntityKind::Parameter {
            symbol: symbol.clone(),
        };
        AnalysisEntity::new(kind, ty, None, PointsToAbstractValue::NoLocation)
    }

    /// The self instance entity. Its instance location is the value of the self reference.
    pub fn for_this_or_me(ty: TypeInfo, this_value: PointsToAbstractValue) -> Arc<AnalysisEntity> {
        AnalysisEntity::new(EntityKind::ThisOrMe, ty, None, this_value)
    }

    pub fn for_flow_capture(id: CaptureId, ty: TypeInfo) -> Arc<AnalysisEntity> {
        AnalysisEntity::new(
            EntityKind::FlowCapture { id },
            ty,
            None,
            PointsToAbstractValue::NoLocation,
        )
    }

    pub fn for_result(ty: TypeInfo) -> Arc<AnalysisEntity> {
        AnalysisEntity::new(EntityKind::Result, ty, None, PointsToAbstractValue::NoLocation)
    }
}

/// Queries
impl AnalysisEntity {
    pub fn symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            EntityKind::Local { symbol }
            | EntityKind::Parameter { symbol }
            | EntityKind::Member { symbol } => Some(symbol),
            _ => None,
        }
    }

    pub fn has_copy_semantics(&self) -> bool {
        self.ty.has_copy_semantics()
    }

    pub fn is_this_or_me(&self) -> bool {
        self.kind == EntityKind::ThisOrMe
    }

    /// True for locals and compiler synthesized slots, which nothing outside of the routine
    /// can observe or update.
    pub fn is_routine_local(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Local { .. } | EntityKind::FlowCapture { .. } | EntityKind::Result
        )
    }

    /// True for members and elements of heap objects and for static members, i.e. storage that
    /// a callee may update without being handed a reference to it.
    pub fn is_heap_member(&self) -> bool {
        match self.kind {
            EntityKind::Member { .. } | EntityKind::ArrayElement { .. } => {
                self.parent.as_ref().map_or(true, |p| p.is_heap_member())
            }
            _ => false,
        }
    }

    /// True if other is a member (or a member of a member) of self.
    pub fn is_ancestor_of(&self, other: &AnalysisEntity) -> bool {
        let mut current = other.parent.as_ref();
        while let Some(parent) = current {
            if parent.as_ref() == self {
                return true;
            }
            current = parent.parent.as_ref();
        }
        false
    }

    /// True if self is a member of some instance with the given member symbol.
    pub fn is_member_named_by(&self, member: &Symbol) -> bool {
        matches!(&self.kind, EntityKind::Member { symbol } if symbol == member)
    }

    pub fn is_array_element(&self) -> bool {
        matches!(self.kind, EntityKind::ArrayElement { .. })
    }

    /// True if an update of self could also be an update of other, because both select the same
    /// member (or possibly overlapping elements) of instances that may be the same heap object.
    pub fn may_overlap_with(&self, other: &AnalysisEntity) -> bool {
        if self == other || self.parent != other.parent {
            return false;
        }
        let same_selector = match (&self.kind, &other.kind) {
            (EntityKind::Member { symbol: s1 }, EntityKind::Member { symbol: s2 }) => s1 == s2,
            (EntityKind::ArrayElement { indices: i1 }, EntityKind::ArrayElement { indices: i2 }) => {
                i1.len() != i2.len()
                    || i1.iter().zip(i2.iter()).all(|pair| match pair {
                        (AbstractIndex::Constant(c1), AbstractIndex::Constant(c2)) => c1 == c2,
                        _ => true,
                    })
            }
            _ => false,
        };
        same_selector
            && (self.parent.is_some()
                || self
                    .instance_location
                    .may_alias(&other.instance_location))
    }
}

impl EnvironmentKey for Arc<AnalysisEntity> {
    fn hash_ignoring_instance_location(&self) -> u64 {
        self.hash_ignoring_location
    }

    fn equals_ignoring_instance_location(&self, other: &Self) -> bool {
        AnalysisEntity::equals_ignoring_instance_location(self, other)
    }

    fn has_same_instance_location(&self, other: &Self) -> bool {
        self.instance_location == other.instance_location
    }

    #[logfn_inputs(TRACE)]
    fn with_merged_instance_location(&self, other: &Self) -> Self {
        AnalysisEntity::new(
            self.kind.clone(),
            self.ty.clone(),
            self.parent.clone(),
            self.instance_location.merge(&other.instance_location),
        )
    }
}

impl AnalysisEntity {
    pub fn equals_ignoring_instance_location(&self, other: &AnalysisEntity) -> bool {
        self.hash_ignoring_location == other.hash_ignoring_location
            && self.kind == other.kind
            && self.parent == other.parent
    }
}

/// Maps reference operations to the entities they denote.
///
/// Members of heap objects are identified by the points-to value of the instance operation,
/// which the caller supplies, so the factory serves the points-to analysis itself as well as
/// analyses that run on top of a completed points-to analysis.
#[derive(Clone, Debug)]
pub struct AnalysisEntityFactory {
    this_or_me: Option<Arc<AnalysisEntity>>,
}

impl AnalysisEntityFactory {
    /// this_type is the containing type of the analyzed routine, None if it is static.
    pub fn new(this_type: Option<TypeInfo>, this_value: PointsToAbstractValue) -> Self {
        AnalysisEntityFactory {
            this_or_me: this_type.map(|ty| AnalysisEntity::for_this_or_me(ty, this_value)),
        }
    }

    pub fn this_or_me(&self) -> Option<&Arc<AnalysisEntity>> {
        self.this_or_me.as_ref()
    }

    /// Returns the entity denoted by a reference operation, or None if the operation is not a
    /// reference or refers to storage that cannot be tracked, e.g. a member of an instance
    /// whose heap location is unknown.
    pub fn try_create<F>(&self, operation: &Operation, instance_location_of: &F) -> Option<Arc<AnalysisEntity>>
    where
        F: Fn(&Operation) -> PointsToAbstractValue,
    {
        let ty = operation.ty.clone();
        match &operation.kind {
            OperationKind::LocalReference { local } => Some(AnalysisEntity::for_local(local)),
            OperationKind::ParameterReference { parameter } => {
                Some(AnalysisEntity::for_parameter(parameter))
            }
            OperationKind::InstanceReference { receiver: None } => self.this_or_me.clone(),
            OperationKind::FlowCapture { id, value } => Some(AnalysisEntity::for_flow_capture(
                *id,
                value.ty.clone().or(ty).unwrap_or_else(|| TypeInfo::type_parameter("?")),
            )),
            OperationKind::FlowCaptureReference { id } => Some(AnalysisEntity::for_flow_capture(
                *id,
                ty.unwrap_or_else(|| TypeInfo::type_parameter("?")),
            )),
            OperationKind::FieldReference { instance, field } => {
                self.try_create_member(field, instance.as_deref(), instance_location_of)
            }
            OperationKind::PropertyReference {
                instance,
                property,
                arguments,
            } if arguments.is_empty() => {
                self.try_create_member(property, instance.as_deref(), instance_location_of)
            }
            OperationKind::ArrayElementReference { array, indices } => {
                let kind = EntityKind::ArrayElement {
                    indices: indices
                        .iter()
                        .map(|index| match &index.constant {
                            Some(ConstantValue::Int(i)) => AbstractIndex::Constant(*i),
                            _ => AbstractIndex::Operation(index.id),
                        })
                        .collect(),
                };
                let element_type = ty.unwrap_or_else(|| TypeInfo::type_parameter("?"));
                self.try_create_child(kind, element_type, array, instance_location_of)
            }
            _ => None,
        }
    }

    fn try_create_member<F>(
        &self,
        member: &Symbol,
        instance: Option<&Operation>,
        instance_location_of: &F,
    ) -> Option<Arc<AnalysisEntity>>
    where
        F: Fn(&Operation) -> PointsToAbstractValue,
    {
        let kind = EntityKind::Member {
            symbol: member.clone(),
        };
        match instance {
            Some(instance) => {
                self.try_create_child(kind, member.ty.clone(), instance, instance_location_of)
            }
            None if member.is_static() => Some(
                AnalysisEntity::new(kind, member.ty.clone(), None, PointsToAbstractValue::NoLocation),
            ),
            None => {
                // An instance member without an explicit instance is a member of the self instance.
                let this = self.this_or_me.as_ref()?;
                Some(AnalysisEntity::new(
                    kind,
                    member.ty.clone(),
                    None,
                    this.instance_location.clone(),
                ))
            }
        }
    }

    fn try_create_child<F>(
        &self,
        kind: EntityKind,
        ty: TypeInfo,
        instance: &Operation,
        instance_location_of: &F,
    ) -> Option<Arc<AnalysisEntity>>
    where
        F: Fn(&Operation) -> PointsToAbstractValue,
    {
        if instance.has_copy_semantics_type() {
            // A member of a value is part of the storage that holds the value.
            let parent = self.try_create(instance, instance_location_of)?;
            return Some(AnalysisEntity::new(
                kind,
                ty,
                Some(parent),
                PointsToAbstractValue::NoLocation,
            ));
        }
        match instance_location_of(instance) {
            location @ PointsToAbstractValue::Known(..) => {
                Some(AnalysisEntity::new(kind, ty, None, location))
            }
            _ => None,
        }
    }
}
