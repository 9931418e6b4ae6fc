// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::operation::{OperationId, Symbol, TypeInfo};

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};

/// An abstraction of a heap location. Locations are identified by the site that gives rise to
/// them, never by a runtime address, so a given allocation site always yields the same location.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AbstractLocation {
    /// The location referred to by a null reference.
    Null,

    /// Whatever the symbol (usually a parameter) refers to on entry to the routine.
    Symbol { symbol: Symbol },

    /// The object allocated by the given creation or invocation operation.
    Creation { operation: OperationId, ty: TypeInfo },

    /// The instance the analyzed routine was invoked on.
    ThisOrMe { ty: TypeInfo },
}

impl Debug for AbstractLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            AbstractLocation::Null => f.write_str("null"),
            AbstractLocation::Symbol { symbol } => f.write_fmt(format_args!("*{:?}", symbol)),
            AbstractLocation::Creation { operation, ty } => {
                f.write_fmt(format_args!("new {:?}@{:?}", ty, operation))
            }
            AbstractLocation::ThisOrMe { ty } => f.write_fmt(format_args!("this:{:?}", ty)),
        }
    }
}

impl AbstractLocation {
    pub fn for_creation(operation: OperationId, ty: TypeInfo) -> AbstractLocation {
        AbstractLocation::Creation { operation, ty }
    }

    pub fn for_symbol(symbol: Symbol) -> AbstractLocation {
        AbstractLocation::Symbol { symbol }
    }

    pub fn for_this_or_me(ty: TypeInfo) -> AbstractLocation {
        AbstractLocation::ThisOrMe { ty }
    }

    /// True for locations that stand for objects allocated by the analyzed routine.
    pub fn is_allocation_site(&self) -> bool {
        matches!(self, AbstractLocation::Creation { .. })
    }

    /// The static type of the object at this location, if known.
    pub fn ty(&self) -> Option<&TypeInfo> {
        match self {
            AbstractLocation::Null => None,
            AbstractLocation::Symbol { symbol } => Some(&symbol.ty),
            AbstractLocation::Creation { ty, .. } | AbstractLocation::ThisOrMe { ty } => Some(ty),
        }
    }
}
