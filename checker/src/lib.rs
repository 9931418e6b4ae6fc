// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.
//
// A framework for flow sensitive, intra-procedural dataflow analyses over the control flow
// graphs of routine bodies, together with a points-to analysis built on top of it.
// The analyses are generic over their abstract domains: the fixed point engine and the
// operation interpreter know nothing about points-to sets, which are supplied by a client
// implementation of operation_visitor::OperationVisitor.

#[macro_use]
extern crate log;

pub mod abstract_domains;
pub mod abstract_location;
pub mod analysis_entity;
pub mod block_visitor;
pub mod body_visitor;
pub mod bool_domain;
pub mod call_visitor;
pub mod cfg;
pub mod crate_visitor;
pub mod environment;
pub mod fixed_point_visitor;
pub mod k_limits;
pub mod location_visitor;
pub mod operation;
pub mod operation_visitor;
pub mod options;
pub mod points_to_analysis;
pub mod points_to_value;
pub mod summaries;
