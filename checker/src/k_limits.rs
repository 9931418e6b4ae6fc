// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Somewhat arbitrary constants used to limit things in the fixed point engine that may
// take too long or use too much memory. The iteration limits can be overridden via Options.

/// The maximum number of times a single block is visited before the engine gives up on it.
pub const MAX_FIXPOINT_ITERATIONS: usize = 50;

/// Loop anchors are joined for this many visits and widened after that.
pub const WIDEN_AFTER_ITERATIONS: usize = 3;

/// A points-to set with more locations than this becomes Unknown.
/// Keeps the height of the points-to lattice finite.
pub const MAX_TRACKED_LOCATIONS: usize = 16;
