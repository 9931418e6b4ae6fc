// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::block_visitor::BlockVisitor;
use crate::body_visitor::BodyVisitor;
use crate::cfg::BlockId;
use crate::operation::OperationId;
use crate::operation_visitor::OperationVisitor;
use crate::options::{DiagLevel, WorklistOrder};

use itertools::Itertools;
use log_derive::*;
use mirai_annotations::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result};
use std::sync::Arc;

/// Where a block is in the fixed point computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockStatus {
    NotVisited,
    /// The block is on the worklist because the state flowing into it may have changed.
    InProgress,
    /// The out state of the block reflects the current out states of its predecessors.
    Stable,
}

/// The states at the start and at the end of a block, once a fixed point has been reached.
#[derive(Clone, Debug)]
pub struct BlockAnalysisState<D> {
    pub entry: D,
    pub exit: D,
}

/// The immutable outcome of analyzing one routine body.
#[derive(Clone)]
pub struct DataFlowAnalysisResult<V, D> {
    pub routine_name: Arc<str>,
    /// The block that control leaves the routine from.
    pub exit_block: BlockId,
    block_states: HashMap<BlockId, BlockAnalysisState<D>>,
    operation_values: HashMap<OperationId, V>,
    /// True if some block did not stabilize within the iteration limit, in which case the
    /// states of that block and of the blocks it flows into may be incomplete.
    pub reached_iteration_limit: bool,
}

impl<V, D> Debug for DataFlowAnalysisResult<V, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("DataFlowAnalysisResult({})", self.routine_name))
    }
}

impl<V, D> DataFlowAnalysisResult<V, D> {
    /// The state on entry to the block, None if the block is unreachable.
    pub fn entry_state(&self, block: BlockId) -> Option<&D> {
        self.block_states.get(&block).map(|s| &s.entry)
    }

    /// The state on exit from the block, None if the block is unreachable.
    pub fn exit_state(&self, block: BlockId) -> Option<&D> {
        self.block_states.get(&block).map(|s| &s.exit)
    }

    /// The state when control leaves the routine, None if the routine never returns.
    pub fn routine_exit_state(&self) -> Option<&D> {
        self.exit_state(self.exit_block)
    }

    /// The value computed for the operation, None if the operation is unreachable.
    pub fn value_of_operation(&self, id: OperationId) -> Option<&V> {
        self.operation_values.get(&id)
    }

    /// The reachable blocks, in no particular order.
    pub fn reachable_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.block_states.keys().copied()
    }
}

pub struct FixedPointVisitor<'fixed, 'analysis, A: OperationVisitor> {
    pub bv: &'fixed mut BodyVisitor<'analysis, A>,
    /// The blocks reachable from the entry, in reverse postorder.
    block_order: Vec<BlockId>,
    order_index: HashMap<BlockId, usize>,
    loop_anchors: HashSet<BlockId>,
    first_state: A::Data,
    status: HashMap<BlockId, BlockStatus>,
    visit_count: HashMap<BlockId, usize>,
    in_state: HashMap<BlockId, A::Data>,
    out_state: HashMap<BlockId, A::Data>,
    /// The successors a block was found to flow to during its most recent visit.
    feasible_successors: HashMap<BlockId, Vec<BlockId>>,
    reached_iteration_limit: bool,
}

impl<'fixed, 'analysis, A: OperationVisitor> Debug for FixedPointVisitor<'fixed, 'analysis, A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "FixedPoint".fmt(f)
    }
}

/// Computes the states of the blocks of a routine body by propagating states along the edges
/// of its control flow graph until nothing changes any more.
impl<'fixed, 'analysis, A: OperationVisitor> FixedPointVisitor<'fixed, 'analysis, A> {
    #[logfn_inputs(TRACE)]
    pub fn new(
        body_visitor: &'fixed mut BodyVisitor<'analysis, A>,
        first_state: A::Data,
    ) -> FixedPointVisitor<'fixed, 'analysis, A> {
        let cfg = &body_visitor.body.cfg;
        let block_order = cfg.reverse_postorder();
        let order_index: HashMap<BlockId, usize> = block_order
            .iter()
            .enumerate()
            .map(|(i, bb)| (*bb, i))
            .collect();
        let loop_anchors = cfg.loop_anchors();
        let status = block_order
            .iter()
            .map(|bb| (*bb, BlockStatus::NotVisited))
            .collect();
        trace!(
            "block order {:?} with loop anchors {:?}",
            block_order,
            loop_anchors.iter().sorted().collect::<Vec<_>>()
        );
        FixedPointVisitor {
            bv: body_visitor,
            block_order,
            order_index,
            loop_anchors,
            first_state,
            status,
            visit_count: HashMap::new(),
            in_state: HashMap::new(),
            out_state: HashMap::new(),
            feasible_successors: HashMap::new(),
            reached_iteration_limit: false,
        }
    }

    /// Visits blocks until the out state of every reachable block is stable.
    #[logfn_inputs(TRACE)]
    pub fn visit_blocks(&mut self) {
        let mut worklist: BTreeSet<usize> = BTreeSet::new();
        worklist.insert(0);
        while let Some(index) = self.take_next(&mut worklist) {
            let bb = self.block_order[index];
            let visits = self.visit_count.entry(bb).or_insert(0);
            *visits += 1;
            let iteration_count = *visits;
            if iteration_count > self.bv.options.max_fixpoint_iterations {
                self.report_iteration_limit(bb, iteration_count);
                continue;
            }
            let successors_before = self.feasible_successors.get(&bb).cloned();
            let changed = self.visit_basic_block(bb, iteration_count);
            let successors = self.feasible_successors.get(&bb).cloned().unwrap_or_default();
            for successor in successors.iter() {
                let newly_feasible = successors_before
                    .as_ref()
                    .map_or(true, |before| !before.contains(successor));
                if !changed && !newly_feasible {
                    continue;
                }
                if let Some(successor_index) = self.order_index.get(successor) {
                    if self.status[successor] == BlockStatus::Stable {
                        self.status.insert(*successor, BlockStatus::InProgress);
                    }
                    worklist.insert(*successor_index);
                }
            }
        }
    }

    /// Removes the block that should be visited next from the worklist. A block is only taken
    /// once none of the blocks that flow into it along forward edges are still queued, so that
    /// every block sees all of the changes upstream of it in a single visit. The first queued
    /// block in reverse postorder always qualifies.
    fn take_next(&self, worklist: &mut BTreeSet<usize>) -> Option<usize> {
        let next = match self.bv.options.worklist_order {
            WorklistOrder::ReversePostorder => worklist.iter().next().copied(),
            WorklistOrder::ReverseOfReversePostorder => worklist
                .iter()
                .rev()
                .find(|index| !self.has_queued_ancestor(**index, worklist))
                .copied(),
        }?;
        worklist.remove(&next);
        Some(next)
    }

    /// True if a queued block reaches the block at index via forward edges only.
    fn has_queued_ancestor(&self, index: usize, worklist: &BTreeSet<usize>) -> bool {
        let lowest = match worklist.iter().next() {
            Some(lowest) => *lowest,
            None => return false,
        };
        let cfg = &self.bv.body.cfg;
        let mut seen: HashSet<usize> = HashSet::new();
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            for pred in cfg.predecessors(self.block_order[current]) {
                let pred_index = match self.order_index.get(pred) {
                    Some(pred_index) => *pred_index,
                    None => continue,
                };
                // Back edges come from blocks that are not earlier in reverse postorder.
                if pred_index >= current || pred_index < lowest || !seen.insert(pred_index) {
                    continue;
                }
                if worklist.contains(&pred_index) {
                    return true;
                }
                stack.push(pred_index);
            }
        }
        false
    }

    fn report_iteration_limit(&mut self, bb: BlockId, iteration_count: usize) {
        self.reached_iteration_limit = true;
        self.status.insert(bb, BlockStatus::Stable);
        if self.bv.options.diag_level == DiagLevel::Paranoid {
            warn!(
                "Fixed point loop iterations {} exceeded limit of {} at {:?} in routine {}.",
                iteration_count,
                self.bv.options.max_fixpoint_iterations,
                bb,
                self.bv.body.name
            );
        } else {
            debug!(
                "Fixed point loop iterations {} exceeded limit of {} at {:?} in routine {}.",
                iteration_count,
                self.bv.options.max_fixpoint_iterations,
                bb,
                self.bv.body.name
            );
        }
    }

    /// Visits a single basic block, starting with an in_state that is the merge of all of
    /// the out_state values of its predecessors and then updating out_state with the final
    /// state of the block. Returns true if out_state changed.
    #[logfn_inputs(TRACE)]
    fn visit_basic_block(&mut self, bb: BlockId, iteration_count: usize) -> bool {
        let mut i_state = self.get_initial_state_from_predecessors(bb);
        if self.loop_anchors.contains(&bb) && iteration_count > self.bv.options.widen_after {
            if let Some(previous_state) = self.in_state.get(&bb) {
                let analysis = self.bv.analysis;
                i_state = analysis.widen_data(&i_state, previous_state);
            }
        }
        self.in_state.insert(bb, i_state.clone());
        self.status.insert(bb, BlockStatus::InProgress);

        self.bv.current_data = i_state;
        let body = self.bv.body;
        let successors = match body.cfg.block(bb) {
            Some(block) => BlockVisitor::new(self.bv).visit_basic_block(block),
            None => assume_unreachable!(),
        };
        self.feasible_successors.insert(bb, successors);

        let o_state = std::mem::take(&mut self.bv.current_data);
        let changed = self.out_state.get(&bb) != Some(&o_state);
        self.out_state.insert(bb, o_state);
        self.status.insert(bb, BlockStatus::Stable);
        changed
    }

    /// Merges the exit states of the predecessors of the block that have been visited and
    /// that were found to flow into the block. Predecessors that have not been visited yet
    /// contribute nothing. The entry block also starts from the initial state of the routine.
    #[logfn_inputs(TRACE)]
    fn get_initial_state_from_predecessors(&self, bb: BlockId) -> A::Data {
        let analysis = self.bv.analysis;
        let cfg = &self.bv.body.cfg;
        let mut predecessor_states = cfg
            .predecessors(bb)
            .iter()
            .filter(|pred_bb| {
                self.feasible_successors
                    .get(pred_bb)
                    .map_or(false, |successors| successors.contains(&bb))
            })
            .filter_map(|pred_bb| self.out_state.get(pred_bb));
        let first = if bb == cfg.entry() {
            Some(self.first_state.clone())
        } else {
            predecessor_states.next().cloned()
        };
        let state = predecessor_states.fold(first, |state, pred_state| match state {
            Some(state) => Some(analysis.merge_data(&state, pred_state)),
            None => Some(pred_state.clone()),
        });
        match state {
            Some(state) => state,
            None => {
                // Blocks are only visited once one of their predecessors flows into them.
                debug_checked_assume!(false, "{:?} has no visited predecessor", bb);
                self.first_state.clone()
            }
        }
    }

    /// Consumes the visitor, producing the states computed for each reachable block.
    pub fn into_result(self) -> DataFlowAnalysisResult<A::Value, A::Data> {
        let mut block_states = HashMap::new();
        for bb in self.block_order.iter() {
            if let (Some(entry), Some(exit)) = (self.in_state.get(bb), self.out_state.get(bb)) {
                block_states.insert(
                    *bb,
                    BlockAnalysisState {
                        entry: entry.clone(),
                        exit: exit.clone(),
                    },
                );
            } else {
                debug_checked_assume_eq!(self.status[bb], BlockStatus::NotVisited);
                trace!("{:?} is not reachable", bb);
            }
        }
        DataFlowAnalysisResult {
            routine_name: self.bv.body.name.clone(),
            exit_block: self.bv.body.cfg.exit(),
            block_states,
            operation_values: std::mem::take(&mut self.bv.operation_values),
            reached_iteration_limit: self.reached_iteration_limit,
        }
    }
}
