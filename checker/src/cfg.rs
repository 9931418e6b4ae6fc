// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::operation::{Operation, Symbol, TypeInfo};

use log_derive::logfn_inputs;
use mirai_annotations::*;
use petgraph::algo::dominators;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter, Result};
use std::sync::Arc;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl Debug for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_fmt(format_args!("bb{}", self.0))
    }
}

/// The outcome of the block's branch value under which an edge is taken.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BranchCondition {
    Always,
    WhenTrue,
    WhenFalse,
}

impl Default for BranchCondition {
    fn default() -> Self {
        BranchCondition::Always
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Successor {
    pub target: BlockId,
    #[serde(default)]
    pub condition: BranchCondition,
}

impl Successor {
    pub fn always(target: usize) -> Successor {
        Successor {
            target: BlockId(target),
            condition: BranchCondition::Always,
        }
    }

    pub fn when(target: usize, value: bool) -> Successor {
        Successor {
            target: BlockId(target),
            condition: if value {
                BranchCondition::WhenTrue
            } else {
                BranchCondition::WhenFalse
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    pub id: BlockId,
    #[serde(default)]
    pub operations: Vec<Operation>,
    /// The value that decides which conditional successor is taken.
    #[serde(default)]
    pub branch_value: Option<Operation>,
    #[serde(default)]
    pub successors: Vec<Successor>,
}

impl BasicBlock {
    pub fn new(id: usize, operations: Vec<Operation>, successors: Vec<Successor>) -> BasicBlock {
        BasicBlock {
            id: BlockId(id),
            operations,
            branch_value: None,
            successors,
        }
    }
}

/// The control flow graph of a routine body. The first block is the entry block and the last
/// block is the exit block. The provider is responsible for well formedness: edges that point
/// at blocks that do not exist are ignored.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "Vec<BasicBlock>", into = "Vec<BasicBlock>")]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
    graph: DiGraph<BlockId, BranchCondition>,
    node_of: HashMap<BlockId, NodeIndex>,
    predecessors: HashMap<BlockId, Vec<BlockId>>,
}

impl Debug for ControlFlowGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_map()
            .entries(
                self.blocks
                    .iter()
                    .map(|b| (b.id, b.successors.iter().map(|s| s.target).collect::<Vec<_>>())),
            )
            .finish()
    }
}

impl From<Vec<BasicBlock>> for ControlFlowGraph {
    fn from(blocks: Vec<BasicBlock>) -> Self {
        ControlFlowGraph::new(blocks)
    }
}

impl From<ControlFlowGraph> for Vec<BasicBlock> {
    fn from(cfg: ControlFlowGraph) -> Self {
        cfg.blocks
    }
}

impl ControlFlowGraph {
    #[logfn_inputs(TRACE)]
    pub fn new(blocks: Vec<BasicBlock>) -> ControlFlowGraph {
        checked_assume!(!blocks.is_empty());
        let mut graph = DiGraph::new();
        let mut node_of = HashMap::new();
        for block in blocks.iter() {
            node_of.insert(block.id, graph.add_node(block.id));
        }
        let mut predecessors: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        for block in blocks.iter() {
            for successor in block.successors.iter() {
                let target = match node_of.get(&successor.target) {
                    Some(node) => *node,
                    None => {
                        debug_checked_assume!(false, "dangling edge to {:?}", successor.target);
                        continue;
                    }
                };
                graph.add_edge(node_of[&block.id], target, successor.condition);
                let preds = predecessors.entry(successor.target).or_default();
                if !preds.contains(&block.id) {
                    preds.push(block.id);
                }
            }
        }
        ControlFlowGraph {
            blocks,
            graph,
            node_of,
            predecessors,
        }
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.node_of
            .get(&id)
            .map(|node| &self.blocks[node.index()])
    }

    pub fn entry(&self) -> BlockId {
        self.blocks[0].id
    }

    pub fn exit(&self) -> BlockId {
        self.blocks[self.blocks.len() - 1].id
    }

    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        self.predecessors
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The blocks reachable from the entry block, in reverse postorder, so that each block
    /// comes after all of its predecessors except those reached via a back edge.
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut dfs = DfsPostOrder::new(&self.graph, self.node_of[&self.entry()]);
        let mut result = Vec::with_capacity(self.blocks.len());
        while let Some(node) = dfs.next(&self.graph) {
            result.push(self.graph[node]);
        }
        result.reverse();
        result
    }

    /// A block is a loop anchor if it dominates one of its predecessors, i.e. it is the target
    /// of a back edge.
    pub fn loop_anchors(&self) -> HashSet<BlockId> {
        let root = self.node_of[&self.entry()];
        let dominators = dominators::simple_fast(&self.graph, root);
        let mut anchors = HashSet::new();
        for block in self.blocks.iter() {
            let node = self.node_of[&block.id];
            for pred in self.predecessors(block.id) {
                let pred_node = self.node_of[pred];
                let is_back_edge = dominators
                    .dominators(pred_node)
                    .map_or(false, |mut doms| doms.any(|d| d == node));
                if is_back_edge {
                    anchors.insert(block.id);
                }
            }
        }
        anchors
    }
}

/// A routine body as handed over by the IR provider.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RoutineBody {
    pub name: Arc<str>,
    /// The type of the self instance, None for static routines.
    #[serde(default)]
    pub containing_type: Option<TypeInfo>,
    #[serde(default)]
    pub parameters: Vec<Symbol>,
    pub return_type: TypeInfo,
    pub cfg: ControlFlowGraph,
}

impl RoutineBody {
    pub fn new(
        name: &str,
        containing_type: Option<TypeInfo>,
        parameters: Vec<Symbol>,
        return_type: TypeInfo,
        blocks: Vec<BasicBlock>,
    ) -> RoutineBody {
        RoutineBody {
            name: Arc::from(name),
            containing_type,
            parameters,
            return_type,
            cfg: ControlFlowGraph::new(blocks),
        }
    }

    /// Reads a routine body from its JSON serialization.
    pub fn from_json(json: &str) -> serde_json::Result<RoutineBody> {
        serde_json::from_str(json)
    }
}
