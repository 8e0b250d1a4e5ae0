#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Generic least-cost graph solver.
//!
//! The solver knows nothing about tiles. Callers describe their graph through
//! the narrow [`Graph`] capability (a cost estimate, an adjacency enumeration
//! and vertex equality via `Eq + Hash`) and receive a [`SolveOutcome`] they are
//! expected to branch on. Scratch storage is owned by the [`Pather`] and reused
//! across searches.

use std::{
    cmp::Ordering,
    collections::{hash_map::Entry, BinaryHeap, HashMap},
    hash::Hash,
};

/// Default number of vertices a single search may expand.
pub const DEFAULT_NODE_BUDGET: usize = 8_192;

/// Capability a caller exposes so the solver can walk its graph.
pub trait Graph {
    /// Opaque vertex handle. Equal handles denote the same vertex.
    type State: Copy + Eq + Hash;

    /// Admissible estimate of the cost between two vertices.
    fn least_cost_estimate(&self, from: Self::State, to: Self::State) -> f32;

    /// Pushes every vertex reachable in one step from `state` with its cost.
    fn adjacent_cost(&self, state: Self::State, adjacent: &mut Vec<StateCost<Self::State>>);
}

/// Neighbouring vertex paired with the cost of reaching it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateCost<S> {
    /// Vertex reached.
    pub state: S,
    /// Cost of the step, or the accumulated cost for near-state queries.
    pub cost: f32,
}

/// Result of a least-cost search.
#[derive(Clone, Debug, PartialEq)]
pub enum SolveOutcome<S> {
    /// The goal was reached.
    Solved {
        /// Vertices from start to goal, both inclusive.
        path: Vec<S>,
        /// Total cost of the path.
        cost: f32,
    },
    /// Every reachable vertex was expanded without meeting the goal.
    NoSolution,
    /// Start and goal are the same vertex.
    StartEndSame,
    /// The node budget ran out before the search finished.
    OutOfMemory,
}

/// Reusable least-cost solver.
#[derive(Debug)]
pub struct Pather<S> {
    node_budget: usize,
    open: BinaryHeap<OpenNode<S>>,
    nodes: HashMap<S, NodeRecord<S>>,
    adjacent: Vec<StateCost<S>>,
    sequence: u64,
}

impl<S> Pather<S>
where
    S: Copy + Eq + Hash,
{
    /// Creates a solver that expands at most `node_budget` vertices per search.
    #[must_use]
    pub fn new(node_budget: usize) -> Self {
        Self {
            node_budget: node_budget.max(1),
            open: BinaryHeap::new(),
            nodes: HashMap::new(),
            adjacent: Vec::new(),
            sequence: 0,
        }
    }

    /// Maximum number of vertices a search may expand.
    #[must_use]
    pub fn node_budget(&self) -> usize {
        self.node_budget
    }

    /// Finds the least-cost path from `start` to `goal`.
    pub fn solve<G>(&mut self, graph: &G, start: S, goal: S) -> SolveOutcome<S>
    where
        G: Graph<State = S>,
    {
        if start == goal {
            return SolveOutcome::StartEndSame;
        }

        self.reset();
        let estimate = graph.least_cost_estimate(start, goal);
        let _ = self.nodes.insert(start, NodeRecord::new(None, 0.0));
        self.push_open(start, 0.0, estimate);

        let mut expanded = 0usize;
        while let Some(current) = self.open.pop() {
            let Some(record) = self.nodes.get_mut(&current.state) else {
                continue;
            };
            if record.closed || current.g > record.g {
                continue;
            }
            record.closed = true;

            if current.state == goal {
                let path = self.reconstruct(goal);
                log::trace!("solved path of {} vertices after {expanded} expansions", path.len());
                return SolveOutcome::Solved {
                    path,
                    cost: current.g,
                };
            }

            expanded += 1;
            if expanded > self.node_budget {
                log::debug!("path search exhausted budget of {} vertices", self.node_budget);
                return SolveOutcome::OutOfMemory;
            }

            self.adjacent.clear();
            graph.adjacent_cost(current.state, &mut self.adjacent);
            for index in 0..self.adjacent.len() {
                let StateCost { state, cost } = self.adjacent[index];
                let tentative = current.g + cost;
                if !self.relax(state, current.state, tentative) {
                    continue;
                }
                let estimate = graph.least_cost_estimate(state, goal);
                self.push_open(state, tentative, tentative + estimate);
            }
        }

        SolveOutcome::NoSolution
    }

    /// Collects every vertex reachable from `start` with accumulated cost at
    /// most `max_cost`, in order of increasing cost. The start is included with
    /// cost zero unless `max_cost` is negative or NaN, which yields nothing.
    pub fn solve_for_near_states<G>(
        &mut self,
        graph: &G,
        start: S,
        max_cost: f32,
        out: &mut Vec<StateCost<S>>,
    ) where
        G: Graph<State = S>,
    {
        out.clear();
        if max_cost.is_nan() || max_cost < 0.0 {
            return;
        }
        self.reset();
        let _ = self.nodes.insert(start, NodeRecord::new(None, 0.0));
        self.push_open(start, 0.0, 0.0);

        while let Some(current) = self.open.pop() {
            let Some(record) = self.nodes.get_mut(&current.state) else {
                continue;
            };
            if record.closed || current.g > record.g {
                continue;
            }
            record.closed = true;
            out.push(StateCost {
                state: current.state,
                cost: current.g,
            });

            self.adjacent.clear();
            graph.adjacent_cost(current.state, &mut self.adjacent);
            for index in 0..self.adjacent.len() {
                let StateCost { state, cost } = self.adjacent[index];
                let tentative = current.g + cost;
                if tentative > max_cost {
                    continue;
                }
                if self.relax(state, current.state, tentative) {
                    self.push_open(state, tentative, tentative);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.open.clear();
        self.nodes.clear();
        self.sequence = 0;
    }

    fn push_open(&mut self, state: S, g: f32, f: f32) {
        self.sequence += 1;
        self.open.push(OpenNode {
            state,
            g,
            f,
            sequence: self.sequence,
        });
    }

    /// Records a cheaper route to `state`; returns whether it improved.
    fn relax(&mut self, state: S, parent: S, g: f32) -> bool {
        match self.nodes.entry(state) {
            Entry::Vacant(slot) => {
                let _ = slot.insert(NodeRecord::new(Some(parent), g));
                true
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.closed || g >= record.g {
                    return false;
                }
                record.g = g;
                record.parent = Some(parent);
                true
            }
        }
    }

    fn reconstruct(&self, goal: S) -> Vec<S> {
        let mut path = vec![goal];
        let mut cursor = goal;
        while let Some(parent) = self.nodes.get(&cursor).and_then(|record| record.parent) {
            path.push(parent);
            cursor = parent;
        }
        path.reverse();
        path
    }
}

impl<S> Default for Pather<S>
where
    S: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new(DEFAULT_NODE_BUDGET)
    }
}

#[derive(Clone, Copy, Debug)]
struct NodeRecord<S> {
    parent: Option<S>,
    g: f32,
    closed: bool,
}

impl<S> NodeRecord<S> {
    fn new(parent: Option<S>, g: f32) -> Self {
        Self {
            parent,
            g,
            closed: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenNode<S> {
    state: S,
    g: f32,
    f: f32,
    sequence: u64,
}

impl<S> PartialEq for OpenNode<S> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<S> Eq for OpenNode<S> {}

impl<S> PartialOrd for OpenNode<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for OpenNode<S> {
    // Reversed so the max-heap yields the lowest f; ties favour the deeper
    // node, then the earliest push.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| self.g.total_cmp(&other.g))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
