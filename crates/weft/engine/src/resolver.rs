//! Dependency graph and path resolution
//!
//! The graph has two node kinds: slot ids and trait ids. A slot-based
//! trait depends on each slot it requires (trait -> slot), and each slot
//! it provides is unlocked by it (slot -> trait). Predicate traits add
//! only the unlock edges; their gate is a value test, not other slots.
//! Registration is check-then-commit: candidate edges are built aside,
//! cycle-checked, and only then committed together with the trait.
//!
//! Resolution walks capability states breadth-first: a state is the set
//! of slot ids already reachable through the traits chosen so far. Every
//! slot-based trait whose requirements are a subset of the state extends
//! the frontier; completed paths are collected in discovery order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::collections::BTreeSet;

use tracing::{debug, warn};
use weft_types::{SlotId, TraitId, Value, WeftError, WeftResult};

use crate::traits::{Requirement, TraitRef};

/// An ordered trait sequence that, applied in order, satisfies a target
/// slot.
pub type Path = Vec<TraitRef>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GraphNode {
    Slot(SlotId),
    Trait(TraitId),
}

type EdgeMap = HashMap<GraphNode, Vec<GraphNode>>;

/// Outcome of a resolution search. `matched` records whether any
/// predicate trait accepted the value at all, which the invocation
/// error path reports separately from "no path reached the slot".
pub(crate) struct Search {
    pub paths: Vec<Path>,
    pub matched: bool,
}

pub(crate) struct Resolver {
    traits: Vec<TraitRef>,
    edges: EdgeMap,
    next_trait: u64,
}

impl Resolver {
    pub(crate) fn new() -> Self {
        Self {
            traits: Vec::new(),
            edges: EdgeMap::new(),
            next_trait: 0,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> TraitId {
        let id = TraitId::new(self.next_trait);
        self.next_trait += 1;
        id
    }

    /// Registered traits in registration order.
    pub(crate) fn traits(&self) -> &[TraitRef] {
        &self.traits
    }

    pub(crate) fn provides_slot(&self, slot: SlotId) -> bool {
        self.traits
            .iter()
            .any(|t| t.provides().iter().any(|s| s.id() == slot))
    }

    /// Transactional registration: either the candidate edge set is
    /// acyclic and everything commits, or nothing changes.
    pub(crate) fn register(&mut self, trait_ref: TraitRef) -> WeftResult<()> {
        let mut candidate = self.edges.clone();
        let node = GraphNode::Trait(trait_ref.id());

        if let Requirement::Slots(required) = trait_ref.requires() {
            for slot in required {
                add_edge(&mut candidate, node, GraphNode::Slot(slot.id()));
            }
        }
        for slot in trait_ref.provides() {
            add_edge(&mut candidate, GraphNode::Slot(slot.id()), node);
        }

        if has_cycle(&candidate) {
            warn!(trait_id = %trait_ref.id(), "rejecting trait: requirement cycle");
            return Err(WeftError::CircularDependency);
        }

        debug!(
            trait_id = %trait_ref.id(),
            provides = trait_ref.provides().len(),
            "registered trait"
        );
        self.edges = candidate;
        self.traits.push(trait_ref);
        Ok(())
    }
}

fn add_edge(edges: &mut EdgeMap, from: GraphNode, to: GraphNode) {
    edges.entry(from).or_default().push(to);
}

fn has_cycle(edges: &EdgeMap) -> bool {
    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();
    edges
        .keys()
        .any(|&node| !visited.contains(&node) && dfs(edges, node, &mut visited, &mut in_stack))
}

fn dfs(
    edges: &EdgeMap,
    node: GraphNode,
    visited: &mut HashSet<GraphNode>,
    in_stack: &mut HashSet<GraphNode>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = edges.get(&node) {
        for &next in neighbors {
            if !visited.contains(&next) {
                if dfs(edges, next, visited, in_stack) {
                    return true;
                }
            } else if in_stack.contains(&next) {
                return true;
            }
        }
    }

    in_stack.remove(&node);
    false
}

/// Find every trait composition that satisfies `target` for a raw value.
///
/// Runs on a snapshot of the trait list so user predicates are invoked
/// with no interior borrow held; re-entrant container use from inside a
/// predicate is safe.
pub(crate) fn resolve_for(traits: &[TraitRef], value: &Value, target: SlotId) -> Search {
    let matching: Vec<TraitRef> = traits
        .iter()
        .filter(|t| t.matches(value))
        .cloned()
        .collect();

    if matching.is_empty() {
        return Search {
            paths: Vec::new(),
            matched: false,
        };
    }

    let initial_state: BTreeSet<SlotId> = matching
        .iter()
        .flat_map(|t| t.provides().iter().map(|s| s.id()))
        .collect();

    if initial_state.contains(&target) {
        return Search {
            paths: vec![matching],
            matched: true,
        };
    }

    let mut paths = Vec::new();
    let mut visited: HashSet<BTreeSet<SlotId>> = HashSet::new();
    let mut queue: VecDeque<(Path, BTreeSet<SlotId>)> = VecDeque::new();
    queue.push_back((matching, initial_state));

    while let Some((path, state)) = queue.pop_front() {
        if !visited.insert(state.clone()) {
            continue;
        }

        for candidate in traits {
            let Requirement::Slots(required) = candidate.requires() else {
                continue;
            };
            // a trait never appears twice in one path
            if path.contains(candidate) {
                continue;
            }
            if !required.iter().all(|slot| state.contains(&slot.id())) {
                continue;
            }

            let mut extended = path.clone();
            extended.push(candidate.clone());
            let mut next_state = state.clone();
            next_state.extend(candidate.provides().iter().map(|s| s.id()));

            if next_state.contains(&target) {
                paths.push(extended);
            } else {
                queue.push_back((extended, next_state));
            }
        }
    }

    debug!(slot = %target, found = paths.len(), "resolution search finished");
    Search {
        paths,
        matched: true,
    }
}
