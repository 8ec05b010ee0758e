use bitflags::Flags;
use log::trace;
use serde::Serialize;

use crate::diagnostics::{AnomalyKind, Diagnostics};

/// A style attribute set that can be layered over a resolved parent.
pub trait Inherit: Clone + Default {
    /// `self` layered over an already resolved `parent`: values set here win, everything else
    /// comes from `parent`.
    fn inherit_from(&self, parent: &Self) -> Self;
}

/// Additive and subtractive flag masks.
///
/// A child can add flags with `set` and rescind inherited ones with `clear`; every other inherited
/// flag is kept. Once composed, `set` holds the effective flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FlagPatch<F> {
    pub set: F,
    pub clear: F,
}

impl<F: Flags + Copy> FlagPatch<F> {
    pub fn new(set: F, clear: F) -> Self {
        FlagPatch { set, clear }
    }

    pub fn over(&self, parent: &Self) -> Self {
        FlagPatch {
            set: parent.set.difference(self.clear).union(self.set),
            clear: parent.clear.union(self.clear).difference(self.set),
        }
    }

    pub fn effective(&self) -> F {
        self.set
    }
}

/// One style with up to two parents, both 1-based style ids (0 = none).
///
/// Values from the primary parent win over the linked parent's; both are resolved before the
/// style itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleNode<T> {
    pub raw: T,
    pub parents: [u32; 2],
}

impl<T> StyleNode<T> {
    pub fn new(raw: T) -> Self {
        StyleNode {
            raw,
            parents: [0, 0],
        }
    }

    pub fn with_parent(mut self, parent: u32) -> Self {
        self.parents[0] = parent;
        self
    }

    pub fn with_linked_parent(mut self, parent: u32) -> Self {
        self.parents[1] = parent;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CutReason {
    OutOfRange,
    SelfParent,
    Cycle,
}

/// A parent edge dropped during resolution. Ids are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CutEdge {
    pub child: u32,
    pub parent: u32,
    pub reason: CutReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cascade<T> {
    /// Resolved styles, parallel to the input nodes.
    pub resolved: Vec<T>,
    /// 1-based ids in the order they were resolved.
    pub visit_order: Vec<u32>,
    pub cut_edges: Vec<CutEdge>,
}

impl<T> Cascade<T> {
    /// The resolved style with 1-based id `id`.
    pub fn get(&self, id: u32) -> Option<&T> {
        (id as usize).checked_sub(1).and_then(|i| self.resolved.get(i))
    }
}

/// Index of the 0-based node `index`'s parent named by `id`, if it is a usable one.
fn parent_index(id: u32, index: usize, count: usize) -> Result<Option<usize>, CutReason> {
    match id as usize {
        0 => Ok(None),
        p if p > count => Err(CutReason::OutOfRange),
        p if p - 1 == index => Err(CutReason::SelfParent),
        p => Ok(Some(p - 1)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

fn cut_edge(
    cut_edges: &mut Vec<CutEdge>,
    diag: &mut Diagnostics,
    child: u32,
    parent: u32,
    reason: CutReason,
) {
    let kind = match reason {
        CutReason::OutOfRange => AnomalyKind::StructuralMismatch,
        CutReason::SelfParent | CutReason::Cycle => AnomalyKind::Cycle,
    };
    diag.anomaly(
        kind,
        0,
        "style",
        format_args!("style {child}: dropping parent {parent} ({reason:?})"),
    );
    cut_edges.push(CutEdge {
        child,
        parent,
        reason,
    });
}

/// Resolves every node against its parent chain.
///
/// Both parents of a node are resolved before the node itself, using an explicit depth-first
/// stack. A parent edge that leads back to a node still on the stack closes a cycle and is cut,
/// whichever of the two parent slots it sits in. Every node is resolved exactly once, and the
/// result does not depend on how the styles are numbered.
pub fn resolve_cascade<T: Inherit>(nodes: &[StyleNode<T>], diag: &mut Diagnostics) -> Cascade<T> {
    let count = nodes.len();
    let mut cut_edges = Vec::new();

    // `[primary, linked]`, 0-based.
    let mut parents: Vec<[Option<usize>; 2]> = Vec::with_capacity(count);
    for (index, node) in nodes.iter().enumerate() {
        let child = index as u32 + 1;
        let mut slots = [None, None];
        for (slot, &id) in node.parents.iter().enumerate() {
            match parent_index(id, index, count) {
                Ok(p) => slots[slot] = p,
                Err(reason) => cut_edge(&mut cut_edges, diag, child, id, reason),
            }
        }
        parents.push(slots);
    }

    let mut resolved: Vec<Option<T>> = vec![None; count];
    let mut marks = vec![Mark::Unvisited; count];
    let mut visit_order = Vec::with_capacity(count);
    // Node and the next parent slot to look at.
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..count {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::InProgress;
        stack.push((start, 0));

        while let Some(top) = stack.last_mut() {
            let (index, slot) = *top;
            if slot < 2 {
                top.1 += 1;
                let Some(parent) = parents[index][slot] else {
                    continue;
                };
                match marks[parent] {
                    Mark::Done => {}
                    Mark::Unvisited => {
                        marks[parent] = Mark::InProgress;
                        stack.push((parent, 0));
                    }
                    Mark::InProgress => {
                        parents[index][slot] = None;
                        cut_edge(
                            &mut cut_edges,
                            diag,
                            index as u32 + 1,
                            parent as u32 + 1,
                            CutReason::Cycle,
                        );
                    }
                }
                continue;
            }

            stack.pop();
            let [primary, linked] = parents[index];
            let parent = primary.and_then(|p| resolved[p].as_ref());
            let linked_parent = linked.and_then(|q| resolved[q].as_ref());
            let base = match (parent, linked_parent) {
                (Some(p), Some(q)) => Some(p.inherit_from(q)),
                (Some(p), None) => Some(p.clone()),
                (None, Some(q)) => Some(q.clone()),
                (None, None) => None,
            };

            let raw = &nodes[index].raw;
            resolved[index] = Some(match base {
                Some(base) => raw.inherit_from(&base),
                None => raw.clone(),
            });
            marks[index] = Mark::Done;
            visit_order.push(index as u32 + 1);
            trace!("style {}: resolved", index + 1);
        }
    }

    Cascade {
        resolved: resolved.into_iter().map(Option::unwrap_or_default).collect(),
        visit_order,
        cut_edges,
    }
}
