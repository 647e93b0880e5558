//! Call tree of one external transaction and closed-cycle detection
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. A failed child is
//! only detached from its parent; it stays in the arena but is never reached
//! by a traversal from the root.

use alloy::primitives::{Address, U256};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One contract invocation with the value it received and sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub address: Address,
    pub inbound: U256,
    pub outbound: U256,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Parent first, root last
    ancestors: Vec<NodeId>,
}

impl Node {
    pub fn new(address: Address, inbound: U256) -> Self {
        Self {
            address,
            inbound,
            outbound: U256::ZERO,
            parent: None,
            children: Vec::new(),
            ancestors: Vec::new(),
        }
    }

    pub fn with_outbound(mut self, outbound: U256) -> Self {
        self.outbound = outbound;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn ancestors(&self) -> &[NodeId] {
        &self.ancestors
    }

    /// Outbound minus inbound, zero when the node gained value
    pub fn net_outflow(&self) -> U256 {
        self.outbound.saturating_sub(self.inbound)
    }
}

/// Participant that lost the most value in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Victim {
    pub address: Address,
    pub net_outflow: U256,
}

/// A confirmed repeated call cycle
///
/// Every confirmed occurrence of the same loop, rotations included, is
/// merged into one cycle. The victim is chosen over the distinct frames of
/// all those occurrences, so value that left a frame is counted once even
/// when the frame takes part in several occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// Participants from the re-entered contract down to the caller that
    /// closed the loop
    pub path: Vec<Address>,
    pub victim: Victim,
    /// Confirmed occurrences merged into this cycle
    pub occurrences: usize,
}

impl Cycle {
    /// `0xa--0xb--...`
    pub fn chain(&self) -> String {
        self.path
            .iter()
            .map(|a| format!("{a:#x}"))
            .collect::<Vec<_>>()
            .join("--")
    }

    /// Same loop entered at a different participant
    pub fn is_rotation_of(&self, other: &Cycle) -> bool {
        is_rotation(&self.path, &other.path)
    }
}

fn is_rotation(a: &[Address], b: &[Address]) -> bool {
    let n = a.len();
    n == b.len() && (0..n).any(|shift| (0..n).all(|i| a[i] == b[(i + shift) % n]))
}

/// Value-carrying call tree of one external transaction
///
/// [`CallTree::enter`] opens a child of the current node and adds the value
/// it carries to the caller's outbound total; [`CallTree::exit`] returns to
/// the caller and detaches the child when it failed.
///
/// # Example
/// ```
/// use alloy::primitives::{address, U256};
/// use revm_soda::analyzers::reentrancy::CallTree;
///
/// let attacker = address!("00000000000000000000000000000000000000aa");
/// let vault = address!("00000000000000000000000000000000000000bb");
///
/// let mut tree = CallTree::new();
/// tree.start(attacker, U256::ZERO);
/// tree.enter(vault, U256::ZERO);
/// tree.enter(attacker, U256::from(10));
/// tree.enter(vault, U256::ZERO);
/// tree.enter(attacker, U256::from(10));
///
/// let cycles = tree.detect_cycles();
/// assert_eq!(cycles.len(), 1);
/// assert_eq!(cycles[0].victim.address, vault);
/// ```
///
/// # Returns
/// [`CallTree::detect_cycles`] returns one [`Cycle`] per distinct loop; an
/// empty vector when no loop repeats while moving value.
#[derive(Debug, Clone, Default)]
pub struct CallTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    current: Option<NodeId>,
}

impl CallTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the previous tree and start a new one at `address`
    pub fn start(&mut self, address: Address, value: U256) -> NodeId {
        self.clear();
        let id = self.push(Node::new(address, value));
        self.root = Some(id);
        self.current = Some(id);
        id
    }

    /// Open a child of the current node; `None` before `start`
    pub fn enter(&mut self, address: Address, value: U256) -> Option<NodeId> {
        let parent = self.current?;
        let mut node = Node::new(address, value);
        node.parent = Some(parent);
        node.ancestors = std::iter::once(parent)
            .chain(self.nodes[parent.0].ancestors.iter().copied())
            .collect();

        let id = self.push(node);
        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.push(id);
        parent_node.outbound = parent_node.outbound.saturating_add(value);
        self.current = Some(id);
        Some(id)
    }

    /// Return to the parent of the current node, detaching the current node
    /// unless `keep`
    pub fn exit(&mut self, keep: bool) -> Option<NodeId> {
        let current = self.current?;
        let parent = self.nodes[current.0].parent?;
        if !keep {
            let siblings = &mut self.nodes[parent.0].children;
            if let Some(pos) = siblings.iter().rposition(|c| *c == current) {
                siblings.remove(pos);
            }
        }
        self.current = Some(parent);
        Some(parent)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Nodes reachable from the root
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().copied());
        }
        out
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.current = None;
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Find every call cycle that is passed through at least twice
    ///
    /// A node calling back into one of its ancestors closes a loop. It is
    /// only confirmed when the loop repeats below the re-entered child, and
    /// only when value leaves the child or one of its direct callees.
    /// Confirmed loops that are rotations of an earlier one are merged into it.
    pub fn detect_cycles(&self) -> Vec<Cycle> {
        // (path, member frames of every occurrence, occurrences)
        let mut found: Vec<(Vec<Address>, Vec<NodeId>, usize)> = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if !node.ancestors.is_empty() {
                for &child_id in &node.children {
                    let child = &self.nodes[child_id.0];
                    if child.address == node.address
                        || (child.outbound.is_zero() && !self.children_send_value(child_id))
                    {
                        continue;
                    }

                    for &ancestor in &node.ancestors {
                        if self.nodes[ancestor.0].address != child.address {
                            continue;
                        }
                        let members = self.cycle_members(child_id, id, ancestor);
                        let second_last = self.nodes[members[members.len() - 2].0].address;
                        if self.path_repeats(&members, child_id)
                            || self.calls_again(second_last, child_id)
                        {
                            let path: Vec<Address> = members[1..]
                                .iter()
                                .rev()
                                .map(|m| self.nodes[m.0].address)
                                .collect();
                            let merged = found.iter().position(|(p, _, _)| is_rotation(p, &path));
                            match merged {
                                Some(index) => {
                                    let (_, frames, occurrences) = &mut found[index];
                                    *occurrences += 1;
                                    for member in members {
                                        if !frames.contains(&member) {
                                            frames.push(member);
                                        }
                                    }
                                }
                                None => found.push((path, members, 1)),
                            }
                            break;
                        }
                    }
                }
            }
            stack.extend(node.children.iter().copied());
        }

        found
            .into_iter()
            .map(|(path, frames, occurrences)| Cycle {
                path,
                victim: select_victim(frames.iter().map(|m| &self.nodes[m.0])),
                occurrences,
            })
            .collect()
    }

    /// `[child, node, node.parent, ..., ancestor]`
    fn cycle_members(&self, child: NodeId, node: NodeId, ancestor: NodeId) -> Vec<NodeId> {
        let mut members = vec![child];
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                break;
            }
            members.push(id);
            cursor = self.nodes[id.0].parent;
        }
        members.push(ancestor);
        members
    }

    fn children_send_value(&self, id: NodeId) -> bool {
        self.nodes[id.0]
            .children
            .iter()
            .any(|c| !self.nodes[c.0].outbound.is_zero())
    }

    fn calls_again(&self, address: Address, id: NodeId) -> bool {
        self.nodes[id.0]
            .children
            .iter()
            .any(|c| self.nodes[c.0].address == address)
    }

    /// Whether the address sequence of `members`, read from the ancestor
    /// down, occurs again somewhere in the subtree of `start` and its last
    /// hop moves value
    fn path_repeats(&self, members: &[NodeId], start: NodeId) -> bool {
        let last = members.len() - 1;
        let mut subtree = vec![start];
        while let Some(id) = subtree.pop() {
            let mut attempts = vec![(id, last)];
            while let Some((candidate, index)) = attempts.pop() {
                let node = &self.nodes[candidate.0];
                if node.address != self.nodes[members[index].0].address {
                    continue;
                }
                if index == 0 {
                    if !node.outbound.is_zero() || self.children_send_value(candidate) {
                        return true;
                    }
                    continue;
                }
                attempts.extend(node.children.iter().map(|c| (*c, index - 1)));
            }
            subtree.extend(self.nodes[id.0].children.iter().copied());
        }
        false
    }
}

/// Pick the participant with the largest net outflow
///
/// Net outflow is accumulated per address over the nodes that sent more
/// than they received. With no such node the first participant is chosen.
/// Ties keep the participant seen first.
pub fn select_victim<'a>(participants: impl IntoIterator<Item = &'a Node>) -> Victim {
    let mut totals: Vec<(Address, U256)> = Vec::new();
    let mut first: Option<&Node> = None;

    for node in participants {
        first.get_or_insert(node);
        if node.outbound > node.inbound {
            let net = node.net_outflow();
            match totals.iter_mut().find(|(a, _)| *a == node.address) {
                Some((_, total)) => *total = total.saturating_add(net),
                None => totals.push((node.address, net)),
            }
        }
    }

    let best = totals
        .into_iter()
        .fold(None::<(Address, U256)>, |best, (address, net)| match best {
            Some((_, top)) if top >= net => best,
            _ => Some((address, net)),
        });

    match (best, first) {
        (Some((address, net_outflow)), _) => Victim {
            address,
            net_outflow,
        },
        (None, Some(node)) => Victim {
            address: node.address,
            net_outflow: node.net_outflow(),
        },
        (None, None) => Victim {
            address: Address::ZERO,
            net_outflow: U256::ZERO,
        },
    }
}
