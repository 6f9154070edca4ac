//! Dependency priority tree (RFC 7540 Section 5.3), re-architected per the
//! design notes as an arena of nodes addressed by integer handle rather
//! than the original's raw first-child/right-sibling owning pointers.
//! Grounded on `CodecHttp2.cpp`'s `TreeNode<tagStreamWeight>` family.

use std::collections::HashMap;

const ROOT_INDEX: usize = 0;

#[derive(Debug, Clone)]
struct Node {
    stream_id: u32,
    /// Stored as weight - 1 (0..=255), per RFC 7540 5.3.2.
    weight: u8,
    parent: Option<usize>,
    first_child: Option<usize>,
    next_sibling: Option<usize>,
}

#[derive(Debug)]
pub struct PriorityTree {
    nodes: Vec<Node>,
    index: HashMap<u32, usize>,
}

impl Default for PriorityTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityTree {
    pub fn new() -> Self {
        let root = Node {
            stream_id: 0,
            weight: 15,
            parent: None,
            first_child: None,
            next_sibling: None,
        };
        Self {
            nodes: vec![root],
            index: HashMap::new(),
        }
    }

    pub fn contains(&self, stream_id: u32) -> bool {
        self.index.contains_key(&stream_id)
    }

    pub fn weight_of(&self, stream_id: u32) -> Option<u8> {
        self.index.get(&stream_id).map(|&idx| self.nodes[idx].weight)
    }

    fn detach(&mut self, node_idx: usize) {
        let parent_idx = match self.nodes[node_idx].parent {
            Some(p) => p,
            None => return,
        };
        let first_child = self.nodes[parent_idx].first_child;
        if first_child == Some(node_idx) {
            self.nodes[parent_idx].first_child = self.nodes[node_idx].next_sibling;
        } else {
            let mut cursor = first_child;
            while let Some(c) = cursor {
                if self.nodes[c].next_sibling == Some(node_idx) {
                    self.nodes[c].next_sibling = self.nodes[node_idx].next_sibling;
                    break;
                }
                cursor = self.nodes[c].next_sibling;
            }
        }
        self.nodes[node_idx].parent = None;
        self.nodes[node_idx].next_sibling = None;
    }

    fn prepend_child(&mut self, parent_idx: usize, child_idx: usize) {
        let old_first = self.nodes[parent_idx].first_child;
        self.nodes[child_idx].next_sibling = old_first;
        self.nodes[child_idx].parent = Some(parent_idx);
        self.nodes[parent_idx].first_child = Some(child_idx);
    }

    fn get_or_create(&mut self, stream_id: u32) -> usize {
        if let Some(&idx) = self.index.get(&stream_id) {
            return idx;
        }
        self.nodes.push(Node {
            stream_id,
            weight: 15,
            parent: None,
            first_child: None,
            next_sibling: None,
        });
        let idx = self.nodes.len() - 1;
        self.index.insert(stream_id, idx);
        self.prepend_child(ROOT_INDEX, idx);
        idx
    }

    fn dependency_index(&self, dependency: u32) -> usize {
        if dependency == 0 {
            ROOT_INDEX
        } else {
            *self.index.get(&dependency).unwrap_or(&ROOT_INDEX)
        }
    }

    /// Reparent `stream_id` under `dependency`, applying the RFC 7540 5.3.3
    /// exclusive-dependency rewrite: on `exclusive`, `stream_id` absorbs all
    /// of the dependency's former children before becoming its sole child.
    pub fn reparent(&mut self, stream_id: u32, dependency: u32, exclusive: bool, weight_byte: u8) -> Result<(), ()> {
        if stream_id == dependency {
            return Err(());
        }
        let node_idx = self.get_or_create(stream_id);
        let dep_idx = self.dependency_index(dependency);

        // A node may not become its own descendant's dependency; detach
        // first so subsequent child lookups reflect the post-removal tree.
        self.detach(node_idx);
        self.nodes[node_idx].weight = weight_byte;

        if exclusive {
            let former_children = self.nodes[dep_idx].first_child;
            self.nodes[dep_idx].first_child = None;
            self.prepend_child(dep_idx, node_idx);
            let mut cursor = former_children;
            // Splice the former children in as node_idx's children, skipping
            // node_idx itself if it was already one of them.
            let mut new_first: Option<usize> = None;
            let mut tail: Option<usize> = None;
            while let Some(c) = cursor {
                let next = self.nodes[c].next_sibling;
                if c != node_idx {
                    self.nodes[c].parent = Some(node_idx);
                    self.nodes[c].next_sibling = None;
                    match tail {
                        Some(t) => {
                            self.nodes[t].next_sibling = Some(c);
                            tail = Some(c);
                        }
                        None => {
                            new_first = Some(c);
                            tail = Some(c);
                        }
                    }
                }
                cursor = next;
            }
            self.nodes[node_idx].first_child = new_first;
        } else {
            self.prepend_child(dep_idx, node_idx);
        }

        Ok(())
    }

    /// Remove a stream, reparenting its children onto its parent (RFC 7540
    /// 5.3.4), and drop it from the index.
    pub fn remove(&mut self, stream_id: u32) {
        let node_idx = match self.index.remove(&stream_id) {
            Some(idx) => idx,
            None => return,
        };
        let parent_idx = self.nodes[node_idx].parent.unwrap_or(ROOT_INDEX);
        self.detach(node_idx);

        let mut cursor = self.nodes[node_idx].first_child;
        let old_first_child_of_parent = self.nodes[parent_idx].first_child;
        if cursor.is_none() {
            // nothing to splice
        } else {
            let mut tail = cursor;
            while let Some(t) = tail {
                self.nodes[t].parent = Some(parent_idx);
                match self.nodes[t].next_sibling {
                    Some(next) => tail = Some(next),
                    None => break,
                }
            }
            // tail now points at the last reparented child; chain it to the
            // parent's former first child, then make our children the new
            // front of the parent's child list.
            if let Some(t) = tail {
                self.nodes[t].next_sibling = old_first_child_of_parent;
            }
            self.nodes[parent_idx].first_child = cursor;
            cursor = None;
        }
        let _ = cursor;
    }

    /// Priority-ordered traversal of stream ids for which `eligible`
    /// returns true: a weighted depth-first walk rooted at the tree root,
    /// visiting heavier-weighted siblings first. Unlike the source this
    /// replaces, the traversal cursor always advances.
    pub fn eligible_order(&self, mut eligible: impl FnMut(u32) -> bool) -> Vec<u32> {
        let mut out = Vec::new();
        self.visit(ROOT_INDEX, &mut eligible, &mut out);
        out
    }

    fn visit(&self, node_idx: usize, eligible: &mut impl FnMut(u32) -> bool, out: &mut Vec<u32>) {
        let mut siblings = Vec::new();
        let mut cursor = self.nodes[node_idx].first_child;
        while let Some(c) = cursor {
            siblings.push(c);
            cursor = self.nodes[c].next_sibling;
        }
        siblings.sort_by(|&a, &b| self.nodes[b].weight.cmp(&self.nodes[a].weight));
        for child in siblings {
            let stream_id = self.nodes[child].stream_id;
            if eligible(stream_id) {
                out.push(stream_id);
            }
            self.visit(child, eligible, out);
        }
    }
}
