//! Arena-backed organization forest.
//!
//! The directory stores organizations as parent pointers. [`OrgForest`]
//! flips them into child index lists once, so subtree lookups are a plain
//! breadth-first walk over `usize` indices.

use std::collections::{HashMap, VecDeque};

use microbadge_core::types::OrgId;

use super::model::Organization;

/// Organizations indexed by position with child adjacency lists.
#[derive(Debug, Clone, Default)]
pub struct OrgForest {
    ids: Vec<OrgId>,
    index: HashMap<OrgId, usize>,
    children: Vec<Vec<usize>>,
}

impl OrgForest {
    /// Build the forest from directory rows.
    ///
    /// Parents that are not part of `orgs` are treated as absent, making the
    /// child a root. Duplicate ids keep the first occurrence.
    pub fn build(orgs: &[Organization]) -> Self {
        let mut forest = Self::default();
        for org in orgs {
            if forest.index.contains_key(&org.id) {
                continue;
            }
            forest.index.insert(org.id.clone(), forest.ids.len());
            forest.ids.push(org.id.clone());
            forest.children.push(Vec::new());
        }
        for org in orgs {
            let Some(parent) = org.parent_id.as_ref() else {
                continue;
            };
            if let (Some(&child_idx), Some(&parent_idx)) =
                (forest.index.get(&org.id), forest.index.get(parent))
            {
                if !forest.children[parent_idx].contains(&child_idx) {
                    forest.children[parent_idx].push(child_idx);
                }
            }
        }
        forest
    }

    /// Number of organizations in the forest.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the forest holds no organizations.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is a known organization.
    pub fn contains(&self, id: &OrgId) -> bool {
        self.index.contains_key(id)
    }

    /// `root` followed by all of its descendants in breadth-first order.
    ///
    /// Unknown roots yield just themselves so their direct members still
    /// resolve. Each node is visited once, so a cyclic parent chain ends
    /// the walk instead of looping.
    pub fn descendants_inclusive(&self, root: &OrgId) -> Vec<OrgId> {
        let Some(&start) = self.index.get(root) else {
            return vec![root.clone()];
        };

        let mut visited = vec![false; self.ids.len()];
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        visited[start] = true;

        while let Some(idx) = queue.pop_front() {
            out.push(self.ids[idx].clone());
            for &child in &self.children[idx] {
                if !visited[child] {
                    visited[child] = true;
                    queue.push_back(child);
                }
            }
        }
        out
    }
}
