//! 5-Why editor — a problem statement with a branching tree of "why" answers.
//!
//! DESIGN
//! ======
//! Nodes are stored flat with a `parent_id` link; top-level whys have no
//! parent and answer the problem statement directly. Removing a node removes
//! its whole subtree so no orphan can remain. Depth is capped at
//! `MAX_WHY_DEPTH` levels below the problem.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EditorError, require_text};

pub const MAX_WHY_DEPTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhyNode {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub text: String,
    #[serde(default)]
    pub root_cause: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiveWhyTree {
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub nodes: Vec<WhyNode>,
}

impl FiveWhyTree {
    #[must_use]
    pub fn new(problem: impl Into<String>) -> Self {
        Self { problem: problem.into(), nodes: Vec::new() }
    }

    pub fn set_problem(&mut self, text: &str) -> Result<(), EditorError> {
        self.problem = require_text(text, "problem")?;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&WhyNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut WhyNode, EditorError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(EditorError::NotFound(id))
    }

    /// Answer `parent` (or the problem itself when `None`) with another why.
    ///
    /// # Errors
    ///
    /// `Blank` for empty text, `NotFound` for an unknown parent, and
    /// `DepthExceeded` when the chain would pass `MAX_WHY_DEPTH`.
    pub fn add_why(&mut self, parent_id: Option<Uuid>, text: &str) -> Result<&WhyNode, EditorError> {
        let text = require_text(text, "why")?;
        if let Some(parent) = parent_id {
            let parent_depth = self.depth(parent).ok_or(EditorError::NotFound(parent))?;
            if parent_depth >= MAX_WHY_DEPTH {
                return Err(EditorError::DepthExceeded { max: MAX_WHY_DEPTH });
            }
        }

        self.nodes.push(WhyNode { id: Uuid::new_v4(), parent_id, text, root_cause: false });
        Ok(&self.nodes[self.nodes.len() - 1])
    }

    pub fn update_why(&mut self, id: Uuid, text: &str) -> Result<(), EditorError> {
        let text = require_text(text, "why")?;
        self.get_mut(id)?.text = text;
        Ok(())
    }

    pub fn set_root_cause(&mut self, id: Uuid, root_cause: bool) -> Result<(), EditorError> {
        self.get_mut(id)?.root_cause = root_cause;
        Ok(())
    }

    /// Remove a node and every descendant. Returns how many nodes went away.
    pub fn remove_why(&mut self, id: Uuid) -> Result<usize, EditorError> {
        if self.get(id).is_none() {
            return Err(EditorError::NotFound(id));
        }

        let mut doomed = HashSet::from([id]);
        // Nodes may appear before their parents after edits, so sweep until stable.
        loop {
            let before = doomed.len();
            for node in &self.nodes {
                if node.parent_id.is_some_and(|p| doomed.contains(&p)) {
                    doomed.insert(node.id);
                }
            }
            if doomed.len() == before {
                break;
            }
        }

        self.nodes.retain(|n| !doomed.contains(&n.id));
        Ok(doomed.len())
    }

    /// Direct answers to `parent`, in insertion order.
    #[must_use]
    pub fn children(&self, parent_id: Option<Uuid>) -> Vec<&WhyNode> {
        self.nodes.iter().filter(|n| n.parent_id == parent_id).collect()
    }

    /// 1 for a top-level why, 2 for its answer, and so on.
    #[must_use]
    pub fn depth(&self, id: Uuid) -> Option<usize> {
        let mut node = self.get(id)?;
        let mut depth = 1;
        while let Some(parent) = node.parent_id {
            node = self.get(parent)?;
            depth += 1;
        }
        Some(depth)
    }

    /// Every path from a top-level why down to a leaf.
    #[must_use]
    pub fn chains(&self) -> Vec<Vec<&WhyNode>> {
        let mut out = Vec::new();
        for root in self.children(None) {
            let mut path = vec![root];
            self.collect_chains(&mut path, &mut out);
        }
        out
    }

    fn collect_chains<'a>(&'a self, path: &mut Vec<&'a WhyNode>, out: &mut Vec<Vec<&'a WhyNode>>) {
        let Some(last) = path.last() else {
            return;
        };
        let kids = self.children(Some(last.id));
        if kids.is_empty() {
            out.push(path.clone());
            return;
        }
        for kid in kids {
            path.push(kid);
            self.collect_chains(path, out);
            path.pop();
        }
    }

    #[must_use]
    pub fn root_causes(&self) -> Vec<&WhyNode> {
        self.nodes.iter().filter(|n| n.root_cause).collect()
    }
}

// =============================================================================
// ANALYSIS
// =============================================================================

/// Derived view of a 5-Why tree for the A3 summary panel.
#[derive(Debug, Clone, Serialize)]
pub struct FiveWhyAnalysis {
    pub problem: String,
    pub node_count: usize,
    pub max_depth: usize,
    pub chains: Vec<Vec<String>>,
    pub root_causes: Vec<String>,
}

impl FiveWhyTree {
    #[must_use]
    pub fn analyze(&self) -> FiveWhyAnalysis {
        let chains = self.chains();
        FiveWhyAnalysis {
            problem: self.problem.clone(),
            node_count: self.nodes.len(),
            max_depth: chains.iter().map(Vec::len).max().unwrap_or(0),
            chains: chains
                .into_iter()
                .map(|chain| chain.into_iter().map(|n| n.text.clone()).collect())
                .collect(),
            root_causes: self.root_causes().into_iter().map(|n| n.text.clone()).collect(),
        }
    }
}

#[cfg(test)]
#[path = "five_why_test.rs"]
mod tests;
