//! Pattern model collected while a `MATCH` clause is walked and lowered once it exits.

use crate::cypher::Direction;
use crate::pgsql::Identifier;

/// Hop bounds of a variable-length relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub identifier: Identifier,
    pub min_depth: i64,
    pub max_depth: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraversalStep {
    pub left_node: Identifier,
    pub edge: Identifier,
    pub right_node: Identifier,
    pub direction: Direction,
    pub expansion: Option<Expansion>,
}

#[derive(Debug, Clone, PartialEq)]
struct OpenEdge {
    edge: Identifier,
    direction: Direction,
    expansion: Option<Expansion>,
}

/// One comma-separated element of a pattern: either a lone node or a chain of hops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternPart {
    pub path_binding: Option<Identifier>,
    pub node_select: Option<Identifier>,
    pub traversal_steps: Vec<TraversalStep>,
    last_node: Option<Identifier>,
    open_edge: Option<OpenEdge>,
}

impl PatternPart {
    pub fn new(path_binding: Option<Identifier>) -> Self {
        PatternPart {
            path_binding,
            ..Default::default()
        }
    }

    pub fn add_node(&mut self, node: Identifier) {
        if let (Some(left_node), Some(open)) = (self.last_node.take(), self.open_edge.take()) {
            self.traversal_steps.push(TraversalStep {
                left_node,
                edge: open.edge,
                right_node: node.clone(),
                direction: open.direction,
                expansion: open.expansion,
            });
        }

        self.last_node = Some(node);
    }

    pub fn add_edge(&mut self, edge: Identifier, direction: Direction, expansion: Option<Expansion>) {
        self.open_edge = Some(OpenEdge {
            edge,
            direction,
            expansion,
        });
    }

    /// The node the next relationship in this part will start from.
    pub fn last_node(&self) -> Option<&Identifier> {
        self.last_node.as_ref()
    }

    /// Whether the relationship waiting for its right node is variable-length.
    pub fn expanding(&self) -> bool {
        self.open_edge
            .as_ref()
            .is_some_and(|open| open.expansion.is_some())
    }

    /// Closes the part. A part without hops selects its single node.
    pub fn finish(&mut self) {
        if self.traversal_steps.is_empty() {
            self.node_select = self.last_node.clone();
        }
    }

    /// Node and edge identifiers in pattern order, as a path binding depends on them.
    pub fn elements(&self) -> Vec<Identifier> {
        if let Some(node) = &self.node_select {
            return vec![node.clone()];
        }

        let mut elements = Vec::with_capacity(self.traversal_steps.len() * 2 + 1);
        for (index, step) in self.traversal_steps.iter().enumerate() {
            if index == 0 {
                elements.push(step.left_node.clone());
            }
            elements.push(step.edge.clone());
            elements.push(step.right_node.clone());
        }
        elements
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pattern {
    pub parts: Vec<PatternPart>,
}

impl Pattern {
    pub fn current_part(&mut self) -> Option<&mut PatternPart> {
        self.parts.last_mut()
    }
}
