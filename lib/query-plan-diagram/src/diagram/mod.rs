mod compiler;
pub mod node_id;

use std::fmt::{Display, Formatter as FmtFormatter, Result as FmtResult};

pub use compiler::{compile, query_plan_to_mermaid, DiagramError};
use node_id::{NodeId, NodeIdGenerator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramNode {
    pub id: NodeId,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagramEdge {
    pub from: NodeId,
    pub to: NodeId,
}

/// A top-down flowchart, built as plain node and edge records and only
/// turned into Mermaid text when displayed.
#[derive(Debug, Default)]
pub struct Diagram {
    ids: NodeIdGenerator,
    nodes: Vec<DiagramNode>,
    edges: Vec<DiagramEdge>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, label: &str) -> NodeId {
        let id = self.ids.next_id();
        self.nodes.push(DiagramNode {
            id,
            label: sanitize_label(label),
        });
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.push(DiagramEdge { from, to });
    }

    pub fn nodes(&self) -> &[DiagramNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DiagramEdge] {
        &self.edges
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        // ids are allocated and pushed together, so the index is the position
        self.nodes.get(id.index()).map(|node| node.label.as_str())
    }

    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |edge| edge.from == id)
            .map(|edge| edge.to)
    }

    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |edge| edge.to == id)
            .map(|edge| edge.from)
    }

    pub fn nodes_labeled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes
            .iter()
            .filter(move |node| node.label == label)
            .map(|node| node.id)
    }
}

impl Display for Diagram {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        writeln!(f, "graph TD")?;
        for node in &self.nodes {
            writeln!(f, "  {}(\"{}\")", node.id, node.label)?;
        }
        for edge in &self.edges {
            writeln!(f, "  {} --> {}", edge.from, edge.to)?;
        }
        Ok(())
    }
}

/// Makes a label safe to place between the quotes of a Mermaid node
/// declaration. Quotes and angle brackets become Mermaid entity codes and
/// line breaks become spaces.
pub fn sanitize_label(label: &str) -> String {
    let mut sanitized = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '"' => sanitized.push_str("#quot;"),
            '<' => sanitized.push_str("#lt;"),
            '>' => sanitized.push_str("#gt;"),
            c if c.is_control() => sanitized.push(' '),
            c => sanitized.push(c),
        }
    }
    sanitized
}
