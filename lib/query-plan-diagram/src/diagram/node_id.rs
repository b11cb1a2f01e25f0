use std::fmt::{Display, Formatter as FmtFormatter, Result as FmtResult};

/// Identifier of a node in the emitted diagram. Rendered as `n<index>`, which
/// is a valid bare node id in Mermaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        write!(f, "n{}", self.0)
    }
}

/// Hands out node ids for a single compilation. Ids are unique per generator,
/// so every compilation owns its own instance.
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    next: usize,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}
