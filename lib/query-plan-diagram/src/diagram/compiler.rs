use tracing::{debug, instrument};

use crate::{
    diagram::{node_id::NodeId, Diagram},
    exhaustiveness::{ExhaustivenessGuard, UnhandledVariantError},
    plan_nodes::{
        ConditionClause, ConditionNode, DeferNode, FetchNode, FlattenNode, PlanNode, QueryPlan,
        SubscriptionNode,
    },
};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DiagramError {
    #[error(transparent)]
    UnhandledVariant(#[from] UnhandledVariantError),
}

/// Wiring of a compiled subtree: where a predecessor connects to, and where
/// a successor connects from.
///
/// A fragment without an entry is an empty sequence. A childless parallel
/// has an entry but no exits.
#[derive(Debug, Default)]
struct Fragment {
    entry: Option<NodeId>,
    exits: Vec<NodeId>,
}

impl Fragment {
    fn single(id: NodeId) -> Self {
        Fragment {
            entry: Some(id),
            exits: vec![id],
        }
    }
}

struct DiagramCompiler<'a> {
    guard: &'a ExhaustivenessGuard,
    diagram: Diagram,
}

impl DiagramCompiler<'_> {
    fn compile_node(&mut self, node: &PlanNode) -> Result<Fragment, DiagramError> {
        match node {
            PlanNode::Fetch(node) => Ok(self.compile_fetch(node)),
            PlanNode::Sequence(node) => self.compile_sequence(&node.nodes),
            PlanNode::Parallel(node) => self.compile_parallel(&node.nodes),
            PlanNode::Flatten(node) => self.compile_flatten(node),
            PlanNode::Defer(node) => self.compile_defer(node),
            PlanNode::Subscription(node) => self.compile_subscription(node),
            PlanNode::Condition(node) => self.compile_condition(node),
            PlanNode::Unrecognized(node) => {
                let fallback = Fragment::single(self.diagram.add_node("Unknown"));
                Ok(self.guard.on_unhandled(node, fallback)?)
            }
        }
    }

    fn link(&mut self, from: NodeId, to: &Fragment) {
        if let Some(entry) = to.entry {
            self.diagram.add_edge(from, entry);
        }
    }

    fn compile_fetch(&mut self, node: &FetchNode) -> Fragment {
        let id = self
            .diagram
            .add_node(&format!("Fetch ({})", node.subgraph_name()));
        Fragment::single(id)
    }

    fn compile_sequence(&mut self, nodes: &[PlanNode]) -> Result<Fragment, DiagramError> {
        let mut sequence = Fragment::default();

        for node in nodes {
            let fragment = self.compile_node(node)?;
            // empty children keep the previous exits as the chaining point
            let Some(entry) = fragment.entry else {
                continue;
            };

            if sequence.entry.is_none() {
                sequence.entry = Some(entry);
            }
            for exit in &sequence.exits {
                self.diagram.add_edge(*exit, entry);
            }
            sequence.exits = fragment.exits;
        }

        Ok(sequence)
    }

    fn compile_parallel(&mut self, nodes: &[PlanNode]) -> Result<Fragment, DiagramError> {
        let fork = self.diagram.add_node("Parallel");
        let mut exits = Vec::new();

        for node in nodes {
            let fragment = self.compile_node(node)?;
            self.link(fork, &fragment);
            merge_exits(&mut exits, fragment.exits);
        }

        // a fork without children has nothing to join, successors stay unlinked
        Ok(Fragment {
            entry: Some(fork),
            exits,
        })
    }

    fn compile_flatten(&mut self, node: &FlattenNode) -> Result<Fragment, DiagramError> {
        let path = node
            .path
            .iter()
            .map(|segment| segment.to_string())
            .collect::<Vec<String>>()
            .join(",")
            .replace('@', "[]");
        let flatten = self.diagram.add_node(&format!("Flatten ({path})"));
        let child = self.compile_node(&node.node)?;

        for exit in &child.exits {
            self.diagram.add_edge(*exit, flatten);
        }

        Ok(Fragment {
            entry: child.entry.or(Some(flatten)),
            exits: vec![flatten],
        })
    }

    fn compile_defer(&mut self, node: &DeferNode) -> Result<Fragment, DiagramError> {
        let defer = self.diagram.add_node("Defer");
        let primary = self.diagram.add_node("Primary");
        self.diagram.add_edge(defer, primary);

        if let Some(primary_node) = &node.primary.node {
            let fragment = self.compile_node(primary_node)?;
            self.link(primary, &fragment);
        }

        for deferred_node in &node.deferred {
            let deferred = self.diagram.add_node("Deferred");
            self.diagram.add_edge(defer, deferred);

            if let Some(inner) = &deferred_node.node {
                let fragment = self.compile_node(inner)?;
                self.link(deferred, &fragment);
            }
        }

        // deferred branches resolve on their own, the defer node is the only exit
        Ok(Fragment::single(defer))
    }

    fn compile_subscription(&mut self, node: &SubscriptionNode) -> Result<Fragment, DiagramError> {
        let primary = self
            .diagram
            .add_node(&format!("Fetch ({})", node.primary.subgraph_name()));
        let mut exits = Vec::new();

        // every rest node reacts to subscription events on its own
        for rest_node in node.rest_nodes() {
            let fragment = self.compile_node(rest_node)?;
            self.link(primary, &fragment);
            merge_exits(&mut exits, fragment.exits);
        }

        if exits.is_empty() {
            exits.push(primary);
        }

        Ok(Fragment {
            entry: Some(primary),
            exits,
        })
    }

    fn compile_condition(&mut self, node: &ConditionNode) -> Result<Fragment, DiagramError> {
        let label = match node.clause {
            ConditionClause::Skip(_) => "Condition(Skip)",
            ConditionClause::Include(_) => "Condition(Include)",
        };
        let condition = self.diagram.add_node(label);
        let branch = self.compile_node(node.branch())?;
        self.link(condition, &branch);

        Ok(Fragment::single(condition))
    }
}

fn merge_exits(exits: &mut Vec<NodeId>, new_exits: Vec<NodeId>) {
    for exit in new_exits {
        if !exits.contains(&exit) {
            exits.push(exit);
        }
    }
}

/// Compiles a plan tree into a top-down flowchart.
///
/// Node ids are allocated per call, so two compilations of the same tree
/// produce the same text.
#[instrument(level = "debug", skip_all, fields(root_kind = root.kind()))]
pub fn compile(root: &PlanNode, guard: &ExhaustivenessGuard) -> Result<Diagram, DiagramError> {
    let mut compiler = DiagramCompiler {
        guard,
        diagram: Diagram::new(),
    };
    compiler.compile_node(root)?;

    debug!(
        nodes = compiler.diagram.nodes().len(),
        edges = compiler.diagram.edges().len(),
        "query plan compiled into a diagram"
    );

    Ok(compiler.diagram)
}

/// Mermaid text for a whole query plan. A plan without a root node yields
/// an empty graph.
pub fn query_plan_to_mermaid(
    plan: &QueryPlan,
    guard: &ExhaustivenessGuard,
) -> Result<String, DiagramError> {
    let diagram = match &plan.node {
        Some(root) => compile(root, guard)?,
        None => Diagram::new(),
    };

    Ok(diagram.to_string())
}
