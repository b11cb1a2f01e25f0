use std::path::PathBuf;
use std::sync::Once;

use lazy_static::lazy_static;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::connectors::SubgraphInfoMap;
use crate::diagram::{compile, Diagram};
use crate::exhaustiveness::ExhaustivenessGuard;
use crate::plan_nodes::{
    ConditionNode, DeferNode, DeferPrimary, DeferredNode, FetchNode, FlattenNode, ParallelNode,
    PlanNode, QueryPlan, ResponsePathElement, SequenceNode, SubscriptionNode,
};

fn init_test_logger_internal() {
    let tree_layer = tracing_tree::HierarchicalLayer::new(2)
        .with_bracketed_fields(true)
        .with_deferred_spans(false)
        .with_wraparound(25)
        .with_indent_lines(true)
        .with_timer(tracing_tree::time::Uptime::default())
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_targets(false);

    tracing_subscriber::registry()
        .with(tree_layer)
        .with(EnvFilter::from_default_env())
        .init();
}

lazy_static! {
    static ref TRACING_INIT: Once = Once::new();
}

pub fn init_logger() {
    TRACING_INIT.call_once(|| {
        init_test_logger_internal();
    });
}

fn read_fixture(fixture_path: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(fixture_path);
    std::fs::read_to_string(path).expect("Unable to read fixture file")
}

pub fn read_query_plan(fixture_path: &str) -> QueryPlan {
    serde_json::from_str(&read_fixture(fixture_path)).expect("failed to parse query plan fixture")
}

pub fn read_subgraphs(fixture_path: &str) -> SubgraphInfoMap {
    serde_json::from_str(&read_fixture(fixture_path)).expect("failed to parse subgraphs fixture")
}

pub fn compile_dev(node: &PlanNode) -> Diagram {
    compile(node, &ExhaustivenessGuard::development()).expect("failed to compile diagram")
}

pub fn mermaid(node: &PlanNode) -> String {
    compile_dev(node).to_string()
}

pub fn fetch(service_name: &str) -> PlanNode {
    PlanNode::Fetch(FetchNode::new(service_name))
}

pub fn sequence(nodes: Vec<PlanNode>) -> PlanNode {
    PlanNode::Sequence(SequenceNode { nodes })
}

pub fn parallel(nodes: Vec<PlanNode>) -> PlanNode {
    PlanNode::Parallel(ParallelNode { nodes })
}

/// `path` uses the planners' dotted notation, e.g. `topProducts.@.reviews`.
pub fn flatten(path: &str, node: PlanNode) -> PlanNode {
    PlanNode::Flatten(FlattenNode {
        path: path
            .split('.')
            .map(|segment| match segment.parse::<u64>() {
                Ok(index) => ResponsePathElement::Index(index),
                Err(_) => ResponsePathElement::Key(segment.to_string()),
            })
            .collect(),
        node: Box::new(node),
    })
}

pub fn defer(primary: Option<PlanNode>, deferred: Vec<Option<PlanNode>>) -> PlanNode {
    PlanNode::Defer(DeferNode {
        primary: DeferPrimary {
            node: primary.map(Box::new),
        },
        deferred: deferred
            .into_iter()
            .map(|node| DeferredNode {
                label: None,
                node: node.map(Box::new),
            })
            .collect(),
    })
}

pub fn subscription(primary: &str, rest: Option<Vec<PlanNode>>) -> PlanNode {
    PlanNode::Subscription(SubscriptionNode {
        primary: FetchNode::new(primary),
        rest: rest.map(|nodes| SequenceNode { nodes }),
    })
}

pub fn include(condition: &str, node: PlanNode) -> PlanNode {
    PlanNode::Condition(
        ConditionNode::try_new(condition, Some(node), None).expect("invalid include node"),
    )
}

pub fn skip(condition: &str, node: PlanNode) -> PlanNode {
    PlanNode::Condition(
        ConditionNode::try_new(condition, None, Some(node)).expect("invalid skip node"),
    )
}
