use std::collections::HashMap;

use async_graphql_parser::types::{ConstDirective, TypeSystemDefinition};
use async_graphql_value::ConstValue;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{
    exhaustiveness::{ExhaustivenessGuard, UnhandledVariantError},
    plan_nodes::{FetchNode, ParallelNode, PlanNode, SequenceNode},
};

/// Prefix of the `@link(url:)` argument that imports the connectors spec.
pub const CONNECT_SPEC_URL_PREFIX: &str = "https://specs.apollo.dev/connect/v";

// connector subgraphs are named `<namespace>.<source>:<rest>`
static CONNECTOR_NAME_REGEX: Lazy<regex_automata::meta::Regex> = Lazy::new(|| {
    regex_automata::meta::Regex::new(r"[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+:").unwrap()
});

/// What is known about a subgraph besides its name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubgraphInfo {
    #[serde(default, alias = "schemaText", skip_serializing_if = "Option::is_none")]
    pub sdl: Option<String>,
}

impl SubgraphInfo {
    pub fn with_sdl(sdl: impl Into<String>) -> Self {
        SubgraphInfo {
            sdl: Some(sdl.into()),
        }
    }
}

pub type SubgraphInfoMap = HashMap<String, SubgraphInfo>;

pub fn is_connector_target(target: &str) -> bool {
    CONNECTOR_NAME_REGEX.is_match(target)
}

/// Whether the subgraph schema links the connectors spec, either on a
/// `schema` definition or an `extend schema` extension.
///
/// A schema that cannot be parsed is not treated as a connector.
pub fn is_connector_schema(sdl: Option<&str>) -> bool {
    let Some(sdl) = sdl.filter(|sdl| !sdl.trim().is_empty()) else {
        return false;
    };

    let document = match async_graphql_parser::parse_schema(sdl) {
        Ok(document) => document,
        Err(err) => {
            warn!(error = %err, "failed to parse subgraph schema, assuming it is not a connector");
            return false;
        }
    };

    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            TypeSystemDefinition::Schema(schema) => Some(&schema.node.directives),
            _ => None,
        })
        .flatten()
        .any(|directive| is_connect_link(&directive.node))
}

fn is_connect_link(directive: &ConstDirective) -> bool {
    if directive.name.node.as_str() != "link" {
        return false;
    }

    directive
        .arguments
        .iter()
        .find(|(name, _)| name.node.as_str() == "url")
        .is_some_and(|(_, value)| {
            matches!(&value.node, ConstValue::String(url) if url.starts_with(CONNECT_SPEC_URL_PREFIX))
        })
}

pub fn is_connector(target: &str, sdl: Option<&str>) -> bool {
    is_connector_target(target) || is_connector_schema(sdl)
}

struct ConnectorFinder<'a> {
    subgraphs: &'a SubgraphInfoMap,
    guard: &'a ExhaustivenessGuard,
}

impl ConnectorFinder<'_> {
    fn is_connector_fetch(&self, fetch: &FetchNode) -> bool {
        let sdl = self
            .subgraphs
            .get(&fetch.service_name)
            .or_else(|| self.subgraphs.get(fetch.subgraph_name()))
            .and_then(|info| info.sdl.as_deref());

        is_connector(&fetch.service_name, sdl)
    }

    fn visit(&self, node: &PlanNode) -> Result<bool, UnhandledVariantError> {
        match node {
            PlanNode::Fetch(fetch) => Ok(self.is_connector_fetch(fetch)),
            PlanNode::Sequence(SequenceNode { nodes }) | PlanNode::Parallel(ParallelNode { nodes }) => {
                self.any(nodes)
            }
            PlanNode::Flatten(flatten) => self.visit(&flatten.node),
            PlanNode::Defer(defer) => self.any(defer.present_nodes()),
            PlanNode::Subscription(subscription) => {
                if self.is_connector_fetch(&subscription.primary) {
                    return Ok(true);
                }
                self.any(subscription.rest_nodes())
            }
            PlanNode::Condition(condition) => self.visit(condition.branch()),
            PlanNode::Unrecognized(node) => self.guard.on_unhandled(node, false),
        }
    }

    fn any<'n>(
        &self,
        nodes: impl IntoIterator<Item = &'n PlanNode>,
    ) -> Result<bool, UnhandledVariantError> {
        for node in nodes {
            if self.visit(node)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Whether any fetch reachable from `root` goes to a connector subgraph.
#[instrument(level = "debug", skip_all, fields(root_kind = root.kind()))]
pub fn plan_touches_connector(
    root: &PlanNode,
    subgraphs: &SubgraphInfoMap,
    guard: &ExhaustivenessGuard,
) -> Result<bool, UnhandledVariantError> {
    ConnectorFinder { subgraphs, guard }.visit(root)
}
