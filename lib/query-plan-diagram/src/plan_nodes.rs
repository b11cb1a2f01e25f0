use crate::utils::pretty_display::{get_indent, PrettyDisplay};
use serde::{
    de::{value::MapAccessDeserializer, Error as _, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter as FmtFormatter, Result as FmtResult};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PlanNodeError {
    #[error("Condition node on \"{0}\" has neither an ifClause nor an elseClause")]
    ConditionWithoutBranch(String),
    #[error("Condition node on \"{0}\" has both an ifClause and an elseClause")]
    ConditionWithBothBranches(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryPlan {
    #[serde(default)]
    pub node: Option<PlanNode>,
}

/// A node of a federated query plan, discriminated by the `kind` field of
/// the planner's JSON output.
///
/// Kinds outside of the known set are kept as [`PlanNode::Unrecognized`]
/// so consumers can decide how to treat them instead of failing to load the
/// whole plan.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", remote = "Self")]
pub enum PlanNode {
    Sequence(SequenceNode),
    Parallel(ParallelNode),
    Fetch(FetchNode),
    Flatten(FlattenNode),
    Defer(DeferNode),
    Subscription(SubscriptionNode),
    Condition(ConditionNode),
    #[serde(skip)]
    Unrecognized(UnrecognizedNode),
}

impl PlanNode {
    const KNOWN_KINDS: [&'static str; 7] = [
        "Sequence",
        "Parallel",
        "Fetch",
        "Flatten",
        "Defer",
        "Subscription",
        "Condition",
    ];

    fn is_known(kind: &str) -> bool {
        PlanNode::KNOWN_KINDS.contains(&kind)
    }

    pub fn kind(&self) -> &str {
        match self {
            PlanNode::Sequence(_) => "Sequence",
            PlanNode::Parallel(_) => "Parallel",
            PlanNode::Fetch(_) => "Fetch",
            PlanNode::Flatten(_) => "Flatten",
            PlanNode::Defer(_) => "Defer",
            PlanNode::Subscription(_) => "Subscription",
            PlanNode::Condition(_) => "Condition",
            PlanNode::Unrecognized(node) => node.kind().unwrap_or("<missing>"),
        }
    }
}

impl<'de> Deserialize<'de> for PlanNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PlanNodeVisitor)
    }
}

fn deserialize_known_kind<'de, D>(kind: &str, deserializer: D) -> Result<PlanNode, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match kind {
        "Sequence" => PlanNode::Sequence(SequenceNode::deserialize(deserializer)?),
        "Parallel" => PlanNode::Parallel(ParallelNode::deserialize(deserializer)?),
        "Fetch" => PlanNode::Fetch(FetchNode::deserialize(deserializer)?),
        "Flatten" => PlanNode::Flatten(FlattenNode::deserialize(deserializer)?),
        "Defer" => PlanNode::Defer(DeferNode::deserialize(deserializer)?),
        "Subscription" => PlanNode::Subscription(SubscriptionNode::deserialize(deserializer)?),
        "Condition" => PlanNode::Condition(ConditionNode::deserialize(deserializer)?),
        unknown => return Err(D::Error::unknown_variant(unknown, &PlanNode::KNOWN_KINDS)),
    })
}

/// Planners write `kind` as the first key, in which case the rest of the
/// object is read straight into the node. Otherwise the object is buffered
/// once to find the kind.
struct PlanNodeVisitor;

impl<'de> Visitor<'de> for PlanNodeVisitor {
    type Value = PlanNode;

    fn expecting(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        f.write_str("a query plan node object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<PlanNode, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut buffered = Map::new();

        if let Some(first_key) = map.next_key::<String>()? {
            let first_value = map.next_value::<Value>()?;
            if first_key == "kind" {
                if let Some(kind) = first_value.as_str().filter(|kind| PlanNode::is_known(kind)) {
                    return deserialize_known_kind(kind, MapAccessDeserializer::new(map));
                }
            }
            buffered.insert(first_key, first_value);
        }

        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            buffered.insert(key, value);
        }

        let known_kind = buffered
            .get("kind")
            .and_then(Value::as_str)
            .filter(|kind| PlanNode::is_known(kind))
            .map(str::to_string);

        match known_kind {
            Some(kind) => {
                deserialize_known_kind(&kind, Value::Object(buffered)).map_err(A::Error::custom)
            }
            None => Ok(PlanNode::Unrecognized(UnrecognizedNode(Value::Object(
                buffered,
            )))),
        }
    }
}

impl Serialize for PlanNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PlanNode::Unrecognized(node) => node.serialize(serializer),
            known => PlanNode::serialize(known, serializer),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceNode {
    pub nodes: Vec<PlanNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelNode {
    pub nodes: Vec<PlanNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchNode {
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl FetchNode {
    pub fn new(service_name: impl Into<String>) -> Self {
        FetchNode {
            service_name: service_name.into(),
            operation_name: None,
            operation_kind: None,
            operation: None,
        }
    }

    /// Service name without the routing arguments connector subgraphs
    /// append after `?`.
    pub fn subgraph_name(&self) -> &str {
        strip_routing_arguments(&self.service_name)
    }
}

pub fn strip_routing_arguments(service_name: &str) -> &str {
    match service_name.split_once('?') {
        Some((name, _)) => name,
        None => service_name,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePathElement {
    Index(u64),
    Key(String),
}

impl Display for ResponsePathElement {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        match self {
            ResponsePathElement::Index(index) => write!(f, "{index}"),
            ResponsePathElement::Key(key) => write!(f, "{key}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenNode {
    pub path: Vec<ResponsePathElement>,
    pub node: Box<PlanNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferPrimary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Box<PlanNode>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferredNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Box<PlanNode>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferNode {
    pub primary: DeferPrimary,
    #[serde(default)]
    pub deferred: Vec<DeferredNode>,
}

impl DeferNode {
    /// Primary node followed by every deferred node that is present.
    pub fn present_nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.primary
            .node
            .iter()
            .chain(self.deferred.iter().flat_map(|deferred| deferred.node.iter()))
            .map(|node| node.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionNode {
    pub primary: FetchNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<SequenceNode>,
}

impl SubscriptionNode {
    pub fn rest_nodes(&self) -> &[PlanNode] {
        self.rest
            .as_ref()
            .map(|rest| rest.nodes.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub enum ConditionClause {
    /// `@include(if: $condition)`, runs when the condition is true.
    Include(Box<PlanNode>),
    /// `@skip(if: $condition)`, runs when the condition is false.
    Skip(Box<PlanNode>),
}

/// A conditional branch. Exactly one of the `ifClause`/`elseClause` fields
/// of the planner's output is accepted, anything else is rejected when the
/// node is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ConditionNodeFields", into = "ConditionNodeFields")]
pub struct ConditionNode {
    pub condition: String,
    pub clause: ConditionClause,
}

impl ConditionNode {
    pub fn try_new(
        condition: impl Into<String>,
        if_clause: Option<PlanNode>,
        else_clause: Option<PlanNode>,
    ) -> Result<Self, PlanNodeError> {
        let condition = condition.into();
        let clause = match (if_clause, else_clause) {
            (Some(node), None) => ConditionClause::Include(Box::new(node)),
            (None, Some(node)) => ConditionClause::Skip(Box::new(node)),
            (None, None) => return Err(PlanNodeError::ConditionWithoutBranch(condition)),
            (Some(_), Some(_)) => return Err(PlanNodeError::ConditionWithBothBranches(condition)),
        };

        Ok(ConditionNode { condition, clause })
    }

    pub fn branch(&self) -> &PlanNode {
        match &self.clause {
            ConditionClause::Include(node) | ConditionClause::Skip(node) => node,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConditionNodeFields {
    condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    if_clause: Option<PlanNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    else_clause: Option<PlanNode>,
}

impl TryFrom<ConditionNodeFields> for ConditionNode {
    type Error = PlanNodeError;

    fn try_from(fields: ConditionNodeFields) -> Result<Self, Self::Error> {
        ConditionNode::try_new(fields.condition, fields.if_clause, fields.else_clause)
    }
}

impl From<ConditionNode> for ConditionNodeFields {
    fn from(node: ConditionNode) -> Self {
        let (if_clause, else_clause) = match node.clause {
            ConditionClause::Include(node) => (Some(*node), None),
            ConditionClause::Skip(node) => (None, Some(*node)),
        };

        ConditionNodeFields {
            condition: node.condition,
            if_clause,
            else_clause,
        }
    }
}

/// Raw JSON of a plan node whose `kind` is not part of the known set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UnrecognizedNode(pub Value);

impl UnrecognizedNode {
    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind").and_then(Value::as_str)
    }
}

impl Display for QueryPlan {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        self.pretty_fmt(f, 0)
    }
}

impl Display for PlanNode {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        self.pretty_fmt(f, 0)
    }
}

impl PrettyDisplay for QueryPlan {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        writeln!(f, "{indent}QueryPlan {{")?;
        if let Some(node) = &self.node {
            node.pretty_fmt(f, depth + 1)?;
        }
        writeln!(f, "{indent}}},")?;
        Ok(())
    }
}

impl PrettyDisplay for FetchNode {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        writeln!(f, "{indent}Fetch(service: \"{}\") {{", self.service_name)?;
        if let Some(operation) = &self.operation {
            for line in operation.lines() {
                writeln!(f, "{indent}  {line}")?;
            }
        }
        writeln!(f, "{indent}}},")?;

        Ok(())
    }
}

impl PrettyDisplay for FlattenNode {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        writeln!(
            f,
            "{indent}Flatten(path: \"{}\") {{",
            self.path
                .iter()
                .map(|segment| segment.to_string())
                .collect::<Vec<String>>()
                .join(".")
        )?;
        self.node.pretty_fmt(f, depth + 1)?;
        writeln!(f, "{indent}}},")?;

        Ok(())
    }
}

impl PrettyDisplay for DeferNode {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        writeln!(f, "{indent}Defer {{")?;
        writeln!(f, "{indent}  Primary {{")?;
        if let Some(node) = &self.primary.node {
            node.pretty_fmt(f, depth + 2)?;
        }
        writeln!(f, "{indent}  }},")?;
        for deferred in &self.deferred {
            match &deferred.label {
                Some(label) => writeln!(f, "{indent}  Deferred(label: \"{label}\") {{")?,
                None => writeln!(f, "{indent}  Deferred {{")?,
            }
            if let Some(node) = &deferred.node {
                node.pretty_fmt(f, depth + 2)?;
            }
            writeln!(f, "{indent}  }},")?;
        }
        writeln!(f, "{indent}}},")?;

        Ok(())
    }
}

impl PrettyDisplay for SubscriptionNode {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        writeln!(f, "{indent}Subscription {{")?;
        writeln!(f, "{indent}  Primary: {{")?;
        self.primary.pretty_fmt(f, depth + 2)?;
        writeln!(f, "{indent}  }},")?;
        if let Some(rest) = &self.rest {
            writeln!(f, "{indent}  Rest: {{")?;
            for node in &rest.nodes {
                node.pretty_fmt(f, depth + 2)?;
            }
            writeln!(f, "{indent}  }},")?;
        }
        writeln!(f, "{indent}}},")?;

        Ok(())
    }
}

impl PrettyDisplay for ConditionNode {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        let indent = get_indent(depth);
        match &self.clause {
            ConditionClause::Include(_) => writeln!(f, "{indent}Include(if: ${}) {{", self.condition)?,
            ConditionClause::Skip(_) => writeln!(f, "{indent}Skip(if: ${}) {{", self.condition)?,
        }
        self.branch().pretty_fmt(f, depth + 1)?;
        writeln!(f, "{indent}}},")?;

        Ok(())
    }
}

impl PrettyDisplay for PlanNode {
    fn pretty_fmt(&self, f: &mut FmtFormatter<'_>, depth: usize) -> FmtResult {
        match self {
            PlanNode::Fetch(node) => node.pretty_fmt(f, depth),
            PlanNode::Flatten(node) => node.pretty_fmt(f, depth),
            PlanNode::Defer(node) => node.pretty_fmt(f, depth),
            PlanNode::Subscription(node) => node.pretty_fmt(f, depth),
            PlanNode::Condition(node) => node.pretty_fmt(f, depth),
            PlanNode::Parallel(ParallelNode { nodes }) | PlanNode::Sequence(SequenceNode { nodes }) => {
                let indent = get_indent(depth);
                let variant = if matches!(self, PlanNode::Parallel(_)) {
                    "Parallel"
                } else {
                    "Sequence"
                };
                writeln!(f, "{indent}{variant} {{")?;
                for node in nodes {
                    node.pretty_fmt(f, depth + 1)?;
                }
                writeln!(f, "{indent}}},")?;
                Ok(())
            }
            PlanNode::Unrecognized(node) => {
                let indent = get_indent(depth);
                writeln!(
                    f,
                    "{indent}Unrecognized(kind: \"{}\"),",
                    node.kind().unwrap_or("<missing>")
                )
            }
        }
    }
}
