use crate::{
    plan_nodes::{
        ConditionClause, ConditionNode, PlanNode, PlanNodeError, QueryPlan, ResponsePathElement,
    },
    tests::testkit::{fetch, init_logger, read_query_plan},
};
use std::error::Error;

#[test]
fn condition_requires_exactly_one_branch() {
    init_logger();

    assert_eq!(
        ConditionNode::try_new("flag", None, None).unwrap_err(),
        PlanNodeError::ConditionWithoutBranch("flag".to_string())
    );
    assert_eq!(
        ConditionNode::try_new("flag", Some(fetch("a")), Some(fetch("b"))).unwrap_err(),
        PlanNodeError::ConditionWithBothBranches("flag".to_string())
    );
    assert!(matches!(
        ConditionNode::try_new("flag", None, Some(fetch("a"))).map(|node| node.clause),
        Ok(ConditionClause::Skip(_))
    ));
}

#[test]
fn condition_without_branch_is_rejected_when_loading() {
    init_logger();
    let err = serde_json::from_str::<PlanNode>(
        r#"{ "kind": "Sequence", "nodes": [{ "kind": "Condition", "condition": "flag" }] }"#,
    )
    .unwrap_err();

    assert!(err
        .to_string()
        .contains("Condition node on \"flag\" has neither an ifClause nor an elseClause"));

    let both = serde_json::from_str::<PlanNode>(
        r#"{
          "kind": "Condition",
          "condition": "flag",
          "ifClause": { "kind": "Fetch", "serviceName": "a" },
          "elseClause": { "kind": "Fetch", "serviceName": "b" }
        }"#,
    );
    assert!(both.is_err());
}

#[test]
fn unknown_kinds_are_kept_but_malformed_known_kinds_fail() -> Result<(), Box<dyn Error>> {
    init_logger();
    let unknown: PlanNode = serde_json::from_str(r#"{ "kind": "Teleport", "to": "mars" }"#)?;
    assert_eq!(unknown.kind(), "Teleport");
    assert!(matches!(unknown, PlanNode::Unrecognized(_)));

    let missing_kind: PlanNode = serde_json::from_str(r#"{ "serviceName": "a" }"#)?;
    assert!(matches!(missing_kind, PlanNode::Unrecognized(_)));

    let malformed_fetch = serde_json::from_str::<PlanNode>(r#"{ "kind": "Fetch" }"#);
    assert!(malformed_fetch.is_err());

    Ok(())
}

#[test]
fn kind_may_come_anywhere_in_the_object() -> Result<(), Box<dyn Error>> {
    init_logger();
    let kind_first = r#"{"kind":"Sequence","nodes":[{"kind":"Flatten","path":["a"],"node":{"kind":"Fetch","serviceName":"x"}}]}"#;
    let kind_last = r#"{"nodes":[{"node":{"serviceName":"x","kind":"Fetch"},"path":["a"],"kind":"Flatten"}],"kind":"Sequence"}"#;

    let streamed: PlanNode = serde_json::from_str(kind_first)?;
    let buffered: PlanNode = serde_json::from_str(kind_last)?;

    assert_eq!(serde_json::to_string(&streamed)?, kind_first);
    assert_eq!(serde_json::to_string(&buffered)?, kind_first);

    let late_unknown: PlanNode = serde_json::from_str(r#"{ "to": "mars", "kind": "Teleport" }"#)?;
    assert_eq!(late_unknown.kind(), "Teleport");

    Ok(())
}

#[test]
fn deeply_nested_plans_load() -> Result<(), Box<dyn Error>> {
    init_logger();
    let depth = 40;
    let mut source = r#"{"kind":"Fetch","serviceName":"leaf"}"#.to_string();
    for _ in 0..depth {
        source = format!(r#"{{"kind":"Flatten","path":["a"],"node":{source}}}"#);
    }

    let mut node: PlanNode = serde_json::from_str(&source)?;
    for _ in 0..depth {
        node = match node {
            PlanNode::Flatten(flatten) => *flatten.node,
            other => panic!("expected a flatten node, got {}", other.kind()),
        };
    }
    assert_eq!(node.kind(), "Fetch");

    Ok(())
}

#[test]
fn serializes_back_to_planner_shape() -> Result<(), Box<dyn Error>> {
    init_logger();
    let source = r#"{"kind":"Sequence","nodes":[{"kind":"Condition","condition":"flag","elseClause":{"kind":"Flatten","path":["users",0,"@"],"node":{"kind":"Fetch","serviceName":"a"}}},{"kind":"Teleport","to":"mars"}]}"#;
    let node: PlanNode = serde_json::from_str(source)?;

    assert_eq!(serde_json::to_string(&node)?, source);

    Ok(())
}

#[test]
fn flatten_path_keeps_indexes_and_keys_apart() -> Result<(), Box<dyn Error>> {
    init_logger();
    let path: Vec<ResponsePathElement> = serde_json::from_str(r#"["users", 0, "@"]"#)?;

    assert_eq!(
        path,
        vec![
            ResponsePathElement::Key("users".to_string()),
            ResponsePathElement::Index(0),
            ResponsePathElement::Key("@".to_string()),
        ]
    );

    Ok(())
}

#[test]
fn pretty_print_query_plan() {
    init_logger();
    let plan = read_query_plan("fixture/plans/top-products.json");

    insta::assert_snapshot!(format!("{}", plan), @r#"
    QueryPlan {
      Sequence {
        Fetch(service: "products") {
          query TopProducts__products__0{topProducts{__typename upc name}}
        },
        Parallel {
          Flatten(path: "topProducts.@") {
            Fetch(service: "inventory") {
              query TopProducts__inventory__1($representations:[_Any!]!){_entities(representations:$representations){...on Product{inStock}}}
            },
          },
          Flatten(path: "topProducts.@") {
            Fetch(service: "reviews") {
              query TopProducts__reviews__2($representations:[_Any!]!){_entities(representations:$representations){...on Product{reviews{body author{__typename id}}}}}
            },
          },
        },
        Include(if: $withAuthor) {
          Flatten(path: "topProducts.@.reviews.@.author") {
            Fetch(service: "accounts") {
              query TopProducts__accounts__3($representations:[_Any!]!){_entities(representations:$representations){...on User{name}}}
            },
          },
        },
      },
    },
    "#);
}

#[test]
fn pretty_print_defer_and_subscription() {
    init_logger();
    let deferred = read_query_plan("fixture/plans/deferred-connector.json");
    let subscription = read_query_plan("fixture/plans/review-subscription.json");

    insta::assert_snapshot!(format!("{}", deferred), @r#"
    QueryPlan {
      Defer {
        Primary {
          Fetch(service: "accounts") {
            {user(id:1){__typename id name}}
          },
        },
        Deferred(label: "orders") {
          Flatten(path: "user") {
            Fetch(service: "connectors.orders_api:http?sourceName=orders") {
              query($representations:[_Any!]!){_entities(representations:$representations){...on User{orders{id total}}}}
            },
          },
        },
        Deferred {
        },
      },
    },
    "#);
    insta::assert_snapshot!(format!("{}", subscription), @r#"
    QueryPlan {
      Subscription {
        Primary: {
          Fetch(service: "reviews") {
            subscription{reviewAdded{__typename body product{__typename upc}}}
          },
        },
        Rest: {
          Flatten(path: "reviewAdded.product") {
            Fetch(service: "products") {
              query($representations:[_Any!]!){_entities(representations:$representations){...on Product{name}}}
            },
          },
        },
      },
    },
    "#);
}

#[test]
fn empty_plan_pretty_prints() {
    init_logger();

    assert_eq!(format!("{}", QueryPlan::default()), "QueryPlan {\n},\n");
}
