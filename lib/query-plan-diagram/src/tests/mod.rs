mod plan_nodes;
mod testkit;
