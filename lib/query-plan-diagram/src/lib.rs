pub mod connectors;
pub mod diagram;
pub mod exhaustiveness;
pub mod links;
pub mod plan_nodes;
pub mod utils;

#[cfg(test)]
mod tests;
