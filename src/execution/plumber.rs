//! Plumber - validates a pipe graph and fixes its execution order
//!
//! Validation runs in four passes over the pipes reachable from the roots:
//! output limits, cycles, connectivity, then a deterministic topological sort.
//! Nothing is invoked until every pass has succeeded.

use crate::core::{Flow, FlowError, OutputLimit, PipeId, StructuralViolation};
use crate::execution::runner::Runner;
use petgraph::algo::{connected_components, tarjan_scc};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::{debug, info};

/// Builds runners from validated flows
pub struct Plumber;

/// A validated graph. Node indices equal discovery order.
struct Plan {
    graph: DiGraph<PipeId, ()>,
    order: Vec<PipeId>,
}

impl Plumber {
    /// Validate everything reachable from `roots` and return a runner bound to
    /// the resulting order
    pub fn translate<'f>(flow: &'f mut Flow, roots: &[PipeId]) -> Result<Runner<'f>, FlowError> {
        let plan = plan(flow, roots)?;
        debug!("Flow graph:\n{}", render_dot(flow, &plan.graph)?);

        let names = plan
            .order
            .iter()
            .map(|id| flow.name(*id))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Validated {} pipes: {}", names.len(), names.join(" -> "));

        Ok(Runner::new(flow, plan.order))
    }

    /// Validate and return the execution order without building a runner
    pub fn validate(flow: &Flow, roots: &[PipeId]) -> Result<Vec<PipeId>, FlowError> {
        plan(flow, roots).map(|plan| plan.order)
    }

    /// Render the validated graph in Graphviz DOT
    pub fn to_dot(flow: &Flow, roots: &[PipeId]) -> Result<String, FlowError> {
        let plan = plan(flow, roots)?;
        render_dot(flow, &plan.graph)
    }
}

fn plan(flow: &Flow, roots: &[PipeId]) -> Result<Plan, FlowError> {
    let discovered = discover(flow, roots)?;
    let graph = build_graph(flow, &discovered)?;
    check_cycles(flow, &graph)?;
    check_connected(flow, &graph)?;
    let order = topological_order(&graph);
    Ok(Plan { graph, order })
}

/// Depth-first discovery with an explicit stack, successors visited in
/// declared order
fn discover(flow: &Flow, roots: &[PipeId]) -> Result<Vec<PipeId>, FlowError> {
    if roots.is_empty() {
        return Err(FlowError::InvalidArgument(
            "at least one root pipe is required".to_string(),
        ));
    }
    for root in roots {
        flow.slot(*root)?;
    }

    let mut visited = HashSet::new();
    let mut discovered = Vec::new();

    for root in roots {
        let mut stack = vec![*root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            discovered.push(id);
            for next in flow.successors(id)?.iter().rev() {
                if !visited.contains(next) {
                    stack.push(*next);
                }
            }
        }
    }

    Ok(discovered)
}

fn build_graph(flow: &Flow, discovered: &[PipeId]) -> Result<DiGraph<PipeId, ()>, FlowError> {
    let mut graph = DiGraph::with_capacity(discovered.len(), discovered.len());
    let mut index: HashMap<PipeId, NodeIndex> = HashMap::with_capacity(discovered.len());
    for id in discovered {
        index.insert(*id, graph.add_node(*id));
    }

    for id in discovered {
        let successors = flow.successors(*id)?;
        if let OutputLimit::AtMost(limit) = flow.output_limit(*id)? {
            if successors.len() > limit {
                return Err(StructuralViolation::OutputLimitExceeded {
                    pipe: flow.name(*id)?.to_string(),
                    limit,
                    actual: successors.len(),
                }
                .into());
            }
        }

        for next in successors {
            // Every successor was discovered, so the lookup cannot miss
            if let (Some(from), Some(to)) = (index.get(id), index.get(next)) {
                graph.add_edge(*from, *to, ());
                debug!("connected {} -> {}", flow.name(*id)?, flow.name(*next)?);
            }
        }
    }

    Ok(graph)
}

fn check_cycles(flow: &Flow, graph: &DiGraph<PipeId, ()>) -> Result<(), FlowError> {
    let mut cyclic: Vec<NodeIndex> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();

    if cyclic.is_empty() {
        return Ok(());
    }

    cyclic.sort();
    let pipes = names_of(flow, graph, &cyclic)?;
    Err(StructuralViolation::Cycle { pipes }.into())
}

fn check_connected(flow: &Flow, graph: &DiGraph<PipeId, ()>) -> Result<(), FlowError> {
    if connected_components(graph) <= 1 {
        return Ok(());
    }

    let mut sets = UnionFind::new(graph.node_count());
    for edge in graph.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }

    // Group by representative, keeping discovery order within and across groups
    let mut slot_of_label: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<NodeIndex>> = Vec::new();
    for node in graph.node_indices() {
        let label = sets.find(node.index());
        let slot = *slot_of_label.entry(label).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(node);
    }

    let components = groups
        .iter()
        .map(|group| names_of(flow, graph, group))
        .collect::<Result<Vec<_>, _>>()?;
    Err(StructuralViolation::Disconnected { components }.into())
}

/// Kahn's algorithm; among ready pipes the earliest discovered runs first
fn topological_order(graph: &DiGraph<PipeId, ()>) -> Vec<PipeId> {
    let mut in_degree = vec![0usize; graph.node_count()];
    for edge in graph.edge_references() {
        in_degree[edge.target().index()] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| Reverse(node))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(node)) = ready.pop() {
        let node = NodeIndex::new(node);
        order.push(graph[node]);
        for edge in graph.edges(node) {
            let target = edge.target().index();
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                ready.push(Reverse(target));
            }
        }
    }

    order
}

fn names_of(
    flow: &Flow,
    graph: &DiGraph<PipeId, ()>,
    nodes: &[NodeIndex],
) -> Result<Vec<String>, FlowError> {
    nodes
        .iter()
        .map(|node| flow.name(graph[*node]).map(str::to_string))
        .collect()
}

fn render_dot(flow: &Flow, graph: &DiGraph<PipeId, ()>) -> Result<String, FlowError> {
    let mut labels = HashMap::with_capacity(graph.node_count());
    for node in graph.node_indices() {
        labels.insert(node, flow.name(graph[node])?.to_string());
    }
    let named = graph.map(
        |node, _| labels.get(&node).cloned().unwrap_or_default(),
        |_, _| "",
    );
    Ok(format!("{}", Dot::with_config(&named, &[Config::EdgeNoLabel])))
}
