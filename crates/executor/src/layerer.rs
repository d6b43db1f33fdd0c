//! Deterministic topological layering (C3).

use petgraph::{algo::is_cyclic_directed, graph::DiGraph, graph::NodeIndex, visit::Topo};
use std::collections::HashMap;
use taskgraph_common::{Dag, Error, Layer, Result, Task, TaskId};
use tracing::{instrument, warn};

/// Partitions a DAG into layers: repeatedly peel off the frontier of tasks
/// whose dependencies are already assigned to a prior layer.
#[instrument(skip(dag))]
pub fn layer(dag: &Dag) -> Result<Vec<Layer>> {
    dag.validate()?;

    if dag.tasks.is_empty() {
        return Ok(Vec::new());
    }

    let (graph, node_map) = build_graph(dag)?;
    if is_cyclic_directed(&graph) {
        return Err(Error::CycleDetected);
    }

    let mut topo = Topo::new(&graph);
    let mut order = Vec::with_capacity(dag.tasks.len());
    while let Some(idx) = topo.next(&graph) {
        order.push(idx);
    }
    if order.len() != dag.tasks.len() {
        warn!("topological order shorter than task count, treating as cycle");
        return Err(Error::CycleDetected);
    }

    // Rank every task by walking `order` (a true topological sequence), not
    // `dag.tasks` input order: the input is only "an ordered sequence of
    // Tasks", with no guarantee it is already topologically sorted, so a
    // dependency's rank must already be known by the time a task is ranked.
    let id_of: HashMap<NodeIndex, &TaskId> =
        node_map.iter().map(|(id, &idx)| (idx, id)).collect();
    let mut rank: HashMap<TaskId, usize> = HashMap::with_capacity(dag.tasks.len());
    for idx in order {
        let id = id_of[&idx];
        let task = dag.get(id).expect("task id came from this dag's graph");
        let mut r = 0usize;
        for dep in &task.depends_on {
            let dep_rank = rank[dep];
            r = r.max(dep_rank + 1);
        }
        rank.insert(id.clone(), r);
    }

    let max_rank = rank.values().copied().max().unwrap_or(0);
    let mut layers: Vec<Vec<Task>> = vec![Vec::new(); max_rank + 1];
    for task in &dag.tasks {
        let r = rank[&task.id];
        layers[r].push(task.clone());
    }

    Ok(layers
        .into_iter()
        .enumerate()
        .map(|(index, tasks)| Layer { index, tasks })
        .collect())
}

fn build_graph(dag: &Dag) -> Result<(DiGraph<TaskId, ()>, HashMap<TaskId, NodeIndex>)> {
    let mut graph = DiGraph::new();
    let mut node_map = HashMap::with_capacity(dag.tasks.len());

    for task in &dag.tasks {
        let idx = graph.add_node(task.id.clone());
        node_map.insert(task.id.clone(), idx);
    }

    for task in &dag.tasks {
        let &to_idx = node_map
            .get(&task.id)
            .expect("task just inserted into node_map");
        for dep in &task.depends_on {
            let &from_idx = node_map
                .get(dep)
                .ok_or_else(|| Error::UnknownDependency(dep.clone()))?;
            graph.add_edge(from_idx, to_idx, ());
        }
    }

    Ok((graph, node_map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(id: &str, deps: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            tool: "code:noop".to_string(),
            arguments: json!({}),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn fan_out_is_a_single_layer() {
        let dag = Dag::new(vec![task("t1", &[]), task("t2", &[]), task("t3", &[])]);
        let layers = layer(&dag).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].tasks.len(), 3);
    }

    #[test]
    fn diamond_has_three_layers() {
        let dag = Dag::new(vec![
            task("t1", &[]),
            task("t2", &["t1"]),
            task("t3", &["t1"]),
            task("t4", &["t2", "t3"]),
        ]);
        let layers = layer(&dag).unwrap();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].tasks.len(), 1);
        assert_eq!(layers[1].tasks.len(), 2);
        assert_eq!(layers[2].tasks.len(), 1);
    }

    #[test]
    fn cycle_is_rejected() {
        let dag = Dag::new(vec![task("t1", &["t2"]), task("t2", &["t1"])]);
        assert!(matches!(layer(&dag), Err(Error::CycleDetected)));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let dag = Dag::new(vec![task("t1", &["ghost"])]);
        assert!(matches!(layer(&dag), Err(Error::UnknownDependency(_))));
    }

    #[test]
    fn unsorted_input_still_layers_correctly() {
        // t4 depends on t2/t3, but appears before them in the input list.
        let dag = Dag::new(vec![
            task("t4", &["t2", "t3"]),
            task("t2", &["t1"]),
            task("t3", &["t1"]),
            task("t1", &[]),
        ]);
        let layers = layer(&dag).unwrap();
        assert_eq!(layers.len(), 3);
        assert_eq!(
            layers[0].tasks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["t1"]
        );
        let mut layer1: Vec<_> = layers[1].tasks.iter().map(|t| t.id.as_str()).collect();
        layer1.sort_unstable();
        assert_eq!(layer1, vec!["t2", "t3"]);
        assert_eq!(
            layers[2].tasks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["t4"]
        );
    }

    #[test]
    fn layer_order_is_stable_within_a_layer() {
        let dag = Dag::new(vec![task("b", &[]), task("a", &[]), task("c", &[])]);
        let layers = layer(&dag).unwrap();
        let ids: Vec<_> = layers[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
