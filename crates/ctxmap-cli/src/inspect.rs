use crate::mapping::load_graph;
use anyhow::Result;
use colored::Colorize;
use ctxmap_stats::{bdeu_score, dependence_score, independence_score, ContingencyTable};
use std::path::Path;

pub fn cmd_layers(path: &Path) -> Result<()> {
    let graph = load_graph(path)?;
    let layers = graph.topological_layers();
    println!(
        "{} {} (range {}..{}, {} nodes, {} edges)",
        "ontology".bold(),
        graph.name(),
        graph.range().start,
        graph.range().end(),
        graph.node_count(),
        graph.edge_count()
    );
    for (depth, layer) in layers.iter().enumerate() {
        let concepts: Vec<String> = layer.iter().map(|c| c.to_string()).collect();
        println!("  {} {}: {}", "layer".cyan(), depth, concepts.join(", "));
    }
    let reachable: usize = layers.iter().map(Vec::len).sum();
    if reachable < graph.node_count() {
        println!(
            "  {} {} nodes unreachable from the roots",
            "note".yellow().bold(),
            graph.node_count() - reachable
        );
    }
    Ok(())
}

pub fn cmd_score(cells: Vec<u64>, alpha: f64, bdeu: bool) -> Result<()> {
    let table = ContingencyTable::from_cells(cells)?;
    let dependence = dependence_score(&table, alpha)?;
    let independence = independence_score(&table, alpha)?;
    println!("{} {:?} (k={})", "table".bold(), table.cells(), table.arity());
    println!("  dependence:   {dependence:.6}");
    println!("  independence: {independence:.6}");
    let bf = dependence - independence;
    let verdict = if bf > 0.0 {
        "dependent".green()
    } else {
        "independent".yellow()
    };
    println!("  bayes factor: {bf:.6} ({verdict})");
    if bdeu {
        println!("  bdeu:         {:.6}", bdeu_score(&table, alpha)?);
    }
    Ok(())
}
