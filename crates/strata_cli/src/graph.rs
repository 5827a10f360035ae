//! `strata graph`: the import graph reachable from one file.

use serde_json::json;
use strata_common::SourcePath;
use strata_rules::rules::BuildModuleGraph;
use strata_rules::{ImportGraph, Lite};

use crate::workspace::Workspace;
use crate::{GlobalArgs, GraphArgs, ReportFormat};

/// Runs the `strata graph` command.
///
/// Prints every reachable file with its direct imports, then either a build
/// order or the first import cycle found. Returns 1 if the graph has a cycle
/// or broken files.
pub fn run(args: &GraphArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let workspace = Workspace::open(global)?;
    let file = workspace.source_path(&args.file);
    let runtime = workspace.runtime()?;
    let graph = runtime.block_on(async {
        let host = workspace.host()?;
        let graph = host.request::<BuildModuleGraph<Lite>>(file.clone()).await;
        host.shutdown();
        Ok::<_, Box<dyn std::error::Error>>(graph?)
    })?;

    let order = graph.graph.topological_order();
    match args.format {
        ReportFormat::Text => print!("{}", render_text(&file, &graph, &order)),
        ReportFormat::Json => {
            let value = render_json(&file, &graph, &order);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(if order.is_err() || !graph.broken.is_empty() {
        1
    } else {
        0
    })
}

fn render_text(
    root: &SourcePath,
    graph: &ImportGraph,
    order: &Result<Vec<SourcePath>, Vec<SourcePath>>,
) -> String {
    let mut out = format!("{root}\n");
    for node in graph.graph.nodes() {
        let imports = graph.graph.imports_of(node);
        if imports.is_empty() {
            out.push_str(&format!("  {node}\n"));
        } else {
            let names: Vec<&str> = imports.iter().map(SourcePath::as_str).collect();
            out.push_str(&format!("  {node} -> {}\n", names.join(", ")));
        }
    }
    for broken in &graph.broken {
        out.push_str(&format!("broken: {broken}\n"));
    }
    match order {
        Ok(order) => {
            let names: Vec<&str> = order.iter().map(SourcePath::as_str).collect();
            out.push_str(&format!("order: {}\n", names.join(", ")));
        }
        Err(cycle) => {
            let names: Vec<&str> = cycle.iter().map(SourcePath::as_str).collect();
            out.push_str(&format!("cycle: {}\n", names.join(", ")));
        }
    }
    out
}

fn render_json(
    root: &SourcePath,
    graph: &ImportGraph,
    order: &Result<Vec<SourcePath>, Vec<SourcePath>>,
) -> serde_json::Value {
    let edges: serde_json::Map<String, serde_json::Value> = graph
        .graph
        .nodes()
        .map(|node| (node.to_string(), json!(graph.graph.imports_of(node))))
        .collect();
    let (order, cycle) = match order {
        Ok(order) => (Some(order), None),
        Err(cycle) => (None, Some(cycle)),
    };
    json!({
        "root": root,
        "imports": edges,
        "broken": graph.broken,
        "order": order,
        "cycle": cycle,
    })
}
