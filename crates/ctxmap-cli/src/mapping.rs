use crate::MapArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use ctxmap_graph::{load_json_file, OntologyGraph};
use ctxmap_search::{
    filter_by_information_content, CancellationToken, Mapping, MappingSearch, SearchConfig,
};
use ctxmap_stats::{CachingBackend, MemoryIndex, ScoreKind};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::fs;
use std::path::Path;
use tracing::info;

pub fn load_graph(path: &Path) -> Result<OntologyGraph> {
    let spec = load_json_file(path)
        .with_context(|| format!("failed to load ontology {}", path.display()))?;
    let graph = OntologyGraph::from_spec(spec)
        .with_context(|| format!("invalid ontology {}", path.display()))?;
    info!(
        ontology = graph.name(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "loaded ontology"
    );
    Ok(graph)
}

fn resolve_config(args: &MapArgs) -> Result<SearchConfig> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SearchConfig::default(),
    };
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(min) = args.min_threshold {
        config.min_threshold = min;
    }
    if let Some(accept) = args.accept_threshold {
        config.accept_threshold = accept;
    }
    if args.no_memo {
        config.memoize = false;
    }
    if args.no_orient {
        config.orient_by_size = false;
    }
    if args.bdeu {
        config.score = ScoreKind::Bdeu;
    }
    Ok(config)
}

fn write_mappings(mappings: &[Mapping], out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(mappings)?;
    match out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn cmd_map(args: &MapArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let source = load_graph(&args.source)?;
    let destination = load_graph(&args.destination)?;
    let context = load_graph(&args.context)?;
    let index = MemoryIndex::from_json_file(&args.index)
        .with_context(|| format!("failed to load index {}", args.index.display()))?;
    info!(
        documents = index.document_count(),
        concepts = index.concept_count(),
        "loaded index"
    );
    let backend = CachingBackend::new(index);

    let token = CancellationToken::new();
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, token.flag())
            .with_context(|| format!("failed to register handler for signal {signal}"))?;
    }

    let search = MappingSearch::new(&source, &destination, &context, &backend, config)?
        .with_cancellation(token);
    let result = if args.brute_force {
        search.run_brute_force()
    } else {
        search.run()
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(failure) => {
            if !failure.partial.is_empty() {
                if let Some(out) = &args.out {
                    write_mappings(&failure.partial, Some(out))?;
                }
            }
            return Err(failure.into());
        }
    };

    write_mappings(&outcome.mappings, args.out.as_deref())?;
    let report = &outcome.report;
    let cache = backend.stats();
    let status = if report.cancelled {
        "cancelled".yellow().bold()
    } else {
        "ok".green().bold()
    };
    eprintln!(
        "{} {} mappings (tests={} pruned={} skipped_branches={} swapped={} cache_hits={} cache_misses={})",
        status,
        outcome.mappings.len(),
        report.tests_run,
        report.pruned,
        report.skipped_source_branches,
        report.swapped,
        cache.hits,
        cache.misses
    );
    Ok(())
}

pub fn cmd_filter(mappings: &Path, cutoff: f64, out: Option<&Path>) -> Result<()> {
    let text = fs::read_to_string(mappings)
        .with_context(|| format!("failed to read {}", mappings.display()))?;
    let all: Vec<Mapping> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", mappings.display()))?;
    let kept = filter_by_information_content(&all, cutoff);
    write_mappings(&kept, out)?;
    eprintln!(
        "{} kept {} of {} mappings (cutoff={cutoff})",
        "ok".green().bold(),
        kept.len(),
        all.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, r#"{ "alpha": 4.0, "accept_threshold": 9.0 }"#).unwrap();

        let args = MapArgs {
            source: "s.json".into(),
            destination: "d.json".into(),
            context: "c.json".into(),
            index: "i.json".into(),
            config: Some(config_path),
            alpha: None,
            min_threshold: Some(-1.0),
            accept_threshold: None,
            no_memo: true,
            no_orient: false,
            bdeu: true,
            brute_force: false,
            out: None,
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.alpha, 4.0);
        assert_eq!(config.accept_threshold, 9.0);
        assert_eq!(config.min_threshold, -1.0);
        assert!(!config.memoize);
        assert!(config.orient_by_size);
        assert_eq!(config.score, ScoreKind::Bdeu);
    }
}
