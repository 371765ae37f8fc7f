//! The analyze command: Go sources in, state diagrams out.

use crate::analyzers::{Frontend, GoFrontend};
use crate::cli::Cli;
use crate::config::{self, StepmapConfig};
use crate::io::{
    self, group_by_output, render_document, FileDestination, OutputDestination,
    StdoutDestination,
};
use crate::machine::{analyze_file, AnalysisOptions, StepGraph};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct AnalyzeConfig {
    pub files: Vec<PathBuf>,
    pub console: bool,
    pub config_path: Option<PathBuf>,
    pub framework: Option<String>,
    pub extension: Option<String>,
}

impl AnalyzeConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            files: cli.files.clone(),
            console: cli.console,
            config_path: cli.config.clone(),
            framework: cli.framework.clone(),
            extension: cli.extension.clone(),
        }
    }
}

/// A rendered diagram and where it goes; `None` means stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub path: Option<PathBuf>,
    pub content: String,
}

pub fn handle_analyze(config: AnalyzeConfig) -> Result<()> {
    let settings = resolve_settings(&config)?;
    let options = settings.analysis_options();

    let mut graph = build_graph(&config.files, &options, &GoFrontend)?;
    if graph.is_empty() {
        log::info!("No step functions found");
        return Ok(());
    }

    graph.propagate_all();

    for diagram in render_diagrams(&graph, config.console, &settings.diagram_extension) {
        write_diagram(&diagram, destination_for(&diagram).as_ref())?;
    }
    Ok(())
}

/// Configuration file values with command line overrides applied.
pub fn resolve_settings(config: &AnalyzeConfig) -> Result<StepmapConfig> {
    let mut settings = match &config.config_path {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => config::load_config(),
    };

    if let Some(framework) = &config.framework {
        settings.framework_package = framework.clone();
    }
    if let Some(extension) = &config.extension {
        settings.diagram_extension = extension.clone();
    }

    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(settings)
}

/// Parses and analyzes `files` in order. Any unreadable or malformed file
/// aborts the run.
pub fn build_graph(
    files: &[PathBuf],
    options: &AnalysisOptions,
    frontend: &dyn Frontend,
) -> Result<StepGraph> {
    let mut graph = StepGraph::new();
    for path in files {
        let content = io::read_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        add_source(&mut graph, path, &content, options, frontend)?;
    }
    Ok(graph)
}

/// Adds the steps of one source file to `graph`.
pub fn add_source(
    graph: &mut StepGraph,
    path: &Path,
    content: &str,
    options: &AnalysisOptions,
    frontend: &dyn Frontend,
) -> Result<()> {
    let file = frontend
        .parse(content, path)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let steps = analyze_file(&file, options);
    log::info!("{}: {} step(s)", path.display(), steps.len());
    graph.add_steps(&io::output_stem(path), steps);
    Ok(())
}

/// Renders the graph as one document for the console, or one document per
/// output group otherwise.
pub fn render_diagrams(graph: &StepGraph, console: bool, extension: &str) -> Vec<RenderedDiagram> {
    let types = graph.types();
    if console {
        return vec![RenderedDiagram {
            path: None,
            content: render_document(&types),
        }];
    }

    group_by_output(&types)
        .into_iter()
        .map(|(output, members)| RenderedDiagram {
            path: Some(io::diagram_path(output, extension)),
            content: render_document(&members),
        })
        .collect()
}

fn destination_for(diagram: &RenderedDiagram) -> Box<dyn OutputDestination> {
    match &diagram.path {
        Some(path) => Box::new(FileDestination::new(path.clone())),
        None => Box::new(StdoutDestination::new()),
    }
}

fn write_diagram(diagram: &RenderedDiagram, destination: &dyn OutputDestination) -> Result<()> {
    destination
        .write_str(&diagram.content)
        .and_then(|()| destination.flush())
        .with_context(|| format!("Failed to write diagram to {}", destination.description()))?;
    log::info!("Wrote {}", destination.description());
    Ok(())
}
