// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading and running a persisted graph.

use crate::error::RunnerError;
use crate::policy::HostPolicy;
use crate::settings::RunnerSettings;
use blueprint_graph::{
    Blueprint, ExecutionError, Executor, Graph, LoadReport, PinValue, Reaction, RunReport,
};
use blueprint_nodes::builtin_registry;
use std::thread;

/// Reports from one invocation of the runner
#[derive(Debug)]
pub struct RunSummary {
    /// Problems recovered while loading the graph
    pub load: LoadReport,
    /// Reruns triggered by input overrides, in order
    pub reruns: Vec<RunReport>,
    /// The final foreground run
    pub foreground: RunReport,
    /// The background preview run, when enabled
    pub preview: Option<RunReport>,
}

/// Load the configured graph, apply overrides, run it and optionally save it
pub fn run(settings: &RunnerSettings) -> Result<RunSummary, RunnerError> {
    let graph_path = settings.graph_path.as_ref().ok_or(RunnerError::NoGraph)?;

    let mut session = Blueprint::new(builtin_registry());
    let load = session.load_file(graph_path)?;
    for warning in &load.warnings {
        tracing::warn!("{}: {}", graph_path.display(), warning);
    }
    tracing::info!(
        "Loaded '{}': {} nodes, {} links",
        session.graph().name,
        session.graph().node_count(),
        session.graph().link_count()
    );

    session.set_observer(HostPolicy::new());
    let mut reruns = Vec::new();
    for o in &settings.overrides {
        let node = session
            .graph()
            .nodes()
            .find(|n| n.name() == o.node)
            .map(|n| n.id())
            .ok_or_else(|| RunnerError::UnknownNode(o.node.clone(), graph_path.clone()))?;
        match session.set_input(node, &o.pin, PinValue::Float(o.value))? {
            Reaction::Ran(report) => reruns.push(report),
            Reaction::RunFailed(e) => return Err(e.into()),
            Reaction::Nothing | Reaction::AutoLinked(_) => {}
        }
    }

    let (foreground, preview) = run_concurrently(session.graph(), settings.background_preview)?;
    log_report("Foreground", &foreground);
    if let Some(preview) = &preview {
        log_report("Preview", preview);
    }

    if let Some(save_path) = &settings.save_path {
        session.save_file(save_path)?;
        tracing::info!("Saved graph to {}", save_path.display());
    }

    Ok(RunSummary {
        load,
        reruns,
        foreground,
        preview,
    })
}

/// Run `graph` on this thread and, when `preview` is set, once more on a
/// second thread with its own context
pub fn run_concurrently(
    graph: &Graph,
    preview: bool,
) -> Result<(RunReport, Option<RunReport>), RunnerError> {
    thread::scope(|s| -> Result<(RunReport, Option<RunReport>), RunnerError> {
        let background = preview.then(|| {
            s.spawn(move || -> Result<RunReport, ExecutionError> {
                let executor = Executor::new(graph);
                let mut ctx = executor.context().with_threading(true);
                executor.run(&mut ctx)
            })
        });

        let executor = Executor::new(graph);
        let foreground = executor.run(&mut executor.context());

        let preview = match background {
            Some(handle) => Some(
                handle
                    .join()
                    .map_err(|_| RunnerError::PreviewPanicked)??,
            ),
            None => None,
        };
        Ok((foreground?, preview))
    })
}

fn log_report(label: &str, report: &RunReport) {
    tracing::info!(
        "{} run {:?} after {} steps in {:?}",
        label,
        report.status,
        report.path.len(),
        report.elapsed
    );
    for error in &report.errors {
        tracing::warn!("{} run: node '{}' failed: {}", label, error.node_name, error.message);
    }
    for (node, cost) in &report.costs {
        tracing::debug!("{} run: node {} cost {:?}", label, node, cost);
    }
}
