// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blueprint Runner - headless host for persisted Blueprint graphs
//!
//! Reads its settings from a RON file (first argument, or
//! `blueprint_runner.ron` in the working directory), loads the configured
//! graph with the built-in node catalog and runs it once. With
//! `background_preview` enabled a second run shares the graph from another
//! thread, the way an editor previews while the user works.

mod error;
mod policy;
mod runner;
mod settings;

use settings::{RunnerSettings, SETTINGS_FILE_NAME};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let settings_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(SETTINGS_FILE_NAME), PathBuf::from);

    // Settings are read before logging exists, so failures are reported after init
    let loaded = RunnerSettings::load_or_default(&settings_path);
    let log_filter = loaded
        .as_ref()
        .map(|s| s.log_filter.clone())
        .unwrap_or_else(|_| RunnerSettings::default().log_filter);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Blueprint Runner v{}", env!("CARGO_PKG_VERSION"));

    let settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to load {}: {e}", settings_path.display());
            std::process::exit(1);
        }
    };

    match runner::run(&settings) {
        Ok(summary) => {
            tracing::info!(
                "Done: {} load warnings, {} reruns, preview {:?}",
                summary.load.warnings.len(),
                summary.reruns.len(),
                summary.preview.map(|p| p.status)
            );
            if !summary.foreground.is_clean() {
                std::process::exit(2);
            }
        }
        Err(e) => {
            tracing::error!("Run failed: {e}");
            std::process::exit(1);
        }
    }
}
