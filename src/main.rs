mod cli;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands, TrackArgs};
use ext_reload::config::ReloaderConfig;
use ext_reload::output::{TrackedReport, print_report};
use ext_reload::watcher::{BatchPolicy, ExtensionReloader, ExtensionReloaderBuilder};
use ext_reload::{CommandRegistry, IdentifierRules, ModuleId, PathSpec, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            track,
            load_cmd,
            reload_cmd,
            active,
            first_event_only,
            debounce_ms,
            debug,
        } => {
            let config = ReloaderConfig::load(&track.root);
            let debug = debug || config.debug;
            init_logging(&config, debug);

            let policy = if first_event_only {
                BatchPolicy::FirstEvent
            } else {
                config.batch.unwrap_or_default()
            };
            let debounce = debounce_ms
                .or(config.debounce_ms)
                .map(Duration::from_millis)
                .unwrap_or(ext_reload::watcher::DEFAULT_DEBOUNCE);

            let registry = CommandRegistry::new(
                load_cmd.or_else(|| config.commands.load.clone()),
                reload_cmd.or_else(|| config.commands.reload.clone()),
            )
            .with_active(active.iter().map(|m| ModuleId::from(m.as_str())));

            let reloader = builder(&track, &config)
                .batch_policy(policy)
                .debounce(debounce)
                .debug(debug)
                .build(registry)
                .with_context(|| format!("cannot watch {}", track.root.display()))?;

            tracing::debug!("{reloader:?}");
            reloader.watch().await.context("watch stopped")?;
        }
        Commands::List { track, json } => {
            let config = ReloaderConfig::load(&track.root);
            init_logging(&config, false);

            let reloader = builder(&track, &config)
                .build(CommandRegistry::default())
                .with_context(|| format!("cannot resolve {}", track.root.display()))?;

            print_report(&TrackedReport::from_reloader(&reloader), json);
        }
    }

    Ok(())
}

fn init_logging(config: &ReloaderConfig, debug: bool) {
    let mut logging_config = config.logging.clone();
    if debug {
        logging_config
            .modules
            .insert("ext_reload".to_string(), "debug".to_string());
    }
    logging::init_with_config(&logging_config);
}

/// Merge command-line arguments over config into a reloader builder.
fn builder(track: &TrackArgs, config: &ReloaderConfig) -> ExtensionReloaderBuilder {
    let paths = if !track.paths.is_empty() {
        track.paths.clone()
    } else if let Some(paths) = &config.paths {
        under_root(&track.root, paths)
    } else {
        vec![track.root.clone()]
    };

    let ignore = if !track.ignore.is_empty() {
        track.ignore.clone()
    } else {
        config
            .ignore
            .as_deref()
            .map(|paths| under_root(&track.root, paths))
            .unwrap_or_default()
    };

    let defaults = config.rules();
    let rules = IdentifierRules {
        extension: track.extension.clone().unwrap_or(defaults.extension),
        separator: track.separator.clone().unwrap_or(defaults.separator),
    };

    let mut builder = ExtensionReloader::builder()
        .paths(to_spec(paths))
        .project_root(track.root.clone())
        .rules(rules);
    if !ignore.is_empty() {
        builder = builder.ignore(to_spec(ignore));
    }
    if let Some(dirs) = &config.artifact_dirs {
        builder = builder.artifact_dirs(dirs.iter().cloned());
    }
    builder
}

/// Config paths are relative to the project root.
fn under_root(root: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    paths.iter().map(|p| root.join(p)).collect()
}

fn to_spec(mut paths: Vec<PathBuf>) -> PathSpec {
    if paths.len() == 1 {
        PathSpec::Single(paths.remove(0))
    } else {
        PathSpec::Many(paths)
    }
}
