//! Check a module manifest for unresolved dependencies
//!
//! Registers every declared module with a no-op factory, queues the
//! declared runners (plus any found through trigger attributes in markup
//! files) and reports what loaded and what is still waiting.
//!
//! Exits with status 1 when any runner is left waiting.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

use deferred_loader::module::registry::manifest::ModuleManifest;
use deferred_loader::utils::init_logging_from_config;
use deferred_loader::{EntryPoint, Loader, LoaderConfig, LoggingConfig, ModuleDefinition};

#[derive(Parser, Debug)]
#[command(name = "graph-check", about = "Resolve a module manifest and report stalled runners")]
struct Args {
    /// Module manifest (TOML)
    manifest: PathBuf,

    /// Loader configuration (.json or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markup files scanned for trigger attributes
    #[arg(long = "markup")]
    markup: Vec<PathBuf>,

    /// Print the dependency report as JSON
    #[arg(long)]
    json: bool,

    /// Write loaded modules, in load order, to this manifest
    #[arg(long, value_name = "OUT")]
    freeze: Option<PathBuf>,

    /// Origins left out of the frozen manifest
    #[arg(long = "exclude-origin")]
    exclude_origin: Vec<String>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("graph-check: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether every runner ran
fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = match &args.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if let Some(filter) = &args.log_level {
        let logging = config.logging.get_or_insert_with(LoggingConfig::default);
        logging.filter = Some(filter.clone());
    }
    init_logging_from_config(config.logging.as_ref());

    let manifest = ModuleManifest::from_file(&args.manifest)
        .with_context(|| format!("reading manifest {}", args.manifest.display()))?;
    info!(
        "Checking {} modules and {} runners from {}",
        manifest.modules.len(),
        manifest.runners.len(),
        args.manifest.display()
    );

    // Hold the runners until every module is registered
    const BOOTSTRAP: &str = "graph-check";
    let loader = Loader::with_config(&config)?;
    loader.add_runner_blocker(BOOTSTRAP);

    for module in &manifest.modules {
        let mut definition =
            ModuleDefinition::new(module.name.as_str(), module.dependencies.iter().cloned(), |_, _, _| {
                Ok(())
            });
        if let Some(origin) = &module.origin {
            definition = definition.with_origin(origin.as_str());
        }
        if !loader.define_module(definition) {
            debug!("Duplicate declaration of {} ignored", module.name);
        }
    }

    for (index, runner) in manifest.runners.iter().enumerate() {
        let label = runner
            .label
            .clone()
            .unwrap_or_else(|| format!("runner #{}", index + 1));
        loader.manager().run_entry_point(EntryPoint::new(
            label,
            runner.dependencies.iter().cloned(),
            |_, _, _| Ok(()),
        ));
    }

    for path in &args.markup {
        let markup = std::fs::read_to_string(path)
            .with_context(|| format!("reading markup {}", path.display()))?;
        let names = loader.run_triggers(&markup);
        debug!("{}: {:?}", path.display(), names);
    }

    loader.remove_runner_blocker(BOOTSTRAP);

    let report = loader.debug();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Load order:");
        for name in loader.loaded_modules() {
            println!("  {}", name);
        }
        print!("{}", report);
    }

    if let Some(out) = &args.freeze {
        let frozen = loader.freeze(&args.exclude_origin);
        frozen
            .to_file(out)
            .with_context(|| format!("writing frozen manifest {}", out.display()))?;
        info!("Froze {} modules to {}", frozen.modules.len(), out.display());
    }

    Ok(report.is_settled())
}
