//! `ptm` - inspect a local directory through the project tree manager
//!
//! The directory is imported into an in-memory workspace; nothing is written
//! back to disk.

mod import;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ptm_core::{ManagerConfig, ProjectManager};
use ptm_estimate::SourceEstimation;
use ptm_model::{AttributeValue, TreeEntry};
use ptm_registry::{ProjectHandlerRegistry, ProjectTypeRegistry, TypeCatalog};
use ptm_vfs::{TreePath, VfsRegistry, WorkspaceId};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LOCAL_WORKSPACE: &str = "local";

#[derive(Parser)]
#[command(name = "ptm", about = "Project tree manager", author, version)]
struct Cli {
    /// Manager configuration (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Project type catalog (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    types: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `ptm_core=trace`; overrides RUST_LOG
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered project types
    Types(OutputArgs),
    /// Estimate the attributes of one type for a directory
    Estimate(EstimateArgs),
    /// Rank the auto-detectable types matching a directory
    Resolve(ResolveArgs),
    /// Print the tree of a directory
    Tree(TreeArgs),
}

#[derive(Args)]
struct OutputArgs {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct EstimateArgs {
    /// Directory to inspect
    dir: PathBuf,

    /// Project type id
    #[arg(long = "type", value_name = "TYPE")]
    project_type: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct ResolveArgs {
    /// Directory to inspect
    dir: PathBuf,

    /// Skip detectors that search below the top-level folder
    #[arg(long)]
    shallow: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct TreeArgs {
    /// Directory to inspect
    dir: PathBuf,

    /// Annotate folders with their best matching type
    #[arg(long)]
    detect: bool,

    /// Maximum depth to print
    #[arg(long, value_name = "N")]
    depth: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref(), cli.log_json)?;

    let config = match &cli.config {
        Some(path) => ManagerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ManagerConfig::default(),
    };
    let types = load_types(cli.types.as_deref())?;

    match &cli.command {
        Commands::Types(args) => print_types(&types, args.json),
        Commands::Estimate(args) => {
            let manager = open_local(&args.dir, config, types)?;
            let attributes = manager.estimate_project(
                &workspace(),
                &TreePath::root(),
                &args.project_type,
            )?;
            print_attributes(&attributes, args.output.json)
        }
        Commands::Resolve(args) => {
            let manager = open_local(&args.dir, config, types)?;
            let ranked = manager.resolve_sources(&workspace(), &TreePath::root(), args.shallow)?;
            print_resolution(&ranked, args.output.json)
        }
        Commands::Tree(args) => {
            let manager = open_local(&args.dir, config, types)?;
            print_tree(&manager, args)
        }
    }
}

fn init_tracing(level: Option<&str>, json: bool) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("bad log filter '{level}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn load_types(catalog: Option<&Path>) -> Result<Arc<ProjectTypeRegistry>> {
    let registry = ProjectTypeRegistry::with_defaults();
    if let Some(path) = catalog {
        TypeCatalog::load(path)
            .and_then(|catalog| catalog.register_into(&registry))
            .with_context(|| format!("loading type catalog {}", path.display()))?;
    }
    Ok(Arc::new(registry))
}

fn workspace() -> WorkspaceId {
    WorkspaceId::new(LOCAL_WORKSPACE)
}

fn open_local(
    dir: &Path,
    config: ManagerConfig,
    types: Arc<ProjectTypeRegistry>,
) -> Result<ProjectManager> {
    let (memory, _) = import::import_dir(dir)?;
    let vfs = Arc::new(VfsRegistry::new());
    vfs.register(workspace(), Arc::new(memory));
    Ok(
        ProjectManager::new(vfs, types, Arc::new(ProjectHandlerRegistry::new()))
            .with_config(config),
    )
}

fn print_types(types: &ProjectTypeRegistry, json: bool) -> Result<()> {
    let mut rows = Vec::new();
    for id in types.ids() {
        let descriptor = types.get(&id)?;
        let attributes: Vec<Value> = descriptor
            .attributes()
            .values()
            .map(|a| {
                json!({
                    "name": a.name,
                    "required": a.required,
                    "constant": a.constant_values(),
                    "detected": a.detector().is_some(),
                })
            })
            .collect();
        rows.push(json!({
            "id": descriptor.id(),
            "display_name": descriptor.display_name(),
            "parents": descriptor.parents(),
            "primary": descriptor.is_primary(),
            "mixable": descriptor.is_mixable(),
            "auto_detect": descriptor.is_auto_detect(),
            "attributes": attributes,
        }));

        if !json {
            let mut roles = Vec::new();
            if descriptor.is_primary() {
                roles.push("primary");
            }
            if descriptor.is_mixable() {
                roles.push("mixin");
            }
            if descriptor.is_auto_detect() {
                roles.push("auto-detect");
            }
            println!("{} ({}) [{}]", descriptor.id(), descriptor.display_name(), roles.join(", "));
            for attribute in descriptor.attributes().values() {
                let marker = if attribute.required { "*" } else { " " };
                println!("  {marker} {}", attribute.name);
            }
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}

fn print_attributes(attributes: &BTreeMap<String, AttributeValue>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(attributes)?);
        return Ok(());
    }
    if attributes.is_empty() {
        println!("no attributes detected");
    }
    for (name, value) in attributes {
        println!("{name} = {} ({:?})", value.values().join(", "), value.origin());
    }
    Ok(())
}

fn print_resolution(ranked: &[SourceEstimation], json: bool) -> Result<()> {
    if json {
        let rows: Vec<Value> = ranked
            .iter()
            .map(|e| {
                json!({
                    "project_type": e.project_type,
                    "matched_required": e.matched_required,
                    "total_required": e.total_required,
                    "attributes": e.attributes,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if ranked.is_empty() {
        println!("no matching project type");
    }
    for estimation in ranked {
        let attributes: Vec<String> = estimation
            .attributes
            .iter()
            .map(|(name, value)| format!("{name}={}", value.values().join(",")))
            .collect();
        println!(
            "{:<16} {}/{} required  {}",
            estimation.project_type,
            estimation.matched_required,
            estimation.total_required,
            attributes.join(" ")
        );
    }
    Ok(())
}

fn print_tree(manager: &ProjectManager, args: &TreeArgs) -> Result<()> {
    println!("{}", manager.config().root_name);
    print_children(manager, args, &TreePath::root(), 1)
}

fn print_children(
    manager: &ProjectManager,
    args: &TreeArgs,
    folder: &TreePath,
    depth: usize,
) -> Result<()> {
    if args.depth.is_some_and(|max| depth > max) {
        return Ok(());
    }
    let ws = workspace();
    for entry in manager.list_children(&ws, folder)? {
        let indent = "  ".repeat(depth);
        match &entry {
            TreeEntry::File(file) => println!("{indent}{}", file.name()),
            TreeEntry::Project(project) => {
                println!("{indent}{}/ [{}]", project.name(), project.project_type());
            }
            TreeEntry::Folder(folder) => {
                let detected = if args.detect {
                    manager
                        .resolve_sources(&ws, folder.path(), true)?
                        .first()
                        .map(|best| format!(" ({}?)", best.project_type))
                        .unwrap_or_default()
                } else {
                    String::new()
                };
                println!("{indent}{}/{detected}", folder.name());
            }
        }
        if !matches!(entry, TreeEntry::File(_)) {
            print_children(manager, args, entry.path(), depth + 1)?;
        }
    }
    Ok(())
}
