use crate::batch::compute_batches_with_theme;
use crate::config::load_config;
use crate::diagnostics::validate_architecture;
use crate::focus::FocusState;
use crate::ir::{Architecture, Direction, load_architecture};
use crate::layout_dump::{load_positions, write_positions};
use crate::model::structural_fingerprint;
use crate::{ModelOptions, build_dump_for};
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::collections::{BTreeSet, HashSet};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "archgraph", version, about = "Architecture dependency graph layout")]
pub struct Args {
    /// Log decisions and timings to stderr
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the node/edge model and write it as JSON
    Layout(LayoutArgs),
    /// List connected batches
    Batches(InputArgs),
    /// Print the structural fingerprint
    Fingerprint(InputArgs),
    /// Report dangling, duplicate and self dependencies
    Validate(InputArgs),
    /// Print the one-hop neighborhood of a module
    Focus(FocusArgs),
}

#[derive(ClapArgs, Debug)]
pub struct InputArgs {
    /// architecture.json, or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct LayoutArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layout direction (TB, BT, LR, RL)
    #[arg(short = 'd', long = "direction")]
    pub direction: Option<String>,

    /// Group to render expanded; repeatable
    #[arg(long = "expand")]
    pub expand: Vec<String>,

    /// Expand every group
    #[arg(long = "expand-all")]
    pub expand_all: bool,

    /// Saved positions (filename -> {x, y})
    #[arg(long = "positions")]
    pub positions: Option<PathBuf>,

    /// Directory whose *.prompt files count as existing prompts
    #[arg(long = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,

    /// Write the resulting positions for the position store
    #[arg(long = "write-positions")]
    pub write_positions: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct FocusArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Focused module filename
    #[arg(short = 'm', long = "module")]
    pub module: String,

    /// Expanded group; repeatable
    #[arg(long = "expand")]
    pub expand: Vec<String>,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Layout(layout) => run_layout(layout),
        Command::Batches(input) => {
            let architecture = read_architecture(input.input.as_deref())?;
            let batches = compute_batches_with_theme(&architecture.modules, &Default::default());
            println!("{}", serde_json::to_string_pretty(&batches)?);
            Ok(())
        }
        Command::Fingerprint(input) => {
            let architecture = read_architecture(input.input.as_deref())?;
            println!("{}", structural_fingerprint(&architecture.modules));
            Ok(())
        }
        Command::Validate(input) => {
            let architecture = read_architecture(input.input.as_deref())?;
            let report = validate_architecture(&architecture.modules);
            for issue in &report.issues {
                println!("{issue}");
            }
            if report.is_clean() {
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "{} issue(s) found in architecture",
                    report.issues.len()
                ))
            }
        }
        Command::Focus(focus) => {
            let architecture = read_architecture(focus.input.input.as_deref())?;
            let expanded: BTreeSet<String> = focus.expand.into_iter().collect();
            let mut state = FocusState::new();
            state.focus(&focus.module);
            if state.sync_visibility(&architecture.modules, &expanded) {
                return Err(anyhow::anyhow!(
                    "module '{}' is not visible with the current expansion",
                    focus.module
                ));
            }
            match state.neighborhood(&architecture.modules) {
                Some(set) => {
                    println!("{}", serde_json::to_string_pretty(&set)?);
                    Ok(())
                }
                None => Err(anyhow::anyhow!("unknown module '{}'", focus.module)),
            }
        }
    }
}

fn run_layout(args: LayoutArgs) -> Result<()> {
    let architecture = read_architecture(args.input.input.as_deref())?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(token) = args.direction.as_deref() {
        config.layout.direction = Direction::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("unknown layout direction '{token}'"))?;
    }

    let saved_positions = match args.positions.as_deref() {
        Some(path) if path.exists() => load_positions(path)?,
        _ => Default::default(),
    };
    let existing_prompts = match args.prompts_dir.as_deref() {
        Some(dir) => discover_prompts(dir)?,
        None => HashSet::new(),
    };

    let options = ModelOptions {
        config,
        expanded_groups: args.expand.into_iter().collect(),
        expand_all: args.expand_all,
        existing_prompts,
        saved_positions,
    };
    let dump = build_dump_for(&architecture, &options);

    if let Some(path) = args.write_positions.as_deref() {
        write_positions(path, &dump.positions)?;
    }
    let json = dump.to_json()?;
    match args.output.as_deref() {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_architecture(path: Option<&Path>) -> Result<Architecture> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(load_architecture(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Architecture::from_json(&buf)?)
}

fn discover_prompts(dir: &Path) -> Result<HashSet<String>> {
    let mut prompts = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !is_prompt_file(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            prompts.insert(name.to_string());
        }
    }
    Ok(prompts)
}

fn is_prompt_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext == "prompt")
        .unwrap_or(false)
}
