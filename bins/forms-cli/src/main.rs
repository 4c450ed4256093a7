// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Forms CLI
//!
//! Keeps a forms registry in a JSON state file and drives it from the
//! command line: deploy a registry, run YAML task plans against it, and read
//! forms, histories and the notification log back as JSON.

mod state;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use forms_app_core::config::ConfigService;
use forms_app_core::prefs::{RunnerPrefs, RUNNER_PREFS_KEY};
use forms_config_fs::FsConfigStore;
use forms_registry::{Address, EventRecord};
use forms_tasks::{run_plan, Plan};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "forms", author, version, about = "Forms registry driver")]
struct Cli {
    /// Registry state file (default: saved prefs, then `forms-state.json`).
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Log filter directive (default: `RUST_LOG`, then saved prefs).
    #[arg(long, global = true)]
    log: Option<String>,
    /// Directory holding saved prefs (default: platform config dir).
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty registry and write its state file.
    Deploy(DeployArgs),
    /// Run a YAML task plan against the registry (best effort).
    Run(RunArgs),
    /// Show one form, or every form.
    Show(ShowArgs),
    /// Show a question's response history.
    History(HistoryArgs),
    /// Show the notification log.
    Events(EventsArgs),
    /// Show or update saved prefs.
    Prefs(PrefsArgs),
}

#[derive(Args, Debug)]
struct DeployArgs {
    /// Owner address (default: saved prefs).
    #[arg(long)]
    owner: Option<String>,
    /// Replace an existing state file.
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Plan file.
    plan: PathBuf,
    /// Exit with an error when any step failed.
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Form id.
    #[arg(long)]
    form: Option<u64>,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    /// Form id.
    #[arg(long)]
    form: u64,
    /// Question index.
    #[arg(long)]
    question: usize,
    /// Only responses submitted by this address.
    #[arg(long)]
    responder: Option<String>,
}

#[derive(Args, Debug)]
struct EventsArgs {
    /// First sequence number to show.
    #[arg(long, default_value_t = 0)]
    since: u64,
    /// Only events with this name (e.g. `FormCreated`).
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct PrefsArgs {
    /// Default state file.
    #[arg(long)]
    set_state: Option<String>,
    /// Default owner for `deploy`.
    #[arg(long)]
    set_owner: Option<String>,
    /// Default log filter.
    #[arg(long)]
    set_log: Option<String>,
}

#[derive(Serialize)]
struct Deployed {
    owner: Address,
    state: PathBuf,
}

#[derive(Serialize)]
struct Overview {
    owner: Address,
    forms: Vec<forms_registry::FormDetails>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = match &cli.config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("open prefs store")?;
    let config = ConfigService::new(store);
    let prefs: RunnerPrefs = config
        .load_or_default(RUNNER_PREFS_KEY)
        .context("load prefs")?;

    init_tracing(cli.log.as_deref(), &prefs)?;

    let state_path = cli
        .state
        .clone()
        .unwrap_or_else(|| PathBuf::from(&prefs.state_path));

    match cli.command {
        Command::Deploy(args) => {
            let owner = match args.owner.or_else(|| prefs.default_owner.clone()) {
                Some(text) => parse_address(&text)?,
                None => bail!("no owner given (pass --owner or save one with `prefs --set-owner`)"),
            };
            let registry = state::deploy(&state_path, owner, args.force)?;
            emit(&Deployed {
                owner: registry.owner(),
                state: state_path,
            })
        }
        Command::Run(args) => {
            let plan = Plan::from_path(&args.plan)?;
            let mut registry = state::load(&state_path)?;
            let report = run_plan(&mut registry, &plan).context("prepare plan")?;
            state::save(&state_path, &registry)?;
            emit(&report)?;
            if args.strict && !report.all_ok() {
                bail!("{} of {} steps failed", report.failed, report.steps.len());
            }
            Ok(())
        }
        Command::Show(args) => {
            let registry = state::load(&state_path)?;
            match args.form {
                Some(form_id) => emit(&registry.form_details(form_id)?),
                None => emit(&Overview {
                    owner: registry.owner(),
                    forms: registry.all_forms(),
                }),
            }
        }
        Command::History(args) => {
            let registry = state::load(&state_path)?;
            let history = match args.responder.as_deref() {
                Some(text) => {
                    let responder = parse_address(text)?;
                    registry.responses_by(args.form, args.question, &responder)?
                }
                None => registry.response_history(args.form, args.question)?,
            };
            emit(&history)
        }
        Command::Events(args) => {
            let registry = state::load(&state_path)?;
            let records: Vec<&EventRecord> = registry
                .events()
                .since(args.since)
                .iter()
                .filter(|r| args.name.as_deref().is_none_or(|n| r.event.name() == n))
                .collect();
            emit(&records)
        }
        Command::Prefs(args) => {
            if let Some(owner) = &args.set_owner {
                parse_address(owner)?;
            }
            if let Some(filter) = &args.set_log {
                EnvFilter::try_new(filter).context("invalid log filter")?;
            }
            let prefs = config
                .update(RUNNER_PREFS_KEY, |prefs: &mut RunnerPrefs| {
                    let mut changed = false;
                    if let Some(path) = args.set_state {
                        prefs.state_path = path;
                        changed = true;
                    }
                    if let Some(owner) = args.set_owner {
                        prefs.default_owner = Some(owner);
                        changed = true;
                    }
                    if let Some(filter) = args.set_log {
                        prefs.log_filter = filter;
                        changed = true;
                    }
                    changed
                })
                .context("save prefs")?;
            emit(&prefs)
        }
    }
}

fn init_tracing(flag: Option<&str>, prefs: &RunnerPrefs) -> Result<()> {
    let filter = match flag {
        Some(directive) => EnvFilter::try_new(directive).context("invalid --log filter")?,
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&prefs.log_filter).context("invalid saved log filter")?,
        },
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn parse_address(text: &str) -> Result<Address> {
    text.parse()
        .with_context(|| format!("invalid address {text:?}"))
}

fn emit<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
