use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use dcr_ledger::{CausalGraph, EdgeKind, HistoryRecord, HistoryValidator};
use dcr_peer::{NodeClient, RegistryClient};
use dcr_protocol::{LoginResponse, WorkflowDirectory};
use dcr_server::{DcrServer, NodeConfig};
use dcr_types::{EventDefinition, EventKey, EventNode};
use serde::Serialize;

use crate::cli::*;

/// Node settings for `serve`: the config file if given, then flag overrides.
/// `None` for every other command.
pub fn node_config(cli: &Cli) -> anyhow::Result<Option<NodeConfig>> {
    let Command::Serve(args) = &cli.command else {
        return Ok(None);
    };
    let config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    Ok(Some(apply_overrides(config, args)))
}

fn apply_overrides(mut config: NodeConfig, args: &ServeArgs) -> NodeConfig {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(uri) = &args.public_uri {
        config.public_uri = Some(uri.clone());
    }
    config
}

pub async fn run_command(cli: Cli, config: Option<NodeConfig>) -> anyhow::Result<()> {
    let out = Output { format: cli.format.clone() };
    match &cli.command {
        Command::Serve(_) => {
            let config = config.unwrap_or_default();
            println!(
                "{} DCR event node on {}",
                "▶".green().bold(),
                config.bind_addr.to_string().bold()
            );
            DcrServer::new(config)?.serve().await?;
            Ok(())
        }
        Command::Health => cmd_health(&cli, &out).await,
        Command::Show(args) => cmd_show(&cli, &out, args).await,
        Command::State(args) => cmd_state(&cli, &out, args).await,
        Command::History(args) => cmd_history(&cli, &out, args).await,
        Command::Graph(args) => cmd_graph(&cli, &out, args).await,
        Command::Create(args) => cmd_create(&cli, &out, args).await,
        Command::Delete(args) => {
            let key = event_key(args);
            client(&cli, &cli.node)?.delete(&key).await?;
            println!("{} Deleted {}", "✓".green().bold(), key.to_string().yellow());
            Ok(())
        }
        Command::Reset(args) => {
            let node = client(&cli, &cli.node)?.reset(&event_key(args)).await?;
            out.emit(&node, || {
                println!("{} Reset {}", "✓".green().bold(), node.key().to_string().yellow());
                print_node(&node);
            })
        }
        Command::Execute(args) => cmd_execute(&cli, &out, args).await,
    }
}

struct Output {
    format: OutputFormat,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => text(),
        }
        Ok(())
    }
}

fn client(cli: &Cli, base: &str) -> anyhow::Result<NodeClient> {
    let client = NodeClient::new(base, Duration::from_millis(cli.timeout_ms))?;
    Ok(client.with_admin_token(cli.admin_token.clone()))
}

fn event_key(args: &EventArgs) -> EventKey {
    EventKey::new(args.workflow_id.clone(), args.event_id.clone())
}

fn flag(value: bool) -> colored::ColoredString {
    if value { "yes".green() } else { "no".dimmed() }
}

fn print_node(node: &EventNode) {
    println!("  Name:     {}", node.name.bold());
    println!("  Node:     {}", node.own_uri.blue());
    println!("  Executed: {}", flag(node.executed));
    println!("  Included: {}", flag(node.included));
    println!("  Pending:  {}", flag(node.pending));
    match &node.lock_owner {
        Some(owner) => println!("  Lock:     held by {}", owner.red()),
        None => println!("  Lock:     {}", "free".green()),
    }
    let roles: Vec<&str> = node.roles.iter().map(String::as_str).collect();
    println!("  Roles:    {}", roles.join(", "));
    if !node.relations.is_empty() {
        println!("  Relations:");
        for target in node.relations.lock_targets(&node.key()) {
            println!("    → {} ({})", target.key().to_string().cyan(), target.uri.dimmed());
        }
    }
}

fn print_record(record: &HistoryRecord) {
    let counterpart = match (&record.counterpart_id, record.counterpart_timestamp) {
        (Some(id), Some(ts)) => format!(" ↔ {id}@{ts}"),
        (Some(id), None) => format!(" ↔ {id}@?"),
        _ => String::new(),
    };
    println!(
        "{} {:<20}{}  {}",
        format!("{}@{}", record.event_id, record.timestamp).yellow(),
        format!("{:?}", record.kind),
        counterpart.cyan(),
        record.hash_hex()[..12].dimmed()
    );
    if let Some(message) = &record.message {
        println!("    {}", message.dimmed());
    }
}

async fn cmd_health(cli: &Cli, out: &Output) -> anyhow::Result<()> {
    let health = client(cli, &cli.node)?.health().await?;
    out.emit(&health, || {
        println!(
            "{} {} is {} (v{})",
            "✓".green().bold(),
            cli.node.bold(),
            health.status.green(),
            health.version
        );
    })
}

async fn cmd_show(cli: &Cli, out: &Output, args: &EventArgs) -> anyhow::Result<()> {
    let node = client(cli, &cli.node)?.get(&event_key(args)).await?;
    out.emit(&node, || {
        println!("Event {}", node.key().to_string().yellow().bold());
        print_node(&node);
    })
}

async fn cmd_state(cli: &Cli, out: &Output, args: &StateArgs) -> anyhow::Result<()> {
    let key = event_key(&args.event);
    let state = client(cli, &cli.node)?.state(&key, &args.sender).await?;
    out.emit(&state, || {
        println!("Event {} ({})", key.to_string().yellow().bold(), state.name);
        println!("  Executed:   {}", flag(state.executed));
        println!("  Included:   {}", flag(state.included));
        println!("  Pending:    {}", flag(state.pending));
        println!("  Executable: {}", flag(state.executable));
    })
}

async fn cmd_history(cli: &Cli, out: &Output, args: &HistoryArgs) -> anyhow::Result<()> {
    let client = client(cli, &cli.node)?;
    let records = match &args.event_id {
        Some(event_id) => {
            client
                .history(&EventKey::new(args.workflow_id.clone(), event_id.clone()))
                .await?
        }
        None => client.workflow_history(&args.workflow_id).await?,
    };

    out.emit(&records, || {
        if records.is_empty() {
            println!("No history recorded.");
        }
        for record in &records {
            print_record(record);
        }
    })?;

    if args.verify {
        let mut broken = 0;
        for (key, chain) in per_event(&records) {
            let report = HistoryValidator::validate_records(&key, &chain);
            if !report.is_valid() {
                broken += 1;
                for violation in &report.violations {
                    eprintln!(
                        "{} {}@{}: {}",
                        "✗".red().bold(),
                        key,
                        violation.timestamp,
                        violation.description
                    );
                }
            }
        }
        if broken > 0 {
            bail!("{broken} event histories failed verification");
        }
        eprintln!("{} History chains verified", "✓".green().bold());
    }
    Ok(())
}

/// Split a mixed export into per-event chains, each in timestamp order.
fn per_event(records: &[HistoryRecord]) -> Vec<(EventKey, Vec<HistoryRecord>)> {
    let mut chains: std::collections::BTreeMap<EventKey, Vec<HistoryRecord>> = Default::default();
    for record in records {
        chains.entry(record.key()).or_default().push(record.clone());
    }
    chains
        .into_iter()
        .map(|(key, mut chain)| {
            chain.sort_by_key(|r| r.timestamp);
            (key, chain)
        })
        .collect()
}

async fn cmd_graph(cli: &Cli, out: &Output, args: &GraphArgs) -> anyhow::Result<()> {
    let mut records = Vec::new();
    for base in std::iter::once(&cli.node).chain(&args.nodes) {
        let exported = client(cli, base)?
            .workflow_history(&args.workflow_id)
            .await
            .with_context(|| format!("fetching history from {base}"))?;
        tracing::debug!(node = %base, records = exported.len(), "history fetched");
        records.extend(exported);
    }

    let graph = CausalGraph::build(&args.workflow_id, records);
    out.emit(&graph, || {
        println!(
            "Workflow {}: {} records, {} edges",
            graph.workflow_id.yellow().bold(),
            graph.records.len(),
            graph.edges.len()
        );
        for edge in &graph.edges {
            let arrow = match edge.kind {
                EdgeKind::Local => "→".dimmed(),
                EdgeKind::Remote => "⇒".cyan().bold(),
            };
            println!("  {} {} {}", edge.from, arrow, edge.to);
        }
        if !graph.unmatched.is_empty() {
            println!("{} {} unmatched records:", "!".red().bold(), graph.unmatched.len());
            for record in &graph.unmatched {
                println!("  {}", record.to_string().red());
            }
        }
    })
}

async fn cmd_create(cli: &Cli, out: &Output, args: &CreateArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let definition: EventDefinition = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", args.file.display()))?;

    let node = client(cli, &cli.node)?.create(&definition).await?;
    out.emit(&node, || {
        println!("{} Created {}", "✓".green().bold(), node.key().to_string().yellow());
        print_node(&node);
    })
}

/// Node address and roles for executing `key` as the logged-in user.
fn registry_target(
    directory: &WorkflowDirectory,
    login: &LoginResponse,
    key: &EventKey,
) -> anyhow::Result<(String, Vec<String>)> {
    let Some(entry) = directory.find(&key.event_id) else {
        bail!("workflow {} has no event {}", key.workflow_id, key.event_id);
    };
    let Some(uri) = entry.uri.clone() else {
        bail!("registry lists no node for {key}");
    };
    Ok((uri, login.roles_for(&key.workflow_id).to_vec()))
}

/// `--registry` if given, else the `registry_url` of `--config`.
fn registry_url(args: &ExecuteArgs) -> anyhow::Result<Option<String>> {
    if let Some(url) = &args.registry {
        return Ok(Some(url.clone()));
    }
    let Some(path) = &args.config else {
        return Ok(None);
    };
    match NodeConfig::load(path)?.registry_url {
        Some(url) => Ok(Some(url)),
        None => bail!("{} sets no registry_url", path.display()),
    }
}

async fn cmd_execute(cli: &Cli, out: &Output, args: &ExecuteArgs) -> anyhow::Result<()> {
    let key = event_key(&args.event);
    let (base, roles) = match (registry_url(args)?, &args.user, &args.password) {
        (Some(registry), Some(user), Some(password)) => {
            let registry = RegistryClient::new(registry, Duration::from_millis(cli.timeout_ms))?;
            let login = registry.login(user, password).await?;
            let directory = registry.workflow(&key.workflow_id).await?;
            registry_target(&directory, &login, &key)?
        }
        _ => (cli.node.clone(), args.roles.clone()),
    };

    let response = client(cli, &base)?.execute(&key, roles).await?;
    out.emit(&response, || {
        println!(
            "{} Executed {} at {}",
            "✓".green().bold(),
            key.to_string().yellow().bold(),
            base.blue()
        );
        println!("  History timestamp: {}", response.history_timestamp);
    })
}
