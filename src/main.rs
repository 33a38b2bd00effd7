//! ldconsole - a terminal console for NGSI-LD entity documents.
//!
//! # Usage
//!
//! ```bash
//! ldconsole entity.json
//! ldconsole --schema room.schema.json --watch rooms/*.json
//! ldconsole --check --schema room.schema.json rooms/*.json
//! ldconsole --broker http://localhost:1026 --id urn:ngsi-ld:Room:1
//! ldconsole --broker http://localhost:1026 --request create entity.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use ldconsole::app::App;
use ldconsole::broker::{BrokerClient, BrokerLink, BrokerRequest, EntityQuery, Session};
use ldconsole::config::{
    ConfigFlags, ThemeMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use ldconsole::editor::{EditorOptions, FieldKind, FormRenderable, JsonEditor, Operation};
use ldconsole::highlight::{HighlightBackground, set_background_mode};
use ldconsole::perf;
use ldconsole::validate::Validator;

/// One-shot broker operation for `--request`.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    List,
    Get,
    Create,
    Replace,
    Update,
    Delete,
}

/// A terminal console for inspecting and editing NGSI-LD entity documents
#[derive(Parser, Debug)]
#[command(name = "ldconsole", version, about, long_about = None)]
struct Cli {
    /// JSON documents to open, one tab each
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// JSON Schema every document is validated against
    #[arg(long, value_name = "PATH")]
    schema: Option<PathBuf>,

    /// Start array documents in the table view
    #[arg(long)]
    table: bool,

    /// Show line numbers (and error marks) in the gutter
    #[arg(long)]
    line_numbers: bool,

    /// Hide the action toolbar
    #[arg(long)]
    no_toolbar: bool,

    /// Force highlight colors for a light or dark terminal
    #[arg(long, value_enum, default_value = "auto")]
    theme: ThemeMode,

    /// Watch open files and reload them when they change
    #[arg(short, long)]
    watch: bool,

    /// Open documents read-only
    #[arg(long)]
    read_only: bool,

    /// Allow the entity id to be changed through field edits
    #[arg(long)]
    allow_id_edit: bool,

    /// Validate the files and print errors as file:line:column: message
    #[arg(long)]
    check: bool,

    /// Print each entity's fields instead of opening the editor
    #[arg(long)]
    fields: bool,

    /// Set an entity field and save the file (repeatable)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Context broker to load entities from and save them to
    #[arg(long, value_name = "URL")]
    broker: Option<String>,

    /// Send one request to the broker and print the answer instead of
    /// opening the editor
    #[arg(long, value_enum, requires = "broker")]
    request: Option<RequestKind>,

    /// With --request, print the request without sending it
    #[arg(long, requires = "request")]
    dry_run: bool,

    /// Tenant sent with broker requests
    #[arg(long, requires = "broker")]
    tenant: Option<String>,

    /// Entity to open from the broker (repeatable); with --request, the id
    /// for get, update and delete (defaults to the document's id)
    #[arg(long, requires = "broker")]
    id: Vec<String>,

    /// Entity type filter for list requests
    #[arg(long = "type", value_name = "TYPE", requires = "broker")]
    entity_type: Option<String>,

    /// Page size for list requests
    #[arg(long, requires = "broker")]
    limit: Option<u32>,

    /// Enable startup performance logging
    #[arg(long)]
    perf: bool,

    /// Write detailed editor loop events to a file
    #[arg(long, value_name = "PATH")]
    debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn load_schema(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    let schema: Value = serde_json::from_str(&text)
        .with_context(|| format!("Schema {} is not valid JSON", path.display()))?;
    if let Some(err) = Validator::compile_error(&schema) {
        eprintln!("[warn] Schema {} cannot be used: {err}", path.display());
    }
    Ok(schema)
}

/// Validate every file; returns whether all passed.
fn run_check(files: &[PathBuf], schema: Option<&Value>) -> Result<bool> {
    let _scope = perf::scope("check.total");
    let validator = Validator::new(schema);
    let mut all_valid = true;
    for path in files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let report = validator.validate_text(&text);
        if let Some(warning) = &report.warning {
            eprintln!("{}: warning: {warning}", path.display());
        }
        for error in &report.errors {
            match error.position {
                Some(p) => println!("{}:{}:{}: {}", path.display(), p.line, p.column, error.message),
                None => println!("{}: {}", path.display(), error.describe()),
            }
        }
        all_valid &= report.is_valid;
    }
    Ok(all_valid)
}

const fn kind_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Id => "id",
        FieldKind::Type => "type",
        FieldKind::Property => "Property",
        FieldKind::Relationship => "Relationship",
        FieldKind::GeoProperty => "GeoProperty",
        FieldKind::Other => "-",
    }
}

/// Apply `--set` edits, save when anything changed, then list the fields.
fn run_fields(files: &[PathBuf], options: &EditorOptions, sets: &[String]) -> Result<()> {
    for path in files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut editor = JsonEditor::new(options.clone().with_initial_value(text));
        for assignment in sets {
            let (name, value) = assignment
                .split_once('=')
                .with_context(|| format!("Expected NAME=VALUE, got {assignment}"))?;
            editor
                .set_form_field(name, value, 0)
                .with_context(|| format!("Cannot set {name} in {}", path.display()))?;
        }
        if !sets.is_empty() {
            let saved = editor
                .save()
                .with_context(|| format!("Not saving {}", path.display()))?;
            fs::write(path, saved).with_context(|| format!("Failed to write {}", path.display()))?;
        }

        println!("{}", path.display());
        let fields = editor
            .form_fields()
            .with_context(|| format!("{} is not an entity", path.display()))?;
        for field in fields {
            let lock = if field.editable { "" } else { " (read-only)" };
            println!(
                "  {:<24} {:<13} {}{lock}",
                field.name,
                kind_label(field.kind),
                field.display
            );
        }
    }
    Ok(())
}

fn build_request(cli: &Cli, kind: RequestKind, client: &BrokerClient) -> Result<BrokerRequest> {
    let body = cli
        .files
        .first()
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .transpose()?;
    let document_id = body
        .as_deref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| v.get("id").and_then(Value::as_str).map(str::to_string));
    let id = cli.id.first().cloned().or(document_id);
    let need_id = || id.as_deref().context("An entity id is required (--id or a document with \"id\")");
    let need_body = || body.as_deref().context("A document file is required for this request");

    let request = match kind {
        RequestKind::List => client.list(&EntityQuery {
            entity_type: cli.entity_type.clone(),
            limit: cli.limit,
            ..EntityQuery::default()
        }),
        RequestKind::Get => client.get(need_id()?),
        RequestKind::Create => client.create(need_body()?)?,
        RequestKind::Replace => client.replace(need_body()?)?,
        RequestKind::Update => client.update_attrs(need_id()?, need_body()?)?,
        RequestKind::Delete => client.delete(need_id()?),
    };
    Ok(request)
}

/// Send one request and print the answer, pretty-printed when it is JSON.
fn run_request(link: &BrokerLink, request: &BrokerRequest) -> Result<()> {
    let response = link.execute(request).context("Broker request failed")?;
    eprintln!("{} {}", request.method.as_str(), response.status);
    match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) if response.body.is_empty() => {}
        Err(_) => println!("{}", response.body),
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let debug_log_path = effective
        .debug_log
        .clone()
        .or_else(|| std::env::var_os("LDCONSOLE_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(debug_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize debug log {}: {}",
            debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    match effective.theme.unwrap_or(ThemeMode::Auto) {
        ThemeMode::Auto => set_background_mode(None),
        ThemeMode::Light => set_background_mode(Some(HighlightBackground::Light)),
        ThemeMode::Dark => set_background_mode(Some(HighlightBackground::Dark)),
    }

    let schema = effective.schema.as_deref().map(load_schema).transpose()?;

    let broker = cli
        .broker
        .as_deref()
        .map(|base| {
            let token = std::env::var("LDCONSOLE_TOKEN").ok();
            BrokerClient::new(base, Session::new(token, cli.tenant.clone()))
                .with_context(|| format!("Cannot use broker {base}"))
        })
        .transpose()?;

    if let (Some(client), Some(kind)) = (broker.as_ref(), cli.request) {
        let request = build_request(&cli, kind, client).context("Cannot build broker request")?;
        if cli.dry_run {
            print!("{}", request.render());
            return Ok(());
        }
        return run_request(&BrokerLink::http(client.clone()), &request);
    }

    if cli.check {
        if cli.files.is_empty() {
            anyhow::bail!("--check needs at least one file");
        }
        if !run_check(&cli.files, schema.as_ref())? {
            std::process::exit(1);
        }
        return Ok(());
    }

    let operation = if cli.read_only {
        Operation::View
    } else {
        Operation::Update
    };
    let mut options = EditorOptions::default()
        .with_schema(schema)
        .with_line_numbers(effective.line_numbers)
        .with_toolbar(!effective.no_toolbar)
        .with_table_capable(effective.table)
        .with_operation(operation);
    options.allow_entity_id_edit = cli.allow_id_edit;

    if cli.fields || !cli.set.is_empty() {
        return run_fields(&cli.files, &options, &cli.set);
    }

    // Run the application
    let mut app = App::new(cli.files)
        .with_editor_options(options)
        .with_entities(cli.id)
        .with_watch(effective.watch)
        .with_config_paths(
            Some(global_path),
            if local_path.exists() {
                Some(local_path)
            } else {
                None
            },
        );

    if let Some(client) = broker {
        app = app.with_broker(BrokerLink::http(client));
    }

    app.run().context("Application error")
}
