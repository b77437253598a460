//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use navigator_core::{
    BatchProgress, ProfileEdit, draft_email_with, edit_profile, enrich_lead, ingest_rows, run_pending,
    save_email,
};
use navigator_providers::select_providers;
use navigator_shared::{
    AppConfig, EmailTemplate, Lead, LeadFilter, LeadId, ProviderMode, init_config, load_config,
    load_config_from, validate_config,
};
use navigator_storage::Storage;
use tracing::info;

use crate::rows::{RowFormat, read_rows};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Navigator: enrich prospect leads with contact details and outreach drafts.
#[derive(Parser)]
#[command(
    name = "navigator",
    version,
    about = "Enrich prospect leads with contact details, hierarchy and outreach email drafts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.navigator/navigator.toml).
    #[arg(long, global = true, env = "NAVIGATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Lead database path, overriding `defaults.database_path`.
    #[arg(long, global = true, env = "NAVIGATOR_DB")]
    pub db: Option<PathBuf>,

    /// Provider mode, overriding `providers.mode`.
    #[arg(long, global = true)]
    pub providers: Option<ProvidersArg>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Provider mode flag.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ProvidersArg {
    Live,
    Stub,
}

impl From<ProvidersArg> for ProviderMode {
    fn from(arg: ProvidersArg) -> Self {
        match arg {
            ProvidersArg::Live => ProviderMode::Live,
            ProvidersArg::Stub => ProviderMode::Stub,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Import leads from a CSV or JSON file, enriching each row inline.
    Import {
        /// Input file (.csv or .json).
        file: PathBuf,

        /// Input format, when the extension doesn't say.
        #[arg(long)]
        format: Option<RowFormat>,
    },

    /// Enrich one lead, or a batch of pending leads.
    Enrich {
        /// Lead ID to enrich (or retry). Without it, pending leads are processed.
        #[arg(long)]
        lead: Option<String>,

        /// How many pending leads to process (defaults to `defaults.batch_limit`).
        #[arg(long, conflicts_with = "lead")]
        limit: Option<u32>,
    },

    /// Outreach email drafts.
    Email {
        #[command(subcommand)]
        action: EmailAction,
    },

    /// Inspect and manage leads.
    Leads {
        #[command(subcommand)]
        action: LeadsAction,
    },

    /// Free-text notes on leads.
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },

    /// Lead counts per enrichment status.
    Status,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Email subcommands.
#[derive(Subcommand)]
pub(crate) enum EmailAction {
    /// Show the lead's email, generating one if none is stored.
    Draft {
        /// Lead ID.
        lead: String,

        /// Extra context for the prompt.
        #[arg(long)]
        context: Option<String>,

        /// Generate a fresh draft even if one is stored.
        #[arg(long)]
        regenerate: bool,
    },
    /// Replace the stored email with hand-written text.
    Edit {
        /// Lead ID.
        lead: String,

        /// Subject line. Without it the body is stored verbatim.
        #[arg(long)]
        subject: Option<String>,

        /// Email body.
        #[arg(long)]
        body: String,
    },
}

/// Lead listing filters.
#[derive(Args)]
pub(crate) struct ListArgs {
    /// Exact company name.
    #[arg(long)]
    company: Option<String>,

    /// Only leads with an email address.
    #[arg(long, conflicts_with = "unenriched")]
    enriched: bool,

    /// Only leads without an email address.
    #[arg(long)]
    unenriched: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

/// Profile fields to change.
#[derive(Args)]
pub(crate) struct EditArgs {
    /// Lead ID.
    lead: String,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    linkedin_url: Option<String>,

    /// 1st, 2nd or 3rd.
    #[arg(long)]
    connection: Option<String>,
}

impl From<EditArgs> for ProfileEdit {
    fn from(args: EditArgs) -> Self {
        Self {
            name: args.name,
            title: args.title,
            company: args.company,
            location: args.location,
            linkedin_url: args.linkedin_url,
            connection_degree: args.connection,
        }
    }
}

/// Lead subcommands.
#[derive(Subcommand)]
pub(crate) enum LeadsAction {
    /// List leads, newest first.
    List(ListArgs),
    /// Show one lead with its notes.
    Show {
        /// Lead ID.
        lead: String,

        /// Print JSON.
        #[arg(long)]
        json: bool,
    },
    /// Edit profile fields. An empty value clears a field.
    Edit(EditArgs),
    /// Delete a lead and its notes.
    Delete {
        /// Lead ID.
        lead: String,
    },
}

/// Note subcommands.
#[derive(Subcommand)]
pub(crate) enum NotesAction {
    /// Attach a note to a lead.
    Add { lead: String, content: String },
    /// List a lead's notes, newest first.
    List { lead: String },
    /// Replace a note's text.
    Edit { note: String, content: String },
    /// Delete a note.
    Delete { note: String },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "navigator=info",
        1 => "navigator=debug",
        _ => "navigator=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Settings resolution
// ---------------------------------------------------------------------------

/// Config with CLI overrides applied.
struct Settings {
    config: AppConfig,
    db_path: PathBuf,
}

impl Settings {
    fn resolve(config_path: Option<&Path>, db: Option<PathBuf>, providers: Option<ProvidersArg>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        };
        if let Some(mode) = providers {
            config.providers.mode = mode.into();
        }
        validate_config(&config)?;

        let db_path = match db {
            Some(path) => path,
            None => config.defaults.database_path()?,
        };
        Ok(Self { config, db_path })
    }

    async fn storage(&self) -> Result<Storage> {
        Ok(Storage::open(&self.db_path).await?)
    }

    /// Read-only handle when the database exists; otherwise create it.
    async fn storage_for_reading(&self) -> Result<Storage> {
        if self.db_path.exists() {
            Ok(Storage::open_readonly(&self.db_path).await?)
        } else {
            self.storage().await
        }
    }
}

fn parse_lead_id(raw: &str) -> Result<LeadId> {
    raw.parse()
        .map_err(|e| eyre!("invalid lead ID '{raw}': {e}"))
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => {
                let settings = Settings::resolve(cli.config.as_deref(), cli.db, cli.providers)?;
                cmd_config_show(&settings).await
            }
        };
    }

    let settings = Settings::resolve(cli.config.as_deref(), cli.db, cli.providers)?;

    match cli.command {
        Command::Import { file, format } => cmd_import(&settings, &file, format).await,
        Command::Enrich { lead, limit } => cmd_enrich(&settings, lead.as_deref(), limit).await,
        Command::Email { action } => match action {
            EmailAction::Draft {
                lead,
                context,
                regenerate,
            } => cmd_email_draft(&settings, &lead, context, regenerate).await,
            EmailAction::Edit {
                lead,
                subject,
                body,
            } => cmd_email_edit(&settings, &lead, subject.as_deref(), &body).await,
        },
        Command::Leads { action } => match action {
            LeadsAction::List(args) => cmd_leads_list(&settings, &args).await,
            LeadsAction::Show { lead, json } => cmd_leads_show(&settings, &lead, json).await,
            LeadsAction::Edit(args) => cmd_leads_edit(&settings, args).await,
            LeadsAction::Delete { lead } => cmd_leads_delete(&settings, &lead).await,
        },
        Command::Notes { action } => match action {
            NotesAction::Add { lead, content } => cmd_notes_add(&settings, &lead, &content).await,
            NotesAction::List { lead } => cmd_notes_list(&settings, &lead).await,
            NotesAction::Edit { note, content } => cmd_notes_edit(&settings, &note, &content).await,
            NotesAction::Delete { note } => cmd_notes_delete(&settings, &note).await,
        },
        Command::Status => cmd_status(&settings).await,
        Command::Config { .. } => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

async fn cmd_import(settings: &Settings, file: &Path, format: Option<RowFormat>) -> Result<()> {
    let rows = read_rows(file, format)?;
    let providers = select_providers(&settings.config)?;
    let storage = settings.storage().await?;

    info!(file = %file.display(), rows = rows.len(), providers = %providers.describe(), "importing leads");

    let reporter = CliProgress::new();
    let result = ingest_rows(&storage, &providers, &rows, &reporter).await;
    reporter.finish();
    let result = result?;

    println!();
    println!("  Import finished");
    println!("  Total:    {}", result.total_count);
    println!("  Enriched: {}", result.enriched_count);
    println!("  Failed:   {}", result.failed_count);
    for lead in &result.failed_leads {
        println!("    failed  {}  {}", lead.id, lead.name);
    }
    println!();
    Ok(())
}

async fn cmd_enrich(settings: &Settings, lead: Option<&str>, limit: Option<u32>) -> Result<()> {
    let providers = select_providers(&settings.config)?;
    let storage = settings.storage().await?;

    if let Some(raw) = lead {
        let id = parse_lead_id(raw)?;
        let lead = enrich_lead(&storage, &providers, &id).await?;
        println!("Enriched {} ({})", lead.name, lead.id);
        print_lead(&lead);
        return Ok(());
    }

    let limit = limit.unwrap_or(settings.config.defaults.batch_limit);
    let reporter = CliProgress::new();
    let result = run_pending(&storage, &providers, limit, &reporter).await;
    reporter.finish();
    let result = result?;

    println!();
    println!("  Batch finished");
    println!("  Selected:  {}", result.selected_count);
    println!("  Completed: {}", result.processed_count);
    println!("  Failed:    {}", result.failed.len());
    for failed in &result.failed {
        println!("    failed  {}  {}: {}", failed.id, failed.name, failed.error);
    }
    println!();
    Ok(())
}

async fn cmd_email_draft(
    settings: &Settings,
    lead: &str,
    context: Option<String>,
    regenerate: bool,
) -> Result<()> {
    let id = parse_lead_id(lead)?;
    let storage = settings.storage().await?;

    let draft = draft_email_with(
        &storage,
        || select_providers(&settings.config),
        &id,
        context,
        regenerate,
    )
    .await?;

    if draft.regenerated {
        info!(lead_id = %id, "new draft stored");
    }
    print_template(&draft.template);
    Ok(())
}

async fn cmd_email_edit(
    settings: &Settings,
    lead: &str,
    subject: Option<&str>,
    body: &str,
) -> Result<()> {
    let id = parse_lead_id(lead)?;
    let storage = settings.storage().await?;
    let lead = save_email(&storage, &id, subject, body).await?;
    println!("Saved email for {} ({})", lead.name, lead.id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Lead and note commands
// ---------------------------------------------------------------------------

async fn cmd_leads_list(settings: &Settings, args: &ListArgs) -> Result<()> {
    let storage = settings.storage_for_reading().await?;
    let filter = LeadFilter {
        company: args.company.clone(),
        enriched: match (args.enriched, args.unenriched) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
    };
    let leads = storage.list_leads(&filter).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&leads)?);
        return Ok(());
    }

    if leads.is_empty() {
        println!("No leads.");
        return Ok(());
    }
    println!(
        "{:<36}  {:<9}  {:<24}  {:<24}  {:>5}",
        "ID", "STATUS", "NAME", "COMPANY", "NOTES"
    );
    for summary in &leads {
        let lead = &summary.lead;
        println!(
            "{:<36}  {:<9}  {:<24}  {:<24}  {:>5}",
            lead.id,
            lead.enrichment_status,
            truncate(&lead.name, 24),
            truncate(lead.company.as_deref().unwrap_or("-"), 24),
            summary.note_count
        );
    }
    Ok(())
}

async fn cmd_leads_show(settings: &Settings, lead: &str, json: bool) -> Result<()> {
    let id = parse_lead_id(lead)?;
    let storage = settings.storage_for_reading().await?;
    let lead = storage.find_lead(&id).await?;
    let notes = storage.list_notes(&id).await?;

    if json {
        let value = serde_json::json!({ "lead": lead, "notes": notes });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_lead(&lead);
    if let Some(template) = lead.email_template.as_deref() {
        println!();
        print_template(&EmailTemplate::parse(template));
    }
    if !notes.is_empty() {
        println!();
        println!("Notes:");
        for note in &notes {
            println!("  [{}] {}  {}", note.created_at.format("%Y-%m-%d %H:%M"), note.id, note.content);
        }
    }
    Ok(())
}

async fn cmd_leads_edit(settings: &Settings, args: EditArgs) -> Result<()> {
    let id = parse_lead_id(&args.lead)?;
    let storage = settings.storage().await?;
    let lead = edit_profile(&storage, &id, args.into()).await?;
    println!("Updated {} ({})", lead.name, lead.id);
    print_lead(&lead);
    Ok(())
}

async fn cmd_leads_delete(settings: &Settings, lead: &str) -> Result<()> {
    let id = parse_lead_id(lead)?;
    let storage = settings.storage().await?;
    storage.delete_lead(&id).await?;
    println!("Deleted lead {id}");
    Ok(())
}

async fn cmd_notes_add(settings: &Settings, lead: &str, content: &str) -> Result<()> {
    let id = parse_lead_id(lead)?;
    let storage = settings.storage().await?;
    let note = storage.insert_note(&id, content).await?;
    println!("Added note {}", note.id);
    Ok(())
}

async fn cmd_notes_list(settings: &Settings, lead: &str) -> Result<()> {
    let id = parse_lead_id(lead)?;
    let storage = settings.storage_for_reading().await?;
    // Unknown leads are an error, not an empty list
    storage.find_lead(&id).await?;
    let notes = storage.list_notes(&id).await?;
    if notes.is_empty() {
        println!("No notes.");
    }
    for note in &notes {
        println!("[{}] {}  {}", note.created_at.format("%Y-%m-%d %H:%M"), note.id, note.content);
    }
    Ok(())
}

async fn cmd_notes_edit(settings: &Settings, note: &str, content: &str) -> Result<()> {
    let storage = settings.storage().await?;
    let note = storage.update_note(note, content).await?;
    println!("Updated note {}", note.id);
    Ok(())
}

async fn cmd_notes_delete(settings: &Settings, note: &str) -> Result<()> {
    let storage = settings.storage().await?;
    storage.delete_note(note).await?;
    println!("Deleted note {note}");
    Ok(())
}

async fn cmd_status(settings: &Settings) -> Result<()> {
    let storage = settings.storage_for_reading().await?;
    let counts = storage.count_by_status().await?;
    println!("  Database:  {}", settings.db_path.display());
    println!("  Pending:   {}", counts.pending);
    println!("  Completed: {}", counts.completed);
    println!("  Failed:    {}", counts.failed);
    println!("  Total:     {}", counts.total());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(settings: &Settings) -> Result<()> {
    let toml_str = toml::to_string_pretty(&settings.config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn print_lead(lead: &Lead) {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    println!("  ID:         {}", lead.id);
    println!("  Name:       {}", lead.name);
    println!("  Title:      {}", field(&lead.title));
    println!("  Company:    {}", field(&lead.company));
    println!("  Location:   {}", field(&lead.location));
    println!("  LinkedIn:   {}", field(&lead.linkedin_url));
    println!(
        "  Connection: {}",
        lead.connection_degree.map_or("-".into(), |d| d.to_string())
    );
    println!("  Email:      {}", field(&lead.email));
    println!("  Phone:      {}", field(&lead.phone));
    println!("  Hierarchy:  {}", field(&lead.hierarchy));
    println!("  Status:     {}", lead.enrichment_status);
    println!("  Attempts:   {}", lead.enrichment_attempts);
    if let Some(at) = lead.enriched_at {
        println!("  Enriched:   {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}

fn print_template(template: &EmailTemplate) {
    if !template.subject.is_empty() {
        println!("Subject: {}", template.subject);
        println!();
    }
    println!("{}", template.body);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl BatchProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_progress(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("Enriching [{current}/{total}] {detail}"));
    }
}
