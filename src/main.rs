use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use notiflow::api::{Collaborators, EnvironmentProvider, InMemoryBackend, JsonFileRepository, TemplateRepository};
use notiflow::config::Config;
use notiflow::editor::{email_body, EditorSession, SessionOptions, SubmitOutcome};
use notiflow::logging;
use notiflow::snippet::SnippetLanguage;
use notiflow::steps::DraftEdit;
use notiflow::templates::schema::{
    EmailEditorMode, Environment, StepContent, StepId, StepType, TemplateId, TextAlign, TimeUnit,
};
use notiflow::validation::ValidationResult;

#[derive(Parser)]
#[command(name = "notiflow")]
#[command(about = "Edit notification workflow templates")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Environment to work in (development, production)
    #[arg(short, long)]
    env: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and save a new template
    Create {
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// List templates of the environment
    List,

    /// Show a template's steps and field errors
    Show { template: String },

    /// Add a step, optionally filling its fields
    AddStep {
        template: String,

        /// Step type (in_app, email, sms, push, chat, digest, delay)
        #[arg(value_name = "TYPE")]
        step_type: String,

        /// 1-based position (default: end)
        #[arg(long)]
        at: Option<usize>,

        /// Field edits as key=value (subject, body, html, mode, align, text,
        /// title, amount, unit, use_feeds, feed)
        #[arg(short, long = "set")]
        set: Vec<String>,
    },

    /// Edit a step's fields
    Edit {
        template: String,

        /// Step id or 1-based position
        step: String,

        #[arg(short, long = "set", required = true)]
        set: Vec<String>,
    },

    /// Flip a step's active flag
    ToggleStep { template: String, step: String },

    /// Delete a step
    DeleteStep {
        template: String,
        step: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Check a template for field errors
    Validate { template: String },

    /// Print the trigger snippet
    Snippet {
        template: String,

        /// node or curl (default from config)
        #[arg(short, long)]
        lang: Option<String>,
    },
}

/// One `--set key=value` argument
#[derive(Debug, PartialEq)]
enum FieldSet {
    Draft(DraftEdit),
    /// Feed by 1-based catalog position
    Feed(usize),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(env) = cli.env.as_deref() {
        config.editor.environment =
            Environment::from_key(env).ok_or_else(|| anyhow!("Unknown environment: {}", env))?;
    }

    let logging_handle = logging::init_logging(&config, cli.debug)?;
    let collaborators = collaborators(&config).await?;

    match cli.command {
        Commands::Create { name, description } => {
            cmd_create(&config, collaborators, &name, description).await?;
        }
        Commands::List => {
            cmd_list(&config, collaborators).await?;
        }
        Commands::Show { template } => {
            cmd_show(&config, collaborators, &template).await?;
        }
        Commands::AddStep {
            template,
            step_type,
            at,
            set,
        } => {
            cmd_add_step(&config, collaborators, &template, &step_type, at, &set).await?;
        }
        Commands::Edit { template, step, set } => {
            cmd_edit(&config, collaborators, &template, &step, &set).await?;
        }
        Commands::ToggleStep { template, step } => {
            cmd_toggle_step(&config, collaborators, &template, &step).await?;
        }
        Commands::DeleteStep {
            template,
            step,
            yes,
        } => {
            cmd_delete_step(&config, collaborators, &template, &step, yes).await?;
        }
        Commands::Validate { template } => {
            cmd_validate(&config, collaborators, &template).await?;
        }
        Commands::Snippet { template, lang } => {
            cmd_snippet(&config, collaborators, &template, lang).await?;
        }
    }

    if let Some(log_path) = logging_handle.log_file_path {
        tracing::debug!(path = %log_path.display(), "Session log written");
    }

    Ok(())
}

/// File-backed templates and feeds; environment and assets stay in memory
async fn collaborators(config: &Config) -> Result<Collaborators> {
    let local = Arc::new(InMemoryBackend::new());
    local
        .switch_environment(config.editor.environment)
        .await
        .context("Failed to select environment")?;

    let store = Arc::new(JsonFileRepository::new(config.store_path()));
    let mut collaborators = Collaborators::in_memory(local).with_templates(store.clone());
    collaborators.feeds = store;
    Ok(collaborators)
}

async fn load(config: &Config, collaborators: Collaborators, id: &str) -> Result<EditorSession> {
    EditorSession::load(
        collaborators,
        &TemplateId(id.to_string()),
        SessionOptions::from_config(config),
    )
    .await
    .with_context(|| format!("Failed to open template {}", id))
}

async fn cmd_create(
    config: &Config,
    collaborators: Collaborators,
    name: &str,
    description: Option<String>,
) -> Result<()> {
    let mut session =
        EditorSession::create(collaborators, name, SessionOptions::from_config(config)).await?;
    if let Some(description) = description {
        session.set_description(&description)?;
    }
    save(&mut session).await
}

async fn cmd_list(config: &Config, collaborators: Collaborators) -> Result<()> {
    let environment = config.editor.environment;
    let templates = collaborators.templates.list_templates(environment).await?;

    if templates.is_empty() {
        println!("No templates in {}", environment);
        return Ok(());
    }

    println!("Templates in {} ({})", environment, templates.len());
    println!("{}", "─".repeat(60));
    for template in &templates {
        let id = template.id.as_ref().map(|id| id.0.as_str()).unwrap_or("-");
        println!(
            "{}  {} [{}] {} step(s)",
            id,
            template.name,
            template.status_label(),
            template.steps.len()
        );
    }
    Ok(())
}

async fn cmd_show(config: &Config, collaborators: Collaborators, id: &str) -> Result<()> {
    let session = load(config, collaborators, id).await?;
    let template = session.template();
    let validation = session.validation();

    println!("{} ({})", template.name, template.status_label());
    println!("  Trigger:     {}", template.trigger_identifier);
    if !template.description.is_empty() {
        println!("  Description: {}", template.description);
    }
    println!("{}", "─".repeat(60));

    for step in &template.steps {
        let marker = if validation.step_has_errors(&step.id) {
            "!"
        } else {
            " "
        };
        println!(
            "{} {}. {} [{}] {}",
            marker,
            step.order + 1,
            step.step_type().display_name(),
            step.status_label(),
            step.id
        );
        match &step.content {
            StepContent::Email(email) => {
                println!("       subject: {}", email.subject);
                if let Some(body) = email_body(step) {
                    println!("       body:    {}", body);
                }
            }
            StepContent::InApp(in_app) => println!("       text:    {}", in_app.text),
            StepContent::Sms(text) | StepContent::Chat(text) => {
                println!("       text:    {}", text.text)
            }
            StepContent::Push(push) => {
                println!("       title:   {}", push.title);
                println!("       text:    {}", push.text);
            }
            StepContent::Digest(wait) | StepContent::Delay(wait) => {
                println!("       wait:    {} {:?}", wait.amount, wait.unit)
            }
        }
    }

    print_validation(&validation);
    Ok(())
}

async fn cmd_add_step(
    config: &Config,
    collaborators: Collaborators,
    id: &str,
    step_type: &str,
    at: Option<usize>,
    set: &[String],
) -> Result<()> {
    let step_type =
        StepType::from_key(step_type).ok_or_else(|| anyhow!("Unknown step type: {}", step_type))?;
    let mut session = load(config, collaborators, id).await?;

    let index = match at {
        Some(0) => bail!("Positions start at 1"),
        Some(position) => position - 1,
        None => session.template().step_count(),
    };
    let step_id = session.insert_step(step_type, index)?;
    apply_edits(&mut session, &step_id, set)?;
    save(&mut session).await
}

async fn cmd_edit(
    config: &Config,
    collaborators: Collaborators,
    id: &str,
    step: &str,
    set: &[String],
) -> Result<()> {
    let mut session = load(config, collaborators, id).await?;
    let step_id = resolve_step(&session, step)?;
    apply_edits(&mut session, &step_id, set)?;
    save(&mut session).await
}

async fn cmd_toggle_step(
    config: &Config,
    collaborators: Collaborators,
    id: &str,
    step: &str,
) -> Result<()> {
    let mut session = load(config, collaborators, id).await?;
    let step_id = resolve_step(&session, step)?;
    session.toggle_step_active(&step_id)?;
    println!("{}", session.step(&step_id)?.status_label());
    save(&mut session).await
}

async fn cmd_delete_step(
    config: &Config,
    collaborators: Collaborators,
    id: &str,
    step: &str,
    skip_confirm: bool,
) -> Result<()> {
    let mut session = load(config, collaborators, id).await?;
    let step_id = resolve_step(&session, step)?;

    if session.request_delete_step(&step_id)?.is_none() {
        if !skip_confirm {
            let step = session.step(&step_id)?;
            println!(
                "Delete step {}. {} ({})?",
                step.order + 1,
                step.step_type().display_name(),
                step.id
            );
            print!("Confirm? [y/N] ");

            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                session.cancel()?;
                println!("Cancelled");
                return Ok(());
            }
        }
        session.confirm()?;
    }

    println!("Deleted step {}", step_id);
    save(&mut session).await
}

async fn cmd_validate(config: &Config, collaborators: Collaborators, id: &str) -> Result<()> {
    let session = load(config, collaborators, id).await?;
    let validation = session.validation();
    print_validation(&validation);
    if !validation.is_valid() {
        bail!("Template {} has field errors", id);
    }
    Ok(())
}

async fn cmd_snippet(
    config: &Config,
    collaborators: Collaborators,
    id: &str,
    lang: Option<String>,
) -> Result<()> {
    let session = load(config, collaborators, id).await?;
    let language = match lang.as_deref() {
        Some(key) => {
            SnippetLanguage::from_key(key).ok_or_else(|| anyhow!("Unknown language: {}", key))?
        }
        None => config.snippet.language,
    };
    let snippet = session.snippet_as(language)?;
    print!("{}", snippet.code);
    Ok(())
}

async fn save(session: &mut EditorSession) -> Result<()> {
    match session.submit().await? {
        SubmitOutcome::Saved { id, snippet } => {
            println!("Saved template {} in {}", id, session.environment());
            println!();
            print!("{}", snippet.code);
            Ok(())
        }
        SubmitOutcome::Invalid(validation) => {
            print_validation(&validation);
            bail!("Not saved: template has field errors")
        }
    }
}

fn print_validation(validation: &ValidationResult) {
    if validation.is_valid() {
        println!("No field errors");
        return;
    }
    let badges = validation.badges();
    if badges.settings {
        let fields: Vec<&str> = validation.template_errors.iter().map(|f| f.as_str()).collect();
        println!("Settings: {}", fields.join(", "));
    }
    for (step_id, fields) in &validation.step_errors {
        let fields: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
        println!("Step {}: {}", step_id, fields.join(", "));
    }
}

/// Step id, or 1-based position in the graph
fn resolve_step(session: &EditorSession, key: &str) -> Result<StepId> {
    let steps = &session.template().steps;
    if let Ok(position) = key.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| steps.get(index))
            .map(|step| step.id.clone())
            .ok_or_else(|| anyhow!("No step at position {}", position));
    }
    let step_id = StepId(key.to_string());
    session.step(&step_id)?;
    Ok(step_id)
}

fn apply_edits(session: &mut EditorSession, step_id: &StepId, set: &[String]) -> Result<()> {
    if set.is_empty() {
        return Ok(());
    }
    session.open_step(step_id)?;
    for arg in set {
        match parse_field(arg)? {
            FieldSet::Draft(edit) => session.edit(edit)?,
            FieldSet::Feed(index) => {
                session.edit(DraftEdit::UseFeeds(true))?;
                session.select_feed_by_index(index, true)?;
            }
        }
    }
    session.go_back()?;
    Ok(())
}

fn parse_field(arg: &str) -> Result<FieldSet> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected key=value, got '{}'", arg))?;
    let value = value.to_string();

    let edit = match key.trim() {
        "subject" => DraftEdit::Subject(value),
        "body" => DraftEdit::BlockText {
            index: 0,
            text: value,
        },
        "html" => DraftEdit::Html(value),
        "mode" => DraftEdit::EditorMode(match value.as_str() {
            "visual" => EmailEditorMode::Visual,
            "code" | "custom_code" | "html" => EmailEditorMode::CustomCode,
            other => bail!("Unknown editor mode: {}", other),
        }),
        "align" => DraftEdit::BlockAlign {
            index: 0,
            align: match value.as_str() {
                "left" => TextAlign::Left,
                "center" => TextAlign::Center,
                "right" => TextAlign::Right,
                other => bail!("Unknown alignment: {}", other),
            },
        },
        "text" => DraftEdit::Text(value),
        "title" => DraftEdit::Title(value),
        "amount" => DraftEdit::Amount(
            value
                .parse()
                .with_context(|| format!("Invalid amount: {}", value))?,
        ),
        "unit" => DraftEdit::Unit(match value.as_str() {
            "seconds" => TimeUnit::Seconds,
            "minutes" => TimeUnit::Minutes,
            "hours" => TimeUnit::Hours,
            "days" => TimeUnit::Days,
            other => bail!("Unknown time unit: {}", other),
        }),
        "use_feeds" => DraftEdit::UseFeeds(
            value
                .parse()
                .with_context(|| format!("Expected true or false, got {}", value))?,
        ),
        "feed" => {
            let index = value
                .parse()
                .with_context(|| format!("Invalid feed number: {}", value))?;
            return Ok(FieldSet::Feed(index));
        }
        other => bail!("Unknown field: {}", other),
    };
    Ok(FieldSet::Draft(edit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_edits() {
        assert_eq!(
            parse_field("subject=Hello {{name}}").unwrap(),
            FieldSet::Draft(DraftEdit::Subject("Hello {{name}}".into()))
        );
        assert_eq!(
            parse_field("text=a=b").unwrap(),
            FieldSet::Draft(DraftEdit::Text("a=b".into()))
        );
        assert_eq!(
            parse_field("mode=code").unwrap(),
            FieldSet::Draft(DraftEdit::EditorMode(EmailEditorMode::CustomCode))
        );
        assert_eq!(parse_field("feed=2").unwrap(), FieldSet::Feed(2));
    }

    #[test]
    fn test_parse_field_rejects_unknown() {
        assert!(parse_field("nothing").is_err());
        assert!(parse_field("colour=red").is_err());
        assert!(parse_field("amount=soon").is_err());
        assert!(parse_field("unit=weeks").is_err());
    }
}
