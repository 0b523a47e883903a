// crates/consentpro-cli/src/main.rs
// ============================================================================
// Module: ConsentPro CLI Entry Point
// Description: Command dispatcher for the public consent form client.
// Purpose: Run the consent flow from a terminal and expose backend calls.
// Dependencies: clap, consentpro-client, consentpro-config, consentpro-core,
//               serde, serde_jcs, thiserror, tokio
// ============================================================================

//! ## Overview
//! The `consentpro` binary drives the public consent form interactively and
//! exposes the individual backend calls for operators. All user-facing
//! strings are routed through the i18n catalog. Backend responses are
//! untrusted and are only rendered, never executed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap::builder::NonEmptyStringValueParser;
use consentpro_cli::i18n::Locale;
use consentpro_cli::i18n::set_locale;
use consentpro_cli::render::form_lines;
use consentpro_cli::render::lookup_lines;
use consentpro_cli::render::pending_lines;
use consentpro_cli::render::summary_lines;
use consentpro_cli::t;
use consentpro_cli::terminal::TerminalHost;
use consentpro_cli::terminal::TerminalNotifier;
use consentpro_cli::wizard::WizardOutcome;
use consentpro_cli::wizard::run_wizard;
use consentpro_client::HttpApi;
use consentpro_config::ConsentProConfig;
use consentpro_core::FlowDeps;
use consentpro_core::FlowStep;
use consentpro_core::FormApi;
use consentpro_core::FormToken;
use consentpro_core::NationalId;
use consentpro_core::PageLocation;
use consentpro_core::PublicFormFlow;
use consentpro_core::SessionId;
use consentpro_core::VerificationApi;
use consentpro_core::VerificationToken;
use serde::Serialize;
use thiserror::Error;
use tokio::io::BufReader;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "CONSENTPRO_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "consentpro", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `CONSENTPRO_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Config file path (overrides `CONSENTPRO_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Backend base URL (overrides `api.base_url`).
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Public form inspection.
    Form {
        /// Selected form subcommand.
        #[command(subcommand)]
        command: FormCommand,
    },
    /// Interactive consent flow.
    Flow {
        /// Selected flow subcommand.
        #[command(subcommand)]
        command: FlowCommand,
    },
    /// Biometric provider operations.
    Didit {
        /// Selected provider subcommand.
        #[command(subcommand)]
        command: DiditCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Form subcommands.
#[derive(Subcommand, Debug)]
enum FormCommand {
    /// Print a public form and its consent items.
    Show(FormShowCommand),
    /// Look up a client by national ID within a form.
    Lookup(FormLookupCommand),
}

/// Arguments for `form show`.
#[derive(Args, Debug)]
struct FormShowCommand {
    /// Public form token.
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    token: String,
    /// Print canonical JSON instead of text.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Arguments for `form lookup`.
#[derive(Args, Debug)]
struct FormLookupCommand {
    /// Public form token.
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    token: String,
    /// Ten-digit national ID.
    #[arg(long)]
    cedula: String,
    /// Print canonical JSON instead of text.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Flow subcommands.
#[derive(Subcommand, Debug)]
enum FlowCommand {
    /// Walk through the form interactively.
    Run(FlowRunCommand),
    /// Complete a flow from a biometric provider return URL.
    Resume(FlowResumeCommand),
}

/// Arguments for `flow run`.
#[derive(Args, Debug)]
struct FlowRunCommand {
    /// Public form page URL.
    #[arg(long, conflicts_with = "token", required_unless_present = "token")]
    url: Option<String>,
    /// Public form token.
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    token: Option<String>,
}

/// Arguments for `flow resume`.
#[derive(Args, Debug)]
struct FlowResumeCommand {
    /// Page URL the provider returned to.
    #[arg(long)]
    url: String,
}

/// Provider subcommands.
#[derive(Subcommand, Debug)]
enum DiditCommand {
    /// Print the status of a provider session.
    Status {
        /// Provider session identifier.
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        session: String,
    },
    /// Create a provider session for a verification token.
    CreateSession {
        /// Verification token of the registration.
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        token: String,
        /// Request the premium tier.
        #[arg(long, action = ArgAction::SetTrue)]
        premium: bool,
    },
    /// List clients verified but not yet completed.
    Pending {
        /// Print canonical JSON instead of text.
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Complete the process of a verified client.
    Complete {
        /// Verification token of the registration.
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        token: String,
    },
    /// Resend the authorization documents of a client.
    ResendDocuments {
        /// Verification token of the registration.
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        token: String,
    },
    /// Print the public provider configuration.
    Config,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the resolved configuration.
    Validate,
}

/// Supported CLI languages.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum LangArg {
    /// Spanish.
    Es,
    /// English.
    En,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::Es => Self::Es,
            LangArg::En => Self::En,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Localized error message.
    message: String,
}

impl CliError {
    /// Creates a new CLI error with the provided message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let loaded = ConsentProConfig::load(cli.config.as_deref());
    let env_lang = std::env::var(LANG_ENV).ok();
    let config_lang = loaded.as_ref().ok().and_then(|config| config.locale.locale());
    let locale = resolve_locale(cli.lang, config_lang, env_lang.as_deref())?;
    set_locale(locale);

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let mut config =
        loaded.map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
        config.validate().map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    }

    match command {
        Commands::Form {
            command,
        } => command_form(&config, command).await,
        Commands::Flow {
            command,
        } => command_flow(&config, command).await,
        Commands::Didit {
            command,
        } => command_didit(&config, command).await,
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Resolves the CLI locale from flags, environment, or config.
fn resolve_locale(
    lang: Option<LangArg>,
    config_lang: Option<Locale>,
    env_lang: Option<&str>,
) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(config_lang.unwrap_or_default())
}

// ============================================================================
// SECTION: Form Commands
// ============================================================================

/// Dispatches form subcommands.
async fn command_form(config: &ConsentProConfig, command: FormCommand) -> CliResult<ExitCode> {
    let api = build_api(config)?;
    match command {
        FormCommand::Show(command) => {
            let form = api
                .fetch_form(&FormToken::new(command.token))
                .await
                .map_err(|err| CliError::new(t!("api.call_failed", error = err)))?;
            if command.json {
                write_json(&form)?;
            } else {
                write_lines(&form_lines(&form, api.endpoints()))?;
            }
        }
        FormCommand::Lookup(command) => {
            let national_id = NationalId::parse(&command.cedula).map_err(|_| {
                CliError::new(t!("input.national_id_invalid", value = command.cedula))
            })?;
            let lookup = api
                .find_client(&FormToken::new(command.token), &national_id)
                .await
                .map_err(|err| CliError::new(t!("api.call_failed", error = err)))?;
            if command.json {
                write_json(&lookup)?;
            } else {
                write_lines(&lookup_lines(&lookup))?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Flow Commands
// ============================================================================

/// Dispatches flow subcommands.
async fn command_flow(config: &ConsentProConfig, command: FlowCommand) -> CliResult<ExitCode> {
    match command {
        FlowCommand::Run(command) => {
            let location = match (command.url, command.token) {
                (Some(url), _) => parse_location(&url)?,
                (None, Some(token)) => PageLocation::from_token(&token),
                (None, None) => PageLocation::default(),
            };
            command_flow_run(config, &location).await
        }
        FlowCommand::Resume(command) => {
            let location = parse_location(&command.url)?;
            if location.biometric_return().is_none() {
                return Err(CliError::new(t!("resume.no_return")));
            }
            command_flow_resume(config, &location).await
        }
    }
}

/// Runs the interactive wizard on stdin and stdout.
async fn command_flow_run(
    config: &ConsentProConfig,
    location: &PageLocation,
) -> CliResult<ExitCode> {
    let (flow, host) = build_flow(config)?;
    if let Err(err) = flow.open(location).await {
        flow.teardown();
        return Err(CliError::new(t!("flow.open_failed", error = err)));
    }
    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();
    let outcome = run_wizard(&flow, &mut input, &mut output).await;
    if matches!(outcome, Ok(WizardOutcome::Abandoned)) && host.would_confirm_unload() {
        write_stderr_line(&t!("host.unsaved"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    flow.teardown();
    match outcome {
        Ok(WizardOutcome::Finalized) => Ok(ExitCode::SUCCESS),
        Ok(WizardOutcome::Abandoned | WizardOutcome::Incomplete) => Ok(ExitCode::FAILURE),
        Err(err) => Err(CliError::new(t!("wizard.step_failed", error = err))),
    }
}

/// Opens a provider return URL, which finalizes a verified registration.
async fn command_flow_resume(
    config: &ConsentProConfig,
    location: &PageLocation,
) -> CliResult<ExitCode> {
    let (flow, _host) = build_flow(config)?;
    let opened = flow.open(location).await;
    flow.teardown();
    opened.map_err(|err| CliError::new(t!("flow.open_failed", error = err)))?;
    let step = flow.snapshot().session.step;
    if step != FlowStep::Finalized {
        return Err(CliError::new(t!("resume.not_finalized", step = step)));
    }
    write_lines(&summary_lines(&flow))?;
    Ok(ExitCode::SUCCESS)
}

/// Parses a page URL argument.
fn parse_location(url: &str) -> CliResult<PageLocation> {
    PageLocation::parse(url).map_err(|err| CliError::new(t!("input.url_invalid", error = err)))
}

// ============================================================================
// SECTION: Provider Commands
// ============================================================================

/// Dispatches provider subcommands.
async fn command_didit(config: &ConsentProConfig, command: DiditCommand) -> CliResult<ExitCode> {
    let api = build_api(config)?;
    let failed = |err: consentpro_core::ApiError| CliError::new(t!("api.call_failed", error = err));
    match command {
        DiditCommand::Status {
            session,
        } => write_json(&api.session_status(&SessionId::new(session)).await.map_err(failed)?)?,
        DiditCommand::CreateSession {
            token,
            premium,
        } => {
            let token = VerificationToken::new(token);
            write_json(&api.create_session(&token, premium).await.map_err(failed)?)?;
        }
        DiditCommand::Pending {
            json,
        } => {
            let pending = api.pending_clients().await.map_err(failed)?;
            if json {
                write_json(&pending)?;
            } else {
                write_lines(&pending_lines(&pending))?;
            }
        }
        DiditCommand::Complete {
            token,
        } => {
            let token = VerificationToken::new(token);
            write_json(&api.complete_process(&token).await.map_err(failed)?)?;
        }
        DiditCommand::ResendDocuments {
            token,
        } => {
            let token = VerificationToken::new(token);
            write_json(&api.resend_documents(&token).await.map_err(failed)?)?;
        }
        DiditCommand::Config => write_json(&api.provider_config().await.map_err(failed)?)?,
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            write_stdout_line(&t!("config.validate.ok"))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Builds the HTTP client from config.
fn build_api(config: &ConsentProConfig) -> CliResult<HttpApi> {
    HttpApi::new(config.api.client_config())
        .map_err(|err| CliError::new(t!("api.init_failed", error = err)))
}

/// Builds a flow wired to the terminal.
fn build_flow(config: &ConsentProConfig) -> CliResult<(PublicFormFlow, Arc<TerminalHost>)> {
    let api = Arc::new(build_api(config)?);
    let audit = config
        .audit
        .build_sink()
        .map_err(|err| CliError::new(t!("config.audit_failed", error = err)))?;
    let host = Arc::new(TerminalHost::stderr());
    let endpoints = api.endpoints().clone();
    let forms: Arc<dyn FormApi> = api.clone();
    let verification: Arc<dyn VerificationApi> = api;
    let deps = FlowDeps::new(
        forms,
        verification,
        Arc::new(TerminalNotifier::stderr()),
        host.clone(),
        endpoints,
    )
    .with_audit(audit);
    Ok((PublicFormFlow::new(deps, config.flow.settings()), host))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Renders top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(help.trim_end()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes each line to stdout.
fn write_lines(lines: &[String]) -> CliResult<()> {
    for line in lines {
        write_stdout_line(line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(())
}

/// Writes canonical JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout();
    stdout.write_all(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.stdout"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
