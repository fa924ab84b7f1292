use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};

use notes_client::config::{ClientConfig, ConfigError};
use notes_client::context::{AppContext, ContextError};
use notes_client::net::api::{self, NotesQuery};
use notes_client::net::transport::Method;
use notes_client::net::types::AuthOutcome;
use notes_client::state::session::{RequestOptions, SessionError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}")]
    AuthFailed(String),
    #[error("not signed in; run `notes-cli login` first")]
    NotSignedIn,
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("invalid header `{0}`; expected NAME:VALUE")]
    InvalidHeader(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "notes-cli", about = "Notes backend session and theme CLI")]
struct Cli {
    /// Overrides `NOTES_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the credential.
    Login {
        email: String,
        #[arg(long, env = "NOTES_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in with it.
    Register(RegisterArgs),
    /// Forget the stored credential.
    Logout,
    /// Print the signed-in user.
    Whoami,
    /// Send an authenticated request and print the JSON response.
    Request(RequestArgs),
    /// List notes, newest first.
    Notes {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        offset: Option<u32>,
        #[arg(long)]
        category: Option<String>,
        /// Only notes with this tag. Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Print AI processing statistics.
    Stats,
    /// Show or change the display theme.
    Theme {
        #[arg(value_enum, default_value_t = ThemeAction::Show)]
        action: ThemeAction,
    },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    email: String,
    #[arg(long, env = "NOTES_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Args, Debug)]
struct RequestArgs {
    method: String,
    endpoint: String,
    /// JSON request body.
    #[arg(long)]
    data: Option<String>,
    /// Extra header as NAME:VALUE. Repeatable.
    #[arg(long = "header")]
    headers: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ThemeAction {
    Show,
    Toggle,
    Light,
    Dark,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url);
    }
    let ctx = AppContext::from_config(&config).await?;

    match cli.command {
        Command::Login { email, password } => {
            let outcome = ctx.session.login(&email, &password).await;
            report_outcome(&outcome)
        }
        Command::Register(args) => {
            let outcome = ctx
                .session
                .register(&args.email, &args.password, &args.name, args.phone.as_deref())
                .await;
            report_outcome(&outcome)
        }
        Command::Logout => {
            ctx.session.logout().await;
            print_json(&json!({ "success": true }))
        }
        Command::Whoami => {
            let user = ctx.session.current_user().await.ok_or(CliError::NotSignedIn)?;
            print_json(&serde_json::to_value(user)?)
        }
        Command::Request(args) => run_request(&ctx, args).await,
        Command::Notes { limit, offset, category, tags, search } => {
            let query = NotesQuery { offset, category, tags, search, ..NotesQuery::recent(limit) };
            let page = api::list_notes(&ctx.session, &query).await?;
            print_json(&serde_json::to_value(page)?)
        }
        Command::Stats => {
            let stats = api::ai_stats(&ctx.session).await?;
            print_json(&stats)
        }
        Command::Theme { action } => {
            match action {
                ThemeAction::Show => {}
                ThemeAction::Toggle => {
                    ctx.theme.toggle_theme();
                }
                ThemeAction::Light => ctx.theme.set_light_theme(),
                ThemeAction::Dark => ctx.theme.set_dark_theme(),
            }
            print_json(&json!({ "theme": ctx.theme.theme().as_str(), "is_dark": ctx.theme.is_dark() }))
        }
    }
}

async fn run_request(ctx: &AppContext, args: RequestArgs) -> Result<(), CliError> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::InvalidMethod(args.method.clone()))?;
    let mut options = RequestOptions::get().with_method(method);
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        options = options.with_header(name, value);
    }
    if let Some(data) = args.data.as_deref() {
        options = options.with_body(serde_json::from_str::<Value>(data)?);
    }

    let json = ctx.session.authenticated_request(&args.endpoint, options).await?;
    print_json(&json)
}

fn parse_header(raw: &str) -> Result<(&str, &str), CliError> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| CliError::InvalidHeader(raw.to_owned()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidHeader(raw.to_owned()));
    }
    Ok((name, value.trim()))
}

fn report_outcome(outcome: &AuthOutcome) -> Result<(), CliError> {
    print_json(&outcome.to_json())?;
    match outcome.error() {
        Some(error) => Err(CliError::AuthFailed(error.to_owned())),
        None => Ok(()),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
