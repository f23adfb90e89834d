use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use pagepilot_agent::{ChatRequest, ThreadScope};
use pagepilot_server::telemetry::init_tracing;
use pagepilot_server::{AppState, ServerConfig, build_agent, build_tool_registry, serve};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "pagepilot")]
#[command(about = "Dashboard assistant backed by OpenAI Assistants runs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Run a single chat turn and print the reply.
    Chat(ChatArgs),
    /// List the tools the assistant may call.
    Tools(ToolsArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    #[arg(long)]
    addr: Option<SocketAddr>,
    #[arg(long, value_enum)]
    thread_scope: Option<ScopeArg>,
    #[arg(long)]
    thread_store: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct ChatArgs {
    message: String,
    #[arg(long)]
    thread_id: Option<String>,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ToolsArgs {
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Request,
    Session,
}

impl From<ScopeArg> for ThreadScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Request => ThreadScope::Request,
            ScopeArg::Session => ThreadScope::Session,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve(args) => serve_command(args).await,
        Commands::Chat(args) => chat_command(args).await,
        Commands::Tools(args) => tools_command(args),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

async fn serve_command(args: ServeArgs) -> Result<ExitCode, String> {
    let mut config = ServerConfig::from_env().map_err(|error| error.to_string())?;
    if let Some(addr) = args.addr {
        config.addr = addr;
    }
    if let Some(scope) = args.thread_scope {
        config.agent.thread_scope = scope.into();
    }
    if args.thread_store.is_some() {
        config.thread_store_dir = args.thread_store;
    }
    if config.api_tokens.is_empty() {
        return Err(format!(
            "refusing to serve without API tokens; set {}",
            pagepilot_server::config::API_TOKENS_ENV
        ));
    }

    let agent = build_agent(&config).map_err(|error| error.to_string())?;
    let state = Arc::new(AppState::new(
        agent,
        config.api_tokens.clone(),
        CancellationToken::new(),
    ));
    serve(state, config.addr)
        .await
        .map_err(|error| error.to_string())?;
    Ok(ExitCode::SUCCESS)
}

async fn chat_command(args: ChatArgs) -> Result<ExitCode, String> {
    let config = ServerConfig::from_env().map_err(|error| error.to_string())?;
    let agent = build_agent(&config).map_err(|error| error.to_string())?;

    let mut request = ChatRequest::new(args.message);
    if let Some(thread_id) = args.thread_id {
        request = request.with_thread(thread_id);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let reply = agent
        .chat(request, &cancel)
        .await
        .map_err(|error| error.to_string())?;
    if args.json {
        let rendered = serde_json::to_string_pretty(&reply).map_err(|error| error.to_string())?;
        println!("{rendered}");
    } else {
        println!("{}", reply.message);
        eprintln!("thread: {}", reply.thread_id);
    }
    Ok(ExitCode::SUCCESS)
}

fn tools_command(args: ToolsArgs) -> Result<ExitCode, String> {
    let config = ServerConfig::from_env().map_err(|error| error.to_string())?;
    let registry = build_tool_registry(&config).map_err(|error| error.to_string())?;
    if args.json {
        let rendered = serde_json::to_string_pretty(&registry.definitions())
            .map_err(|error| error.to_string())?;
        println!("{rendered}");
    } else {
        for definition in registry.definitions() {
            println!("{}\t{}", definition.name, definition.description);
        }
    }
    Ok(ExitCode::SUCCESS)
}
