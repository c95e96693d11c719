use anyhow::Context;
use elytra::{
    api::routes::build_app,
    chat::{ChatSession, HttpChatTransport, LocalChatTransport},
    cli::{
        self,
        init::{InitConfig, InitResult},
        output::Output,
        Cli, Commands,
    },
    programs::sync_index,
    rag::pipeline::RagPipeline,
    AppState, ElytraConfig, ElytraConfigManager,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&cli.config, cli.verbose, &output).await,
        Commands::Init {
            path,
            force,
            provider,
            host,
            port,
        } => {
            let config = InitConfig {
                path,
                force,
                provider,
                host,
                port,
            };
            match cli::init::run(config, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!(e),
            }
        }
        Commands::Config { full, validate } => show_config(&cli.config, full, validate, &output),
        Commands::Chat { server, token } => {
            init_tracing(if cli.verbose { "debug" } else { "warn" }, false);
            chat(&cli.config, server, token, &output).await
        }
        Commands::Index => {
            init_tracing(if cli.verbose { "debug" } else { "info" }, false);
            let state = build_state(&cli.config).await?;
            let count = sync_index(
                &state.db,
                state.embedder.as_ref(),
                state.vector_store.as_ref(),
            )
            .await?;
            output.success(&format!("Indexed {} programs", count));
            Ok(())
        }
        Commands::Token { sub, email, role } => {
            let config = ElytraConfig::parse_file(&cli.config)?;
            let auth = elytra::auth::jwt::AuthService::new(
                config.jwt_secret()?,
                config.auth.jwt_access_expiry,
            );
            println!("{}", auth.issue_token(&sub, &email, &role)?);
            Ok(())
        }
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", level)));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_state(path: &Path) -> anyhow::Result<AppState> {
    let manager = ElytraConfigManager::new(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    for warning in manager.config().warnings() {
        tracing::warn!("{}", warning);
    }
    Ok(AppState::from_config(Arc::new(manager)).await?)
}

async fn serve(path: &Path, verbose: bool, output: &Output) -> anyhow::Result<()> {
    let parsed = ElytraConfig::parse_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let level = if verbose {
        "debug"
    } else {
        parsed.server.log_level.as_str()
    };
    init_tracing(level, parsed.server.log_json);
    output.banner();

    let state = build_state(path).await?;
    if let Err(e) = state.config_manager.start_watching() {
        tracing::warn!("Config hot-reload disabled: {}", e);
    }

    let config = state.config_manager.config();
    let app = build_app(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Elytra listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.config_manager.stop_watching();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

async fn chat(
    path: &Path,
    server: Option<String>,
    token: Option<String>,
    output: &Output,
) -> anyhow::Result<()> {
    output.banner();

    let mut session = match server {
        Some(server) => {
            let token = token.context("--token or ELYTRA_TOKEN is required with --server")?;
            let transport = HttpChatTransport::new(server, token);
            ChatSession::new(Arc::new(transport.retriever()), Arc::new(transport))
        }
        None => {
            let state = build_state(path).await?;
            let config = state.config_manager.config();
            let retriever = RagPipeline::new(
                state.embedder.clone(),
                state.vector_store.clone(),
                config.rag.top_k,
            );
            let transport =
                LocalChatTransport::new(state.llm.clone(), config.rag.system_prompt.clone());
            ChatSession::new(Arc::new(retriever), Arc::new(transport))
        }
    };

    cli::chat::run(&mut session, output).await?;
    Ok(())
}

fn show_config(path: &Path, full: bool, validate: bool, output: &Output) -> anyhow::Result<()> {
    let config = match ElytraConfig::parse_file(path) {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            output.hint("Run `elytra-server init` to create elytra.toml");
            anyhow::bail!("invalid configuration");
        }
    };

    output.header("Configuration");
    output.kv("File", &path.display().to_string());
    output.kv(
        "Server",
        &format!("{}:{}", config.server.host, config.server.port),
    );
    output.kv("Database", &config.database.url);
    output.kv("LLM model", &llm_summary(&config));
    output.kv("Embedding model", &config.embeddings.model);
    output.kv("Pinecone host", &config.pinecone.index_host);
    output.kv("Top K", &config.rag.top_k.to_string());

    if full {
        output.header("Full configuration");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if validate {
        output.header("Validation");
        match config.validate() {
            Ok(()) => output.success("Configuration is valid"),
            Err(e) => {
                output.error(&e.to_string());
                anyhow::bail!("invalid configuration");
            }
        }
        for warning in config.warnings() {
            output.warning(&warning);
        }
    }
    Ok(())
}

fn llm_summary(config: &ElytraConfig) -> String {
    match &config.llm {
        elytra::utils::toml_config::LlmConfig::Gemini { model, .. } => format!("gemini/{}", model),
        elytra::utils::toml_config::LlmConfig::OpenAI { model, .. } => format!("openai/{}", model),
    }
}
