mod onboard;
mod server;
mod session;
mod wizard;

use std::sync::Arc;
use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand};
use rajni_core::{
    config::{self, Config, Secrets, ENV_OPENAI_API_KEY, ENV_STORE_KEY, ENV_STORE_URL},
    context::{Context, Conversation, ConversationTurn},
    prefs::UserPreferences,
    prompt::{build_system_prompt, BASE_INSTRUCTIONS},
    traits::{KeyedStore, Provider},
};
use rajni_providers::{openai::OpenAiProvider, voice::OpenAiSpeech};
use rajni_store::RestStore;
use tracing_subscriber::EnvFilter;

use crate::server::AppState;
use crate::session::ChatSessions;

#[derive(Parser)]
#[command(name = "rajni", version, about = "RajniAI — personal assistant backend")]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "rajni.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,
    /// Show configuration and provider status
    Status,
    /// Ask a single question from the command line
    Ask {
        /// The message to send
        message: Vec<String>,
        /// Personalize from this user's stored preferences
        #[arg(short, long)]
        user_key: Option<String>,
    },
    /// Interactive onboarding: profile, then the preferences wizard
    Onboard {
        /// User key to store the records under
        #[arg(short, long)]
        user_key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.rajni.log_level)),
        )
        .init();

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Status => status(config).await,
        Commands::Ask { message, user_key } => ask(config, message.join(" "), user_key).await,
        Commands::Onboard { user_key } => onboard(config, user_key).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let secrets = Secrets::from_env()?;

    let store = RestStore::new(secrets.store_url, secrets.store_key);
    let provider = OpenAiProvider::from_config(config.openai.clone(), secrets.openai_api_key.clone());
    let speech = OpenAiSpeech::from_config(&config.openai, secrets.openai_api_key);

    let state = Arc::new(AppState {
        store: Arc::new(store),
        provider: Arc::new(provider),
        speech: Arc::new(speech),
        tables: config.store.clone(),
        sessions: ChatSessions::new(),
        started_at: Instant::now(),
    });

    server::serve(&config.server, state).await
}

async fn status(config: Config) -> anyhow::Result<()> {
    println!("{} v{}", config.rajni.name, env!("CARGO_PKG_VERSION"));
    println!("  server:     {}:{}", config.server.host, config.server.port);
    println!("  chat model: {}", config.openai.chat_model);
    println!(
        "  tables:     {}, {}",
        config.store.preferences_table, config.store.profiles_table
    );

    println!("environment:");
    for name in [ENV_OPENAI_API_KEY, ENV_STORE_URL, ENV_STORE_KEY] {
        let set = std::env::var(name)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        println!("  {name}: {}", if set { "configured" } else { "MISSING" });
    }

    if let Ok(secrets) = Secrets::from_env() {
        let provider = OpenAiProvider::from_config(config.openai.clone(), secrets.openai_api_key);
        let available = provider.is_available().await;
        println!(
            "provider {}: {}",
            provider.name(),
            if available { "available" } else { "unreachable" }
        );
    }

    Ok(())
}

async fn ask(config: Config, message: String, user_key: Option<String>) -> anyhow::Result<()> {
    let message = message.trim().to_string();
    if message.is_empty() {
        bail!("nothing to ask: pass a message, e.g. `rajni ask \"book me a cab\"`");
    }

    let secrets = Secrets::from_env()?;
    let provider = OpenAiProvider::from_config(config.openai.clone(), secrets.openai_api_key);

    let preferences = match user_key {
        Some(key) => {
            let store = RestStore::new(secrets.store_url, secrets.store_key);
            store
                .fetch(&config.store.preferences_table, &key)
                .await?
                .map(|record| UserPreferences::from_record(&record))
        }
        None => None,
    };

    let mut conversation = Conversation::new();
    conversation.append(ConversationTurn::user(message));
    let context = Context::from_conversation(
        build_system_prompt(BASE_INSTRUCTIONS, preferences.as_ref()),
        &conversation,
    );

    let reply = provider.complete(&context).await?;
    println!("{reply}");
    Ok(())
}

async fn onboard(config: Config, user_key: String) -> anyhow::Result<()> {
    let secrets = Secrets::from_env()?;
    let store = RestStore::new(secrets.store_url, secrets.store_key);
    onboard::run(&store, &config.store, &user_key).await
}
