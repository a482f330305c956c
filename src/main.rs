use std::sync::Arc;

use clap::{Parser, Subcommand};
use findrr_identity::browser::ConsoleBrowser;
use findrr_identity::error::{ConfigError, LoginError, OAuthError};
use findrr_identity::provider::OAuthProvider;
use findrr_identity::provider::ProviderError;
use findrr_identity::provider::appwrite::AppwriteClient;
use findrr_identity::storage::FileStorage;
use findrr_identity::{IdentityConfig, IdentitySnapshot, IdentityStore, UserCache};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("{}", .0.user_message())]
    Login(#[from] LoginError),
    #[error("{}", .0.user_message())]
    OAuth(OAuthError),
    #[error("logout failed; try again")]
    Logout,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "findrr-identity", about = "Findrr sign-in and identity resolution")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the current session and print the identity snapshot.
    Whoami,
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FINDRR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in through an OAuth provider (google, apple, github, facebook, microsoft).
    Oauth { provider: OAuthProvider },
    /// Delete the current session and clear the cached user.
    Logout,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = IdentityConfig::from_env()?;
    let store = build_store(&config).await?;

    match cli.command {
        Command::Whoami => print_snapshot(&store.refetch().await),
        Command::Login { email, password } => {
            let snapshot = store.sign_in_with_password(&email, &password).await?;
            print_snapshot(&snapshot)
        }
        Command::Oauth { provider } => {
            let snapshot = store
                .sign_in_with_oauth_session(provider)
                .await
                .map_err(CliError::OAuth)?;
            print_snapshot(&snapshot)
        }
        Command::Logout => {
            if !store.sign_out().await {
                return Err(CliError::Logout);
            }
            print_snapshot(&store.snapshot())
        }
    }
}

async fn build_store(config: &IdentityConfig) -> Result<IdentityStore, CliError> {
    let storage = Arc::new(FileStorage::new(config.cache_dir.clone()));
    let client = AppwriteClient::new(config)?.with_cookie_store(storage.clone());
    client.restore_session_cookies().await;

    tracing::debug!(endpoint = %config.endpoint, cache_dir = %storage.dir().display(), "identity store configured");
    Ok(IdentityStore::new(
        Arc::new(client),
        Arc::new(ConsoleBrowser),
        UserCache::new(storage),
        config.collections.clone(),
        config.redirect_uri(),
    ))
}

fn print_snapshot(snapshot: &IdentitySnapshot) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}
