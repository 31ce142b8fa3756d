//! pulse-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) merged with
//! `PULSE_*` environment variables, opens the SQLite store, and serves the
//! JSON API under `/api`.
//!
//! # Registering users
//!
//! Users normally come from the upstream identity provider. To seed a local
//! database:
//!
//! ```text
//! cargo run -p pulse-server -- add-user --name "Ada" --email ada@school.test --role student
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use pulse_api::ApiState;
use pulse_core::{
  store::RecordStore,
  user::{NewUser, Role},
};
use pulse_server::{ServerConfig, app, expand_tilde, load_config};
use pulse_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Pulse student wellness server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,

  /// Register a user and print its id.
  AddUser {
    #[arg(long)]
    name:           String,
    #[arg(long)]
    email:          String,
    /// student, teacher or parent.
    #[arg(long)]
    role:           Role,
    /// For parents: the id of their child.
    #[arg(long)]
    parent_of:      Option<Uuid>,
    #[arg(long)]
    student_number: Option<String>,
    #[arg(long = "class")]
    class_name:     Option<String>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = load_config(&cli.config).context("failed to load configuration")?;
  let store = open_store(&server_cfg).await?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg, store).await,
    Command::AddUser { name, email, role, parent_of, student_number, class_name } => {
      let input = NewUser { name, email, role, parent_of, student_number, class_name };
      let user = store.add_user(input).await.context("failed to add user")?;
      tracing::info!(user_id = %user.user_id, role = %user.role, "user added");
      println!("{}", user.user_id);
      Ok(())
    }
  }
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

async fn serve(cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let state = ApiState::new(Arc::new(store), cfg.analytics);
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app(state)).await.context("server error")?;

  Ok(())
}
