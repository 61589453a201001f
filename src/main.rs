use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dirstore_core::constants::{
    DEFAULT_TIER_ENV, ENCODING_ENV, MAX_PAYLOAD_BYTES_ENV, RECURSIVE_ENV, ROOT_ENV,
    SKIP_SAME_LENGTH_REWRITE_ENV,
};
use dirstore_core::predicate::{CompareOp, Field};
use dirstore_core::{
    EntityRepository, ErrorClass, FileEntity, FileRepository, LoadTier, PayloadEncoding,
    Predicate, RepositoryConfig, RepositoryError,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dirstore")]
#[command(about = "Query and edit a directory of files as an entity store")]
struct Cli {
    /// Repository root (overrides DIRSTORE_ROOT)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Include every directory below the root
    #[arg(long)]
    recursive: bool,
    /// Default load tier: info_only, with_mime or with_data
    #[arg(long)]
    tier: Option<LoadTier>,
    /// Payload encoding: raw_bytes, base64 or base64_ascii_bytes
    #[arg(long)]
    encoding: Option<PayloadEncoding>,
    /// Largest file loaded into memory, in bytes
    #[arg(long)]
    max_payload_bytes: Option<u64>,
    /// Rewrite files on update even when the length is unchanged
    #[arg(long)]
    rewrite_same_length: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every entity
    List {
        /// Load file contents
        #[arg(long)]
        with_data: bool,
    },
    /// Fetch one entity by name
    Get {
        name: String,
        /// Load file contents
        #[arg(long)]
        with_data: bool,
    },
    /// Check whether an entity exists
    Exists { name: String },
    /// Find entities matching every given filter
    Find {
        #[command(flatten)]
        filter: FindFilter,
        /// Load file contents
        #[arg(long)]
        with_data: bool,
    },
    /// Create a new file
    Create {
        name: String,
        #[command(flatten)]
        body: Body,
        /// Directory to create the file in, relative to the root. Anything other than the
        /// root itself requires --recursive
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Replace the contents of an existing file
    Update {
        name: String,
        #[command(flatten)]
        body: Body,
    },
    /// Delete one or more files
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Args)]
struct FindFilter {
    #[arg(long)]
    name_starts_with: Option<String>,
    #[arg(long)]
    name_ends_with: Option<String>,
    #[arg(long)]
    name_contains: Option<String>,
    /// Exact sniffed MIME type
    #[arg(long)]
    content_type: Option<String>,
}

impl FindFilter {
    fn into_predicate(self) -> Predicate {
        let terms = [
            self.name_starts_with
                .map(|v| Predicate::compare(CompareOp::StartsWith, Field::Name, v)),
            self.name_ends_with
                .map(|v| Predicate::compare(CompareOp::EndsWith, Field::Name, v)),
            self.name_contains
                .map(|v| Predicate::compare(CompareOp::Contains, Field::Name, v)),
            self.content_type
                .map(|v| Predicate::field_eq(Field::ContentType, v)),
        ];
        terms
            .into_iter()
            .flatten()
            .fold(Predicate::Always, Predicate::and)
    }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Body {
    /// Read the contents from a local file
    #[arg(long)]
    file: Option<PathBuf>,
    /// Use the given text as the contents
    #[arg(long)]
    text: Option<String>,
}

impl Body {
    async fn read(self) -> anyhow::Result<Vec<u8>> {
        match (self.file, self.text) {
            (Some(path), _) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display())),
            (None, Some(text)) => Ok(text.into_bytes()),
            (None, None) => anyhow::bail!("either --file or --text is required"),
        }
    }
}

/// Entry point for the dirstore CLI.
///
/// Configuration is read once from the environment (and `.env`), then overridden by flags.
///
/// # Environment Variables
/// - `DIRSTORE_ROOT`: repository root (default: "data")
/// - `DIRSTORE_RECURSIVE`: scan subdirectories too
/// - `DIRSTORE_DEFAULT_TIER`: load tier for query results
/// - `DIRSTORE_ENCODING`: payload encoding
/// - `DIRSTORE_MAX_PAYLOAD_BYTES`: largest file loaded into memory
/// - `DIRSTORE_SKIP_SAME_LENGTH_REWRITE`: skip same-length updates (default: true)
///
/// Repository errors map to exit codes: 2 bad request, 3 not found, 4 conflict, 1 otherwise.
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dirstore=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match execute(cli).await {
        Ok(code) => Ok(code),
        Err(e) => match e.downcast_ref::<RepositoryError>() {
            Some(repo_err) => {
                tracing::error!("{repo_err}");
                Ok(exit_code(repo_err.class()))
            }
            None => Err(e),
        },
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let repo = FileRepository::new(resolve_config(&cli)?)?;
    run(&repo, cli.command).await
}

fn resolve_config(cli: &Cli) -> anyhow::Result<RepositoryConfig> {
    let env = |key: &str| std::env::var(key).ok();
    let mut cfg = RepositoryConfig::from_env_values(
        env(ROOT_ENV),
        env(RECURSIVE_ENV),
        env(DEFAULT_TIER_ENV),
        env(ENCODING_ENV),
        env(MAX_PAYLOAD_BYTES_ENV),
        env(SKIP_SAME_LENGTH_REWRITE_ENV),
    )?;

    if let Some(root) = &cli.root {
        cfg = cfg.with_root(root);
    }
    if cli.recursive {
        cfg = cfg.with_recursive(true);
    }
    if let Some(tier) = cli.tier {
        cfg = cfg.with_default_tier(tier);
    }
    if let Some(encoding) = cli.encoding {
        cfg = cfg.with_default_encoding(encoding);
    }
    if let Some(max) = cli.max_payload_bytes {
        cfg = cfg.with_max_payload_bytes(max);
    }
    if cli.rewrite_same_length {
        cfg = cfg.with_skip_rewrite_if_same_length(false);
    }
    Ok(cfg)
}

async fn run(repo: &FileRepository, command: Commands) -> anyhow::Result<ExitCode> {
    let encoding = repo.config().default_encoding();

    match command {
        Commands::List { with_data } => {
            let entities = if with_data {
                repo.get_many_with(&Predicate::Always, true).await?
            } else {
                repo.get_all().await?
            };
            print_json(&entities)?;
        }
        Commands::Get { name, with_data } => {
            match repo.get_with(&Predicate::name_eq(name), with_data).await? {
                Some(entity) => print_json(&entity)?,
                None => return Ok(exit_code(ErrorClass::NotFound)),
            }
        }
        Commands::Exists { name } => {
            let exists = repo.any(&Predicate::name_eq(name)).await?;
            print_json(&exists)?;
            if !exists {
                return Ok(exit_code(ErrorClass::NotFound));
            }
        }
        Commands::Find { filter, with_data } => {
            let entities = repo
                .get_many_with(&filter.into_predicate(), with_data)
                .await?;
            print_json(&entities)?;
        }
        Commands::Create { name, body, dir } => {
            let mut entity = FileEntity::from_bytes(name, body.read().await?, encoding);
            if let Some(dir) = dir {
                entity = entity.with_path(repo.root().join(dir));
            }
            let created = repo.create(entity).await?;
            tracing::info!("created {}", created.name());
            print_json(&without_data(created))?;
        }
        Commands::Update { name, body } => {
            let entity = FileEntity::from_bytes(name, body.read().await?, encoding);
            let updated = repo.update(entity).await?;
            tracing::info!("updated {}", updated.name());
            print_json(&without_data(updated))?;
        }
        Commands::Delete { mut names } => {
            if names.len() == 1 {
                let name = names.remove(0);
                repo.try_delete(FileEntity::reference(name)).await?;
            } else {
                let entities = names.into_iter().map(FileEntity::reference).collect();
                repo.delete_range(entities).await?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn without_data(entity: FileEntity) -> FileEntity {
    let mut summary = FileEntity::reference(entity.name());
    if let Some(path) = entity.path() {
        summary = summary.with_path(path);
    }
    summary
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(class: ErrorClass) -> ExitCode {
    match class {
        ErrorClass::BadRequest => ExitCode::from(2),
        ErrorClass::NotFound => ExitCode::from(3),
        ErrorClass::Conflict => ExitCode::from(4),
        ErrorClass::Internal => ExitCode::FAILURE,
    }
}
