use anyhow::Result;
use assetsync::db::{yes_no_from_cli, AssetFilter, InstalledFilter, UpdatedWithin};
use assetsync::{App, Config};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "assetsync")]
#[command(
    author,
    version = assetsync::APP_VERSION,
    about = "Browse, synchronize and download community 3D-character assets"
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Asset database root override for this invocation
    #[arg(long)]
    asset_root: Option<String>,

    /// Install root override for this invocation
    #[arg(long)]
    install_root: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the manifest and previews, then rebuild the installed state
    Sync {
        /// Re-download previews that are already cached
        #[arg(long)]
        force: bool,
    },

    /// List assets of one type matching the given filters
    List(ListArgs),

    /// Show details of one asset
    Show {
        /// Asset type (e.g., hair, clothes)
        #[arg(short = 't', long = "type")]
        asset_type: String,
        /// Asset id
        id: u64,
    },

    /// Download and install one asset
    Download {
        /// Asset type (e.g., hair, clothes)
        #[arg(short = 't', long = "type")]
        asset_type: String,
        /// Asset id
        id: u64,
    },

    /// List known asset authors
    Authors,

    /// List known clothes categories
    Categories,

    /// Rebuild the installed state from the filesystem
    Rebuild,

    /// Show current status
    Status,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Asset type (e.g., hair, clothes)
    #[arg(short = 't', long = "type")]
    asset_type: String,
    /// Exact author name
    #[arg(long)]
    author: Option<String>,
    /// Clothes category
    #[arg(long)]
    category: Option<String>,
    /// Title contains (case-insensitive)
    #[arg(long)]
    title: Option<String>,
    /// Description contains (case-insensitive)
    #[arg(long)]
    description: Option<String>,
    /// Installed state: yes, no, remote-newer
    #[arg(long)]
    installed: Option<String>,
    /// Has screenshot: yes, no
    #[arg(long)]
    has_screenshot: Option<String>,
    /// Has thumbnail: yes, no
    #[arg(long)]
    has_thumbnail: Option<String>,
    /// Updated or created within: week, month, three-months, year
    #[arg(long)]
    updated_within: Option<String>,
}

impl ListArgs {
    fn filter(&self) -> Result<AssetFilter> {
        Ok(AssetFilter {
            author: self.author.clone(),
            category: self.category.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            installed: self
                .installed
                .as_deref()
                .map(InstalledFilter::from_cli)
                .transpose()?
                .unwrap_or_default(),
            has_screenshot: self.has_screenshot.as_deref().map(yes_no_from_cli).transpose()?,
            has_thumbnail: self.has_thumbnail.as_deref().map(yes_no_from_cli).transpose()?,
            updated_within: self
                .updated_within
                .as_deref()
                .map(UpdatedWithin::from_cli)
                .transpose()?,
        })
    }
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Set the manifest url
    SetManifestUrl { url: String },
}

fn setup_logging(verbosity: u8, config: &Config) {
    let filter = match verbosity {
        0 => "assetsync=warn",
        1 => "assetsync=info",
        2 => "assetsync=debug",
        _ => "assetsync=trace",
    };

    let log_file = config.paths.log_file();
    if let Some(dir) = log_file.parent() {
        std::fs::create_dir_all(dir).ok();
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .expect("Failed to open log file");

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Arc::new(file)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn non_empty(value: &str, flag: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        anyhow::bail!("{} cannot be empty", flag);
    }
    Ok(trimmed.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load().await?;
    setup_logging(cli.verbose, &config);

    if let Some(root) = cli.asset_root.as_deref() {
        config.asset_root_override = Some(non_empty(root, "--asset-root")?);
    }
    if let Some(root) = cli.install_root.as_deref() {
        config.install_root_override = Some(non_empty(root, "--install-root")?);
    }

    // Initialize app
    let mut app = App::new(config)?;

    match cli.command {
        Commands::Sync { force } => app.cmd_sync(force).await?,
        Commands::List(args) => {
            let filter = args.filter()?;
            app.cmd_list(&args.asset_type, &filter).await?
        }
        Commands::Show { asset_type, id } => app.cmd_show(&asset_type, id).await?,
        Commands::Download { asset_type, id } => app.cmd_download(&asset_type, id).await?,
        Commands::Authors => app.cmd_authors().await?,
        Commands::Categories => app.cmd_categories().await?,
        Commands::Rebuild => app.cmd_rebuild().await?,
        Commands::Status => app.cmd_status().await?,
        Commands::Config { action } => match action {
            ConfigCommands::Show => app.cmd_config_show().await?,
            ConfigCommands::SetManifestUrl { url } => {
                app.cmd_config_set_manifest_url(&url).await?
            }
        },
    }

    Ok(())
}
