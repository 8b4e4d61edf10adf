use anyhow::Result;
use clap::Parser;
use godl::commands::{self, CatalogOptions, InstallOptions, ListOptions};
use std::path::PathBuf;

/// godl - Go toolchain downloader
///
/// Lists the Go releases published on the download page and installs them
/// side by side into a destination directory.
///
/// Examples:
///   godl list                      # Releases for this platform, newest first
///   godl list --latest             # Only the newest release
///   godl install 1.21.3            # Install into ~/sdk/1.21.3
///   godl install 1.21.3 -l current # ...and point ~/sdk/current at it
#[derive(Parser, Debug)]
#[command(author, version = env!("GODL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Release listing to read (also via GODL_BASE_URL)
    #[arg(
        long = "base-url",
        env = "GODL_BASE_URL",
        value_name = "URL",
        global = true
    )]
    pub base_url: Option<String>,

    /// Target operating system, in Go's naming (e.g. linux, darwin, windows)
    #[arg(long, env = "GODL_OS", value_name = "OS", global = true)]
    pub os: Option<String>,

    /// Target architecture, in Go's naming (e.g. amd64, arm64)
    #[arg(long, env = "GODL_ARCH", value_name = "ARCH", global = true)]
    pub arch: Option<String>,

    /// Include release candidates
    #[arg(long = "include-rc", alias = "pre", global = true)]
    pub include_rc: bool,

    /// Print debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List the releases available for the target platform
    #[command(visible_alias = "print")]
    List(ListArgs),

    /// Download and install a release
    #[command(visible_alias = "download")]
    Install(InstallArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Print the downloads as JSON
    #[arg(long)]
    pub json: bool,

    /// Print only the newest release
    #[arg(long)]
    pub latest: bool,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Version to install, e.g. 1.21.3 or 1.22rc1
    #[arg(value_name = "VERSION")]
    pub version: String,

    /// Directory to install into (defaults to ~/sdk)
    #[arg(
        short,
        long,
        env = "GODL_DESTINATION",
        value_name = "DIR"
    )]
    pub destination: Option<PathBuf>,

    /// Point this alias at the installed version (relative to the destination)
    #[arg(short, long, value_name = "NAME")]
    pub link: Option<String>,
}

impl Cli {
    fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            base_url: self.base_url.clone(),
            os: self.os.clone(),
            arch: self.arch.clone(),
            include_release_candidates: self.include_rc,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let catalog = cli.catalog_options();
    let runtime = godl::runtime::RealRuntime;

    match cli.command {
        Commands::List(args) => {
            let options = ListOptions {
                json: args.json,
                latest: args.latest,
            };
            commands::list(&catalog, options).await?
        }
        Commands::Install(args) => {
            let options = InstallOptions {
                version: args.version,
                destination: args.destination,
                link: args.link,
            };
            commands::install(runtime, &catalog, options).await?
        }
    }
    Ok(())
}
