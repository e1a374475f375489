use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Folio portfolio and blog service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Print posts with their view counts.
    List(ListArgs),
    /// Print related-post recommendations for a post.
    Related(RelatedArgs),
    /// Record a single view of a post.
    #[command(name = "record-view")]
    RecordView(RecordViewArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvironmentArg {
    Development,
    Production,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CommonOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the directory holding post files.
    #[arg(long = "content-directory", value_name = "PATH", global = true)]
    pub content_directory: Option<PathBuf>,

    /// Override the JSON file backing the view counters.
    #[arg(long = "views-file", value_name = "PATH", global = true)]
    pub views_file: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RecommendationOverrides {
    /// Weight of popularity against keyword overlap, within [0, 1].
    #[arg(long = "view-count-weight", value_name = "WEIGHT")]
    pub view_count_weight: Option<f64>,

    /// Maximum number of related posts.
    #[arg(long = "max-results", value_name = "COUNT")]
    pub max_results: Option<usize>,

    /// Maximum number of newsletter issues among related posts.
    #[arg(long = "max-newsletters", value_name = "COUNT")]
    pub max_newsletters: Option<usize>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub recommendations: RecommendationOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the deployment environment; admin routes are disabled in production.
    #[arg(long = "environment", value_enum, value_name = "ENV")]
    pub environment: Option<EnvironmentArg>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    /// Include draft posts.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub drafts: bool,

    /// Order by views per day instead of publication date.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub popular: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RelatedArgs {
    #[command(flatten)]
    pub overrides: RecommendationOverrides,

    /// Slug of the post being read.
    #[arg(value_name = "SLUG")]
    pub slug: String,
}

#[derive(Debug, Args, Clone)]
pub struct RecordViewArgs {
    /// Slug of the viewed post.
    #[arg(value_name = "SLUG")]
    pub slug: String,
}
