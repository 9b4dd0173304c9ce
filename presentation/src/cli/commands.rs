//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// CLI arguments for sciquorum
#[derive(Parser, Debug)]
#[command(name = "sciquorum")]
#[command(author, version, about = "Discover, select and orchestrate research tools with consensus")]
#[command(long_about = r#"
sciquorum discovers tools described by SKILL.md files, picks the right ones
for a research topic, runs them as multi-step workflows and only reports
findings that reviewers agreed on.

Configuration files are loaded from (in priority order):
1. SCIQUORUM_* environment variables (e.g. SCIQUORUM_WORKFLOW__MAX_PARALLEL=4)
2. --config <path>        Explicit config file
3. ./sciquorum.toml       Project-level config
4. ~/.config/sciquorum/config.toml   Global config

Example:
  sciquorum --root ./skills tools search pubmed
  sciquorum --root ./skills select "variant effect prediction for BRCA1"
  sciquorum --root ./skills invoke pubmed-search -p query=BRCA1 -p limit=5
  sciquorum --root ./skills run workflows/review.toml
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Root directory scanned for tool descriptors (overrides [registry] root)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Output format (defaults to [output] format, then text)
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write diagnostic logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the tool catalog
    #[command(subcommand)]
    Tools(ToolsCommand),

    /// Choose tools for a topic
    Select {
        /// Research topic
        topic: String,

        /// Maximum number of tools to choose
        #[arg(short = 'n', long, value_name = "N")]
        max: Option<usize>,

        /// Skip the completion endpoint and rank by keyword overlap
        #[arg(long)]
        offline: bool,
    },

    /// Invoke a single tool
    Invoke(InvokeArgs),

    /// Run a workflow definition to a terminal state
    Run {
        /// Workflow file (TOML)
        workflow: PathBuf,

        /// Override the workflow's topic
        #[arg(long)]
        topic: Option<String>,
    },

    /// Inspect persisted sessions
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
pub enum ToolsCommand {
    /// Scan the root and report what was found (and skipped)
    Scan {
        /// Ignore the snapshot cache and re-parse every descriptor
        #[arg(long)]
        fresh: bool,
    },

    /// Search tools by keyword
    Search {
        query: String,

        #[arg(long)]
        category: Option<String>,

        /// Invocation mode: process, library or remote
        #[arg(long)]
        mode: Option<String>,

        #[arg(long)]
        keyword: Option<String>,
    },

    /// Suggest tools for a topic, best first
    Suggest {
        topic: String,

        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },

    /// Show one tool's descriptor
    Show { name: String },
}

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Tool name
    pub tool: String,

    /// Parameter as key=value (value parsed as JSON when possible)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Timeout in seconds (defaults to [executor] default_timeout_secs)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// List stored sessions, most recent first
    List,
    /// Show one stored session
    Show { id: String },
}
