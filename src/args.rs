use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sp-studio")]
#[command(about = "Prompt editor and session client for the standardized patient service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL (overrides SP_STUDIO_BASE_URL and the stored setting)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Local database path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the service is reachable
    Health,

    /// List preset cases
    Presets,

    /// Poll the service and print connection changes until interrupted
    Watch {
        /// Also poll the session list
        #[arg(long)]
        sessions: bool,
    },

    /// Show or change local settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Prompt templates
    #[command(alias = "p")]
    Prompt {
        #[command(subcommand)]
        action: PromptCommand,
    },

    /// Standardized patient sessions
    #[command(alias = "s")]
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Scoring configuration and statistics
    Scoring {
        #[command(subcommand)]
        action: ScoringCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Show,
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum PromptCommand {
    /// List prompt files
    #[command(alias = "ls")]
    List,

    /// Print a prompt file (offers a stored draft)
    Show { name: String },

    /// Create an empty prompt file
    Create { name: String },

    /// Store a file's content as the local draft without saving
    Edit {
        name: String,
        #[arg(long)]
        file: PathBuf,
    },

    /// Overwrite a prompt file with a local file or its draft
    Save {
        name: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Delete a prompt file and its draft
    #[command(alias = "rm")]
    Delete { name: String },

    /// List backups
    Backups,

    /// Back up a prompt file's current content
    Backup { name: String },

    /// Print a backup
    BackupShow { backup: String },

    /// Copy a backup over a prompt file
    Restore { backup: String, target: String },

    /// List template variables
    Vars { name: String },

    /// Dry-run a prompt against a case
    #[command(group(ArgGroup::new("source").required(true).args(["preset", "context"])))]
    Test {
        name: String,

        /// The doctor's question
        #[arg(short, long)]
        message: String,

        /// Preset case filename
        #[arg(long)]
        preset: Option<String>,

        /// Case data as JSON
        #[arg(long)]
        context: Option<String>,
    },

    /// Show local drafts, or one document's draft
    Draft {
        name: Option<String>,

        #[arg(long, requires = "name")]
        discard: bool,
    },

    /// Tidy whitespace and keep the result as a draft
    Format { name: String },

    /// Show the prompt new sessions use
    Current,

    /// Make a prompt the one new sessions use
    Use { name: String },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    #[command(alias = "ls")]
    List,

    #[command(group(ArgGroup::new("source").required(true).args(["preset", "custom"])))]
    Create {
        id: String,

        /// Preset case filename
        #[arg(long)]
        preset: Option<String>,

        /// Patient data as JSON
        #[arg(long)]
        custom: Option<String>,
    },

    /// Send the doctor's message and print the reply
    Chat { id: String, message: String },

    Info { id: String },

    History { id: String },

    #[command(alias = "rm")]
    Delete { id: String },

    /// Full scoring report
    Report { id: String },

    /// Score summary
    Summary { id: String },

    /// Improvement suggestions
    Suggestions { id: String },

    /// Exam report
    Exam { id: String },

    /// Export the session with its history
    Export { id: String },

    /// Check patient data JSON
    Validate { data: String },
}

#[derive(Subcommand, Debug)]
pub enum ScoringCommand {
    Config { id: String },
    Threshold { id: String, value: f64 },
    Stats,
}
