use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use webnotes_agent::client::DEFAULT_API_URL;
use webnotes_agent::source::{AppleNotes, DirectorySource, NoteSource};
use webnotes_agent::{Error, Result};

#[derive(Parser, Debug)]
#[command(
    name = "webnotes-agent",
    version,
    about = "Keeps a Webnotes account in sync with local notes"
)]
pub struct Cli {
    /// Base URL of the Webnotes API.
    #[arg(long, env = "WEBNOTES_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// File holding the session token.
    #[arg(long, env = "WEBNOTES_CREDENTIALS", global = true)]
    pub credentials: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize this machine through the browser.
    Authorize {
        /// Print the URL instead of opening a browser.
        #[arg(long)]
        no_browser: bool,
    },
    /// Sync on a fixed interval until stopped.
    Run {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 250)]
        interval_secs: u64,
        /// Write rotating log files here instead of stdout.
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Sync once and exit.
    Sync {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Install a macOS launch agent running `run` at login.
    Install {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 250)]
        interval_secs: u64,
    },
    /// Forget the stored session token.
    Logout,
    /// Print version information.
    Version,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    AppleNotes,
    Directory,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Where notes are extracted from.
    #[arg(long, value_enum, default_value_t = SourceKind::AppleNotes)]
    pub source: SourceKind,

    /// Root directory for the `directory` source.
    #[arg(long, required_if_eq("source", "directory"))]
    pub dir: Option<PathBuf>,
}

impl SourceArgs {
    pub fn build(&self) -> Result<Arc<dyn NoteSource>> {
        Ok(match self.source {
            SourceKind::AppleNotes => Arc::new(AppleNotes),
            SourceKind::Directory => Arc::new(DirectorySource::new(self.root()?)),
        })
    }

    fn root(&self) -> Result<PathBuf> {
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| Error::Custom("--dir is required for the directory source".into()))?;
        Ok(dir.canonicalize()?)
    }

    /// Arguments reproducing this selection, with an absolute directory.
    pub fn to_args(&self) -> Result<Vec<String>> {
        Ok(match self.source {
            SourceKind::AppleNotes => vec!["--source".into(), "apple-notes".into()],
            SourceKind::Directory => vec![
                "--source".into(),
                "directory".into(),
                "--dir".into(),
                self.root()?.display().to_string(),
            ],
        })
    }
}
