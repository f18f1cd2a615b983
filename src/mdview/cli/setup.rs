use clap::{Parser, Subcommand, ValueEnum};
use mdview::model::Theme;
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

const SOURCE_HELP: &str =
    "File path, http(s) URL, '-' for stdin, '@sample', or '@N' for the Nth recent document";

#[derive(Parser, Debug)]
#[command(name = "mdv", bin_name = "mdv", version = get_version())]
#[command(about = "Markdown viewer with numbered save-as and a recent list", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a document to HTML
    View {
        #[arg(help = SOURCE_HELP)]
        source: String,

        /// Write a standalone page instead of printing the body
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Highlight this term
        #[arg(short, long)]
        find: Option<String>,

        /// Remember this scroll offset for the document
        #[arg(long)]
        scroll: Option<u64>,
    },

    /// Print the table of contents (H1-H3)
    Toc {
        #[arg(help = SOURCE_HELP)]
        source: String,
    },

    /// Count matches of a term outside code
    Find {
        #[arg(help = SOURCE_HELP)]
        source: String,
        term: String,

        /// Print the highlighted HTML body
        #[arg(long)]
        html: bool,
    },

    /// Edit in $EDITOR, then save (overwrite, or a numbered copy)
    Edit {
        #[arg(help = SOURCE_HELP)]
        source: String,

        /// Never overwrite the file; always save a numbered copy
        #[arg(long)]
        read_only: bool,
    },

    /// Copy the Nth code block to the clipboard
    Copy {
        #[arg(help = SOURCE_HELP)]
        source: String,
        number: usize,
    },

    /// Print (and copy) a share link for a URL document
    Share {
        url: String,

        /// Viewer page the link points at (overrides config share-base)
        #[arg(long)]
        base: Option<String>,
    },

    /// Recent documents
    Recent {
        #[command(subcommand)]
        action: Option<RecentAction>,
    },

    /// Show, set or cycle the theme
    Theme {
        #[arg(value_enum)]
        choice: Option<ThemeChoice>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RecentAction {
    /// List entries, newest first
    List {
        /// Case-insensitive match on title, subtitle or kind
        filter: Option<String>,
    },
    /// Remove the Nth entry
    Rm { number: usize },
    /// Remove every entry
    Clear,
    /// Delete snapshots no entry refers to
    Prune,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeChoice {
    Dark,
    Light,
    Eye,
    Next,
}

impl ThemeChoice {
    pub fn theme(self) -> Option<Theme> {
        match self {
            ThemeChoice::Dark => Some(Theme::Dark),
            ThemeChoice::Light => Some(Theme::Light),
            ThemeChoice::Eye => Some(Theme::Eye),
            ThemeChoice::Next => None,
        }
    }
}

/// Where a document comes from, as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceArg {
    Stdin,
    Sample,
    Recent(usize),
    Url(String),
    Path(PathBuf),
}

impl SourceArg {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == "-" {
            return SourceArg::Stdin;
        }
        if raw == "@sample" {
            return SourceArg::Sample;
        }
        if let Some(n) = raw.strip_prefix('@').and_then(|n| n.parse().ok()) {
            return SourceArg::Recent(n);
        }
        if mdview::fetch::is_url(raw) {
            return SourceArg::Url(raw.to_string());
        }
        SourceArg::Path(PathBuf::from(raw))
    }
}
