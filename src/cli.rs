use aicon_db::models::{DirectoryQuery, SortBy};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Create, inspect and delete generated favicon sets.
#[derive(Parser, Debug)]
#[command(name = "aicon", version, about)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, short, env = "AICON_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// More logging; repeat for more detail.
    #[arg(long, short, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Less logging; repeat for errors only.
    #[arg(long, short, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a favicon set from an image file.
    Create(CreateArgs),
    /// Show a favicon record and its assets.
    Show {
        /// Slug from the published URL (`/f/{slug}`).
        slug: String,
    },
    /// List the public directory.
    List(ListArgs),
    /// Write the original source image of a favicon.
    Source {
        id: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Write one generated asset.
    Asset {
        /// Storage key, as shown by `show`.
        key: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Delete favicons along with every stored file.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Image file; with `--canvas`, a file holding a `data:` URL.
    pub file: PathBuf,
    /// Treat the file as a canvas drawing exported with `toDataURL()`.
    #[arg(long)]
    pub canvas: bool,
    #[arg(long)]
    pub title: Option<String>,
    /// Domain the favicon is for; used in asset file names.
    #[arg(long)]
    pub domain: Option<String>,
    /// Text embedded into every PNG variant.
    #[arg(long)]
    pub metadata: Option<String>,
    /// Print the identifiers without waiting for generation.
    #[arg(long)]
    pub detach: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = DirectoryQuery::DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
    #[arg(long, value_enum, default_value_t = SortArg::Domain)]
    pub sort: SortArg,
    /// Sort descending instead.
    #[arg(long)]
    pub desc: bool,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Write to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Date,
    Url,
    Domain,
}
impl From<SortArg> for SortBy {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Date => SortBy::Date,
            SortArg::Url => SortBy::Url,
            SortArg::Domain => SortBy::Domain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create() {
        let cli = Cli::parse_from(["aicon", "create", "logo.png", "--domain", "test.io", "--detach", "-vv"]);
        assert_eq!(cli.verbose, 2);
        let Command::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.file, PathBuf::from("logo.png"));
        assert_eq!(args.domain.as_deref(), Some("test.io"));
        assert!(args.detach);
        assert!(!args.canvas);
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::parse_from(["aicon", "list"]);
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.page, 1);
        assert_eq!(args.page_size, 100);
        assert_eq!(args.sort, SortArg::Domain);
        assert!(!args.desc);
    }

    #[rstest]
    #[case::delete_needs_ids(&["aicon", "delete"])]
    #[case::verbose_and_quiet(&["aicon", "-v", "-q", "list"])]
    #[case::unknown_sort(&["aicon", "list", "--sort", "size"])]
    fn test_rejected(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
