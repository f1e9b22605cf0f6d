use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "vidq",
    version,
    about = "Queue media downloads and merge the best video and audio into one container"
)]
pub struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "VIDQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue locators, then download and merge the selected tasks
    Download {
        /// Item or playlist locators
        locators: Vec<String>,

        /// Treat every locator as a playlist
        #[arg(long)]
        playlist: bool,

        /// Read whitespace-separated locators from a file, or `-` for stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Destination directory (defaults to the last one used)
        #[arg(short, long)]
        output: Option<String>,

        /// Put files in a subfolder named after the uploader
        #[arg(long, overrides_with = "no_subfolders")]
        subfolders: bool,

        /// Put files directly in the destination directory
        #[arg(long, overrides_with = "subfolders")]
        no_subfolders: bool,

        /// Queue indices to run, e.g. `1,3,5` (defaults to all)
        #[arg(long, value_delimiter = ',')]
        select: Vec<usize>,
    },

    /// Resolve one item and show what would be fetched
    Inspect {
        locator: String,
    },

    /// List the item locators of a playlist
    Expand {
        playlist: String,
    },

    /// Show or reset the configuration
    Config {
        #[arg(long)]
        show: bool,

        #[arg(long, conflicts_with = "show")]
        reset: bool,
    },
}

impl Commands {
    /// `Some(true)` / `Some(false)` when a subfolder flag was given.
    pub fn subfolder_override(subfolders: bool, no_subfolders: bool) -> Option<bool> {
        match (subfolders, no_subfolders) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }
}
