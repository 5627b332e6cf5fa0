//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::ExerciseFilter;

#[derive(Parser, Debug)]
#[command(
    name = "exercise-sync",
    version,
    about = "Mirror the exercise catalog API into a local document store"
)]
pub struct Cli {
    /// Extra configuration file, layered over config/default.toml and config/local.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Selected command; a bare invocation runs a sync
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Sync)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create indexes, fetch the whole catalog and print a summary
    Sync,

    /// Print statistics about the stored collection
    Stats,

    /// Print one stored exercise as JSON
    Show {
        /// Exercise id
        id: String,
    },

    /// Find exercises whose name contains QUERY (case-insensitive)
    Search {
        query: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// List exercises matching every given criterion (case-insensitive)
    Filter {
        #[command(flatten)]
        criteria: FilterArgs,

        /// Maximum number of results
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// List the body parts, equipment and target muscles in the store
    Filters,
}

/// Criteria of the `filter` command; `all` disables a criterion
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterArgs {
    /// Name contains this text
    #[arg(long)]
    pub search: Option<String>,

    /// Target or secondary muscle
    #[arg(long, visible_alias = "target")]
    pub muscle: Option<String>,

    #[arg(long)]
    pub body_part: Option<String>,

    #[arg(long)]
    pub equipment: Option<String>,
}

impl From<&FilterArgs> for ExerciseFilter {
    fn from(args: &FilterArgs) -> Self {
        Self {
            search: args.search.clone(),
            muscle: args.muscle.clone(),
            body_part: args.body_part.clone(),
            equipment: args.equipment.clone(),
        }
    }
}
