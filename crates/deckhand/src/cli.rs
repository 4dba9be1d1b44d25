use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::deck::Direction;
use crate::model::KindTag;

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(author, version, about)]
#[command(long_about = "A slide deck presenter with AI-generated imagery.\n\n\
    Present the deck, edit it from the command line, and generate scene images\n\
    for slides with Gemini.\n\n\
    Examples:\n  \
    deckhand                     Launch presentation (fullscreen)\n  \
    deckhand --windowed          Launch in a window\n  \
    deckhand list                List slides\n  \
    deckhand generate --all      Generate images for every slide lacking one")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch in a window instead of fullscreen
    #[arg(long, global = false)]
    pub windowed: bool,

    /// Start on a specific slide (1-indexed)
    #[arg(long, global = false)]
    pub slide: Option<usize>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List slides
    List {
        /// Only show slides whose title contains this text, or with this number
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one slide in full
    Show {
        /// Slide number (1-indexed)
        number: usize,
    },

    /// Append a new slide
    Add {
        /// Kind of slide to add
        #[arg(long, value_enum, default_value = "content")]
        kind: KindArg,
    },

    /// Duplicate a slide, inserting the copy after it
    Duplicate {
        /// Slide id
        id: u32,
    },

    /// Delete a slide (the last remaining slide cannot be deleted)
    Delete {
        /// Slide id
        id: u32,
    },

    /// Move a slide one position up or down
    Move {
        /// Slide id
        id: u32,

        /// Direction to move
        #[arg(value_enum)]
        direction: DirectionArg,
    },

    /// Edit slide fields
    Edit {
        /// Slide id
        id: u32,

        #[arg(long)]
        title: Option<String>,

        /// Cover slides only
        #[arg(long)]
        subtitle: Option<String>,

        /// Cover slides only
        #[arg(long)]
        author: Option<String>,

        /// Cover slides only
        #[arg(long)]
        date: Option<String>,

        /// Replace the base image (discards any generated image)
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Restore a slide to its built-in version
    Reset {
        /// Slide id
        id: u32,
    },

    /// Restore the whole deck to the built-in slides
    ResetAll {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Export the deck as JSON
    Export {
        /// Output file (defaults to stdout)
        file: Option<PathBuf>,

        /// Export only image overrides (id, imageUrl, generatedImageUrl)
        #[arg(long)]
        legacy: bool,
    },

    /// Import a deck or image overrides from JSON
    Import {
        /// JSON file to import
        file: PathBuf,
    },

    /// Generate slide images with AI
    Generate {
        /// Slide number (1-indexed)
        #[arg(long, conflicts_with = "all")]
        slide: Option<usize>,

        /// Every slide without a generated image
        #[arg(long)]
        all: bool,
    },

    /// Talk to the project assistant
    Chat,

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. image_generation.aspect_ratio, authoring.password)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Cover,
    Content,
}

impl From<KindArg> for KindTag {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Cover => KindTag::Cover,
            KindArg::Content => KindTag::Content,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Up,
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Up => Direction::Up,
            DirectionArg::Down => Direction::Down,
        }
    }
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    /// `RUST_LOG`-style filter derived from the verbosity flags.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn run(self) -> anyhow::Result<()> {
        use crate::commands::{chat, completion, config, deck, generate, transfer};

        match self.command {
            Some(Commands::List { search }) => deck::list(search.as_deref()),
            Some(Commands::Show { number }) => deck::show(number),
            Some(Commands::Add { kind }) => deck::add(kind.into()),
            Some(Commands::Duplicate { id }) => deck::duplicate(id),
            Some(Commands::Delete { id }) => deck::delete(id),
            Some(Commands::Move { id, direction }) => deck::move_slide(id, direction.into()),
            Some(Commands::Edit {
                id,
                title,
                subtitle,
                author,
                date,
                image_url,
            }) => deck::edit(
                id,
                crate::model::SlidePatch {
                    title,
                    subtitle,
                    author,
                    date,
                    image_url,
                    ..Default::default()
                },
            ),
            Some(Commands::Reset { id }) => deck::reset(id),
            Some(Commands::ResetAll { yes }) => deck::reset_all(yes),
            Some(Commands::Export { file, legacy }) => transfer::export(file.as_deref(), legacy),
            Some(Commands::Import { file }) => transfer::import(&file),
            Some(Commands::Generate { slide, all }) => generate::run(slide, all),
            Some(Commands::Chat) => chat::run(),
            Some(Commands::Config { command }) => config::run(command),
            Some(Commands::Completion { shell }) => {
                completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                println!("deckhand {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            None => crate::app::run(self.windowed, self.slide),
        }
    }
}
