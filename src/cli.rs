use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Keep a small dictionary of words, their translations and example sentences.
#[derive(Debug, Parser)]
#[command(name = "lexi", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON), layered over the user configuration
    #[arg(short, long, global = true, env = "LEXI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create or upgrade the database schema and exit
    Migrate,
    #[command(flatten)]
    Catalogue(CatalogueCommand),
}

/// Commands that read or change the catalogue.
#[derive(Debug, Subcommand)]
pub enum CatalogueCommand {
    /// Manage words
    Word {
        #[command(subcommand)]
        action: WordAction,
    },
    /// Manage translations of a word
    Translation {
        #[command(subcommand)]
        action: TranslationAction,
    },
    /// Manage example sentences of a translation
    Sentence {
        #[command(subcommand)]
        action: SentenceAction,
    },
    /// Show a word with all its translations and example sentences
    Entry {
        /// Word id
        word_id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum WordAction {
    /// Add a word (or return the existing one with the same text)
    Add { text: String },
    /// List all words
    List,
    /// Show a word by id
    Show { id: String },
    /// Find a word by its exact text
    Find { text: String },
    /// Change a word's text
    Rename { id: String, text: String },
    /// Delete a word with all its translations and example sentences
    Rm { id: String },
}

/// Which word a new translation belongs to.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct WordRef {
    /// Id of an existing word
    #[arg(long = "word")]
    pub word_id: Option<String>,
    /// Word text; the word is created if it doesn't exist
    #[arg(long = "word-text")]
    pub word_text: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum TranslationAction {
    /// Add a translation, optionally with example sentences
    Add {
        #[command(flatten)]
        word: WordRef,
        text: String,
        /// Example sentence (repeatable)
        #[arg(short, long = "example")]
        examples: Vec<String>,
    },
    /// List the translations of a word
    List { word_id: String },
    /// Show a translation by id
    Show { id: String },
    /// Change a translation's text
    Update { id: String, text: String },
    /// Delete a translation with its example sentences
    Rm { id: String },
}

#[derive(Debug, Subcommand)]
pub enum SentenceAction {
    /// Add an example sentence to a translation
    Add { translation_id: String, text: String },
    /// List the example sentences of a translation
    List { translation_id: String },
    /// Show an example sentence by id
    Show { id: String },
    /// Change an example sentence's text
    Update { id: String, text: String },
    /// Delete an example sentence
    Rm { id: String },
}
