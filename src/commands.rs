use crate::cli::{CatalogueCommand, SentenceAction, TranslationAction, WordAction, WordRef};
use crate::error::{ErrorKind, Result};
use crate::output::Printer;
use lexi_catalogue::{Catalogue, parse_id};
use lexi_store::models::{SentenceId, TranslationId, WordId};

/// Catalogue failures surface as command failures.
trait CommandExt<T> {
    fn or_command(self) -> Result<T>;
}

impl<T> CommandExt<T> for lexi_catalogue::error::Result<T> {
    #[track_caller]
    fn or_command(self) -> Result<T> {
        self.map_err(ErrorKind::command)
    }
}

fn word_id(input: &str) -> Result<WordId> {
    parse_id("word id", input).or_command()
}

fn translation_id(input: &str) -> Result<TranslationId> {
    parse_id("translation id", input).or_command()
}

fn sentence_id(input: &str) -> Result<SentenceId> {
    parse_id("sentence id", input).or_command()
}

/// Run a catalogue command and print its result.
pub async fn execute(catalogue: &Catalogue, command: CatalogueCommand, printer: Printer) -> Result<()> {
    match command {
        CatalogueCommand::Word { action } => word(catalogue, action, printer).await,
        CatalogueCommand::Translation { action } => translation(catalogue, action, printer).await,
        CatalogueCommand::Sentence { action } => sentence(catalogue, action, printer).await,
        CatalogueCommand::Entry { word_id: id } => printer.print(&catalogue.entry(word_id(&id)?).await.or_command()?),
    }
}

async fn word(catalogue: &Catalogue, action: WordAction, printer: Printer) -> Result<()> {
    match action {
        WordAction::Add { text } => printer.print(&catalogue.create_word(&text).await.or_command()?),
        WordAction::List => printer.print(&catalogue.words().await.or_command()?),
        WordAction::Show { id } => printer.print(&catalogue.word(word_id(&id)?).await.or_command()?),
        WordAction::Find { text } => match catalogue.word_by_text(&text).await.or_command()? {
            Some(word) => printer.print(&word),
            None => printer.message(&format!("no word {text:?}")),
        },
        WordAction::Rename { id, text } => {
            printer.print(&catalogue.rename_word(word_id(&id)?, &text).await.or_command()?)
        },
        WordAction::Rm { id } => {
            catalogue.delete_word(word_id(&id)?).await.or_command()?;
            printer.message(&format!("deleted word {id}"))
        },
    }
}

async fn translation(catalogue: &Catalogue, action: TranslationAction, printer: Printer) -> Result<()> {
    match action {
        TranslationAction::Add { word: WordRef { word_id: Some(id), .. }, text, examples } => {
            let entry = catalogue.create_translation(word_id(&id)?, &text, examples.as_slice()).await;
            printer.print(&entry.or_command()?)
        },
        TranslationAction::Add { word: WordRef { word_text, .. }, text, examples } => {
            // The argument group guarantees the text is present when the id is not.
            let word_text = word_text.unwrap_or_default();
            let entry = catalogue.create_translation_with_word(&word_text, &text, examples.as_slice()).await;
            printer.print(&entry.or_command()?)
        },
        TranslationAction::List { word_id: id } => {
            printer.print(&catalogue.translations(word_id(&id)?).await.or_command()?)
        },
        TranslationAction::Show { id } => {
            printer.print(&catalogue.translation(translation_id(&id)?).await.or_command()?)
        },
        TranslationAction::Update { id, text } => {
            printer.print(&catalogue.update_translation(translation_id(&id)?, &text).await.or_command()?)
        },
        TranslationAction::Rm { id } => {
            catalogue.delete_translation(translation_id(&id)?).await.or_command()?;
            printer.message(&format!("deleted translation {id}"))
        },
    }
}

async fn sentence(catalogue: &Catalogue, action: SentenceAction, printer: Printer) -> Result<()> {
    match action {
        SentenceAction::Add { translation_id: id, text } => {
            printer.print(&catalogue.create_example_sentence(translation_id(&id)?, &text).await.or_command()?)
        },
        SentenceAction::List { translation_id: id } => {
            printer.print(&catalogue.example_sentences(translation_id(&id)?).await.or_command()?)
        },
        SentenceAction::Show { id } => {
            printer.print(&catalogue.example_sentence(sentence_id(&id)?).await.or_command()?)
        },
        SentenceAction::Update { id, text } => {
            printer.print(&catalogue.update_example_sentence(sentence_id(&id)?, &text).await.or_command()?)
        },
        SentenceAction::Rm { id } => {
            catalogue.delete_example_sentence(sentence_id(&id)?).await.or_command()?;
            printer.message(&format!("deleted example sentence {id}"))
        },
    }
}
