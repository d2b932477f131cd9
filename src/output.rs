use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use lexi_catalogue::{TranslationEntry, WordEntry};
use lexi_store::models::{ExampleSentence, Translation, Word};
use serde::Serialize;
use std::io::{self, Write};

/// Plain-text rendering of a command result.
pub trait Render {
    fn render(&self, w: &mut dyn Write) -> io::Result<()>;
}

impl Render for Word {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}", self.id, self.text)
    }
}

impl Render for Translation {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}\t(word {})", self.id, self.text, self.word_id)
    }
}

impl Render for ExampleSentence {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}\t(translation {})", self.id, self.text, self.translation_id)
    }
}

impl Render for TranslationEntry {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "[{}] {}", self.translation.id, self.translation.text)?;
        for sentence in &self.sentences {
            writeln!(w, "    [{}] {}", sentence.id, sentence.text)?;
        }
        Ok(())
    }
}

impl Render for WordEntry {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "[{}] {}", self.word.id, self.word.text)?;
        for entry in &self.translations {
            write!(w, "  ")?;
            entry.render(w)?;
        }
        Ok(())
    }
}

impl<T: Render> Render for Vec<T> {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        self.iter().try_for_each(|item| item.render(w))
    }
}

impl<T: Render> Render for Option<T> {
    fn render(&self, w: &mut dyn Write) -> io::Result<()> {
        match self {
            Some(item) => item.render(w),
            None => Ok(()),
        }
    }
}

/// Writes command results to stdout as text or JSON.
#[derive(Clone, Copy, Debug)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn print<T: Serialize + Render>(&self, value: &T) -> Result<()> {
        self.write_to(&mut io::stdout().lock(), value)
    }

    pub fn message(&self, text: &str) -> Result<()> {
        if self.json {
            return Ok(());
        }
        writeln!(io::stdout().lock(), "{text}").or_raise(|| ErrorKind::Output)
    }

    fn write_to<T: Serialize + Render>(&self, w: &mut dyn Write, value: &T) -> Result<()> {
        if self.json {
            serde_json::to_writer_pretty(&mut *w, value).or_raise(|| ErrorKind::Output)?;
            writeln!(w).or_raise(|| ErrorKind::Output)
        } else {
            value.render(w).or_raise(|| ErrorKind::Output)
        }
    }
}
