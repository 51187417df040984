// Text processing boundary
//
// Tokenization, detokenization and subword encoding belong to a separate
// component. The relay only needs the two calls on `TextProcessor`; the
// plain implementation here splits sentences and leaves tokens untouched so
// that engines with built-in SentencePiece work out of the box.

use tracing::debug;

use crate::config::ServiceEntry;
use crate::pair::LanguagePair;

#[cfg_attr(test, mockall::automock)]
pub trait TextProcessor: Send + Sync {
    /// Split source text into engine-ready sentences, in order
    fn preprocess(&self, text: &str) -> Vec<String>;

    /// Turn engine output lines back into display sentences, in order
    fn postprocess(&self, lines: Vec<String>) -> Vec<String>;
}

/// Sentence splitter without subword handling
#[derive(Debug, Clone)]
pub struct PlainTextProcessor {
    pair: LanguagePair,
}

impl PlainTextProcessor {
    pub fn new(pair: LanguagePair) -> Self {
        Self { pair }
    }

    /// Split one line at `.`, `!` or `?` followed by whitespace and an
    /// uppercase letter, keeping the punctuation with its sentence
    fn split_line(line: &str, out: &mut Vec<String>) {
        let mut current = String::new();
        let mut chars = line.chars().peekable();

        while let Some(ch) = chars.next() {
            current.push(ch);

            if matches!(ch, '.' | '!' | '?') {
                let Some(&next) = chars.peek() else { continue };
                if !next.is_whitespace() {
                    continue;
                }
                let starts_upper = chars
                    .clone()
                    .find(|c| !c.is_whitespace())
                    .is_some_and(char::is_uppercase);
                if starts_upper {
                    let sentence = current.trim();
                    if !sentence.is_empty() {
                        out.push(sentence.to_string());
                    }
                    current.clear();
                }
            }
        }

        let rest = current.trim();
        if !rest.is_empty() {
            out.push(rest.to_string());
        }
    }
}

impl TextProcessor for PlainTextProcessor {
    fn preprocess(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        for line in text.lines() {
            Self::split_line(line, &mut sentences);
        }
        debug!("{}: split input into {} sentences", self.pair, sentences.len());
        sentences
    }

    fn postprocess(&self, lines: Vec<String>) -> Vec<String> {
        lines.into_iter().map(|l| l.trim().to_string()).collect()
    }
}

/// Factory for per-pair text processors
pub struct TextProcessorFactory;

impl TextProcessorFactory {
    pub fn create_processor(pair: &LanguagePair, entry: &ServiceEntry) -> Box<dyn TextProcessor> {
        if entry.sourcespm.is_some() || entry.sourcebpe.is_some() {
            debug!("{}: subword models are left to the engine", pair);
        }
        Box::new(PlainTextProcessor::new(pair.clone()))
    }
}
