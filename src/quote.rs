use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::openai::OpenAiClient;

const SYSTEM_PROMPT: &str = concat!(
    "You are a motivational quote generator. Generate inspiring, uplifting quotes ",
    "that are original and meaningful. Always provide both the quote text and the ",
    "author name. Keep quotes concise but impactful."
);
const USER_PROMPT: &str = "Generate a motivational quote with the format: 'Quote text' - Author Name";
const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.8;

const FALLBACK_TEXT: &str = "The future belongs to those who believe in the beauty of their dreams.";
const FALLBACK_AUTHOR: &str = "Eleanor Roosevelt";
const PLACEHOLDER_AUTHOR: &str = "AI Inspiration";

const QUOTE_MARKS: [char; 3] = ['"', '\u{201C}', '\u{201D}'];
const DASHES: [char; 2] = ['-', '\u{2014}'];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

impl Quote {
    pub fn fallback() -> Self {
        Self {
            text: FALLBACK_TEXT.to_string(),
            author: FALLBACK_AUTHOR.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuoteRequestHandler {
    provider: OpenAiClient,
    timeout: Duration,
}

impl QuoteRequestHandler {
    pub fn new(provider: OpenAiClient, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Always yields a quote; provider trouble degrades to the fixed fallback.
    pub async fn fetch_quote(&self) -> Quote {
        match self
            .provider
            .complete_chat(SYSTEM_PROMPT, USER_PROMPT, MAX_TOKENS, TEMPERATURE, self.timeout)
            .await
        {
            Ok(raw) => {
                let quote = parse_quote(&raw);
                if quote.text.is_empty() {
                    warn!(raw = %raw, "quote reply had no usable text, using fallback");
                    Quote::fallback()
                } else {
                    quote
                }
            }
            Err(err) => {
                warn!(error = %err, "quote provider failed, using fallback");
                Quote::fallback()
            }
        }
    }
}

/// Best-effort parse of a free-text reply: `"text" - author`, then any dash
/// split, then the whole reply under a placeholder author.
pub fn parse_quote(raw: &str) -> Quote {
    let raw = raw.trim();
    if let Some(quote) = parse_quoted(raw) {
        return quote;
    }

    let mut parts = raw.split(DASHES);
    if let (Some(text), Some(author)) = (parts.next(), parts.next()) {
        return Quote {
            text: strip_quote_marks(text).to_string(),
            author: author.trim().to_string(),
        };
    }

    Quote {
        text: strip_quote_marks(raw).to_string(),
        author: PLACEHOLDER_AUTHOR.to_string(),
    }
}

fn parse_quoted(raw: &str) -> Option<Quote> {
    let body = raw.strip_prefix(QUOTE_MARKS)?;
    let close = body.find(QUOTE_MARKS)?;
    let text = &body[..close];
    if text.is_empty() {
        return None;
    }
    let rest = body[close..].strip_prefix(QUOTE_MARKS)?.trim_start();
    let author = rest.strip_prefix(DASHES)?.trim();
    if author.is_empty() {
        return None;
    }
    Some(Quote {
        text: text.trim().to_string(),
        author: author.to_string(),
    })
}

fn strip_quote_marks(value: &str) -> &str {
    let value = value.trim();
    let value = value.strip_prefix(QUOTE_MARKS).unwrap_or(value);
    let value = value.strip_suffix(QUOTE_MARKS).unwrap_or(value);
    value.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_text_with_author() {
        let quote = parse_quote("\"Dream big, start small.\" - Ada Lovelace");
        assert_eq!(quote.text, "Dream big, start small.");
        assert_eq!(quote.author, "Ada Lovelace");
    }

    #[test]
    fn parses_curly_quotes_and_em_dash() {
        let quote = parse_quote("\u{201C}Keep going, even-handedly.\u{201D} \u{2014} Jane Doe");
        assert_eq!(quote.text, "Keep going, even-handedly.");
        assert_eq!(quote.author, "Jane Doe");
    }

    #[test]
    fn falls_back_to_dash_split() {
        let quote = parse_quote("Believe you can - Theodore Roosevelt");
        assert_eq!(quote.text, "Believe you can");
        assert_eq!(quote.author, "Theodore Roosevelt");
    }

    #[test]
    fn dash_split_keeps_only_second_segment_as_author() {
        let quote = parse_quote("'Rise early' - John Smith - 1999");
        assert_eq!(quote.text, "'Rise early'");
        assert_eq!(quote.author, "John Smith");
    }

    #[test]
    fn whole_text_becomes_quote_without_separator() {
        let quote = parse_quote("\"Every day is a fresh start.\"");
        assert_eq!(quote.text, "Every day is a fresh start.");
        assert_eq!(quote.author, PLACEHOLDER_AUTHOR);
    }

    #[test]
    fn fallback_quote_is_fixed() {
        let quote = Quote::fallback();
        assert_eq!(
            quote.text,
            "The future belongs to those who believe in the beauty of their dreams."
        );
        assert_eq!(quote.author, "Eleanor Roosevelt");
    }
}
