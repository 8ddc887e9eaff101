//! Whitespace tokenizer and text normalization.
//!
//! Tokens are maximal runs of non-whitespace characters, so punctuation stays
//! attached to its word: `"he said, then"` → `[he][said,][then]`.
//!
//! The normalized form of a text joins its tokens with a single space, except
//! that no space precedes a token starting with a clause punctuation mark
//! (`, . ; : ! ?`). Reconstruction of any witness yields exactly this form.

use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A whitespace-delimited token borrowed from its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// Character (not byte) offset of the token's first character.
    pub start: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Tokenize `text` on whitespace, recording character offsets.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut token_start: Option<(usize, usize)> = None; // (byte, char)

    for (char_idx, (byte_idx, ch)) in text.char_indices().enumerate() {
        if ch.is_whitespace() {
            if let Some((b, c)) = token_start.take() {
                tokens.push(Token {
                    text: &text[b..byte_idx],
                    start: c,
                });
            }
        } else if token_start.is_none() {
            token_start = Some((byte_idx, char_idx));
        }
    }
    if let Some((b, c)) = token_start {
        tokens.push(Token {
            text: &text[b..],
            start: c,
        });
    }

    tokens
}

/// Token texts only.
pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Case-folded word set used for similarity scoring.
///
/// Words are runs of alphanumeric characters (and `_`); punctuation and
/// whitespace separate them.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Clause punctuation that attaches to the preceding word.
pub fn is_punctuation_mark(ch: char) -> bool {
    matches!(ch, ',' | '.' | ';' | ':' | '!' | '?')
}

/// `true` if `s` begins with a clause punctuation mark.
pub fn starts_with_punctuation(s: &str) -> bool {
    s.chars().next().is_some_and(is_punctuation_mark)
}

/// Join tokens into normalized form.
pub fn join_tokens<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for token in tokens {
        if !out.is_empty() && !starts_with_punctuation(token) {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}

/// The normalized form of `text`.
pub fn normalize_text(text: &str) -> String {
    join_tokens(text.split_whitespace())
}

/// Remove every whitespace run that directly precedes a punctuation mark.
pub fn strip_space_before_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending.push(ch);
            continue;
        }
        if !is_punctuation_mark(ch) {
            out.push_str(&pending);
        }
        pending.clear();
        out.push(ch);
    }
    out.push_str(&pending);
    out
}

/// Index of the token an anchor at `char_offset` falls in: the last token
/// starting at or before the offset, or 0 when there is none.
pub fn anchor_token_index(text: &str, char_offset: usize) -> usize {
    tokenize(text)
        .iter()
        .rposition(|t| t.start <= char_offset)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
