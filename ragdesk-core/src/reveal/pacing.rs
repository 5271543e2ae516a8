//! Per-character pacing for the typewriter.
//!
//! The delay before the next character depends on the character that was
//! just revealed: code-like tokens go fast, punctuation lingers.

use std::time::Duration;

use super::RevealOptions;

/// Pacing class of a revealed character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// `{}[]()=+-*/<>`
    Operator,
    /// ASCII digit
    Digit,
    /// `.!?`
    SentenceEnd,
    /// `,;:`
    Clause,
    /// A space right after `.!?`
    SentenceGap,
    /// Everything else
    Plain,
}

impl CharClass {
    /// Classify `ch`, given the character revealed before it (if any).
    pub fn of(ch: char, prev: Option<char>) -> Self {
        match ch {
            '{' | '}' | '[' | ']' | '(' | ')' | '=' | '+' | '-' | '*' | '/' | '<' | '>' => {
                CharClass::Operator
            }
            '0'..='9' => CharClass::Digit,
            '.' | '!' | '?' => CharClass::SentenceEnd,
            ',' | ';' | ':' => CharClass::Clause,
            ' ' if matches!(prev, Some('.' | '!' | '?')) => CharClass::SentenceGap,
            _ => CharClass::Plain,
        }
    }

    /// Delay before the next character.
    ///
    /// Computed in microseconds so fractional multipliers stay exact.
    /// Saturates instead of overflowing for absurd option values.
    pub fn delay(&self, options: &RevealOptions) -> Duration {
        let base = options.base_delay_ms.saturating_mul(1000);
        let pause = options.punctuation_pause_ms.saturating_mul(1000);
        let micros = match self {
            CharClass::Operator => base / 10 * 6,
            CharClass::Digit => base / 10 * 8,
            CharClass::SentenceEnd => base.saturating_add(pause),
            CharClass::Clause => base.saturating_add(pause / 2),
            CharClass::SentenceGap => base.saturating_add(pause / 10 * 3),
            CharClass::Plain => base,
        };
        Duration::from_micros(micros)
    }
}

/// Delay to wait after revealing `ch`.
pub fn delay_after(ch: char, prev: Option<char>, options: &RevealOptions) -> Duration {
    CharClass::of(ch, prev).delay(options)
}

/// Sum of the scheduled delays for revealing all of `text`.
///
/// No delay follows the final character, so this is the time from the first
/// character appearing to the last.
pub fn total_delay(text: &str, options: &RevealOptions) -> Duration {
    let chars: Vec<char> = text.chars().collect();
    let count = chars.len().saturating_sub(1);
    (0..count)
        .map(|i| {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            delay_after(chars[i], prev, options)
        })
        .fold(Duration::ZERO, Duration::saturating_add)
}
