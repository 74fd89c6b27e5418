//! Gain extraction from rendered or hand-edited filter-chain text.
//!
//! Two spellings of a peaking filter descriptor are in circulation:
//!
//! ```text
//! { type = bq_peaking, freq = 1000, gain = 2.5, q = 0.707 }
//! { "type": "bq_peaking", "freq": 1000, "gain": 2.5, "q": 0.707 }
//! ```
//!
//! Both are read by the same scanner: keys and values may be quoted or bare,
//! the separator may be `=` or `:`, and pairs may be separated by commas or
//! whitespace. Anything that is not a key/value pair is stepped over.
//!
//! A descriptor opens at `type = bq_peaking` and is complete once it has seen
//! both `freq` and `gain`. Descriptors cut short by a `}`, another `type` or
//! end of input are dropped with a warning, as are entries with unparseable
//! numbers or frequencies outside the band set. Nothing in here fails: text
//! without descriptors yields an empty table.

use std::path::Path;

use crate::error::ConfigError;
use crate::gains::GainTable;
use crate::render::PEAKING_FILTER;

/// One lexical item of interest.
#[derive(Debug, PartialEq)]
enum Item<'a> {
    /// `key = value` / `"key": "value"`. Nested values (`{`/`[`) come back empty.
    Pair {
        key: &'a str,
        value: &'a str,
        pos: usize,
    },
    /// A closing `}`.
    Close,
}

/// Permissive key/value scanner. ASCII delimiters only, so every slice
/// boundary is a char boundary.
struct Scanner<'a> {
    src: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            input: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_line(&mut self) {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'\n' {
                break;
            }
        }
    }

    /// Quoted string (without quotes) or a bare word ending at any of `stops`.
    fn word(&mut self, stops: &[u8]) -> &'a str {
        if self.peek() == Some(b'"') {
            self.pos += 1;
            let start = self.pos;
            while self.peek().is_some_and(|b| b != b'"') {
                self.pos += 1;
            }
            let end = self.pos;
            if self.peek() == Some(b'"') {
                self.pos += 1;
            }
            return &self.src[start..end];
        }

        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !b.is_ascii_whitespace() && !stops.contains(&b))
        {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn next_item(&mut self) -> Option<Item<'a>> {
        const KEY_STOPS: &[u8] = b"=:,{}[]\"#";
        const VALUE_STOPS: &[u8] = b",{}[]";

        loop {
            self.skip_ws();
            match self.peek()? {
                b',' | b'{' | b'[' | b']' | b'=' | b':' => {
                    self.pos += 1;
                    continue;
                }
                b'}' => {
                    self.pos += 1;
                    return Some(Item::Close);
                }
                b'#' => {
                    self.skip_line();
                    continue;
                }
                _ => {}
            }

            let pos = self.pos;
            let key = self.word(KEY_STOPS);
            if self.pos == pos {
                // Unterminated quote at end of input or a lone stop byte.
                self.pos += 1;
                continue;
            }

            self.skip_ws();
            if !matches!(self.peek(), Some(b'=' | b':')) {
                continue;
            }
            self.pos += 1;
            self.skip_ws();

            let value = match self.peek() {
                Some(b'{' | b'[') | None => "",
                _ => self.word(VALUE_STOPS),
            };
            return Some(Item::Pair { key, value, pos });
        }
    }
}

/// A peaking descriptor being assembled.
#[derive(Debug)]
struct Pending {
    pos: usize,
    freq: Option<u32>,
    gain: Option<f32>,
    malformed: bool,
}

impl Pending {
    fn new(pos: usize) -> Self {
        Self {
            pos,
            freq: None,
            gain: None,
            malformed: false,
        }
    }

    fn drop_incomplete(self) {
        if self.malformed {
            tracing::warn!(offset = self.pos, "skipping malformed filter descriptor");
        } else {
            tracing::warn!(
                offset = self.pos,
                has_freq = self.freq.is_some(),
                has_gain = self.gain.is_some(),
                "skipping incomplete filter descriptor"
            );
        }
    }
}

/// Extract band gains from filter-chain text.
///
/// # Example
///
/// ```rust
/// use pweq_config::parse_gains;
///
/// let bare = parse_gains("type = bq_peaking, freq = 1000, gain = 2.5");
/// let quoted = parse_gains(r#""type": "bq_peaking", "freq": 1000, "gain": 2.5"#);
///
/// assert_eq!(bare.get(1000), Some(2.5));
/// assert_eq!(bare, quoted);
/// ```
pub fn parse_gains(text: &str) -> GainTable {
    let mut gains = GainTable::new();
    let mut scanner = Scanner::new(text);
    let mut pending: Option<Pending> = None;
    let mut matched = 0usize;

    while let Some(item) = scanner.next_item() {
        let (key, value, pos) = match item {
            Item::Close => {
                if let Some(p) = pending.take() {
                    p.drop_incomplete();
                }
                continue;
            }
            Item::Pair { key, value, pos } => (key, value, pos),
        };

        if key.eq_ignore_ascii_case("type") {
            if let Some(p) = pending.take() {
                p.drop_incomplete();
            }
            if value == PEAKING_FILTER {
                pending = Some(Pending::new(pos));
            }
            continue;
        }

        let Some(p) = pending.as_mut() else {
            continue;
        };

        if key.eq_ignore_ascii_case("freq") {
            match value.parse::<u32>() {
                Ok(freq) => p.freq = Some(freq),
                Err(e) => {
                    tracing::warn!(offset = pos, value, "bad filter frequency: {e}");
                    p.malformed = true;
                }
            }
        } else if key.eq_ignore_ascii_case("gain") {
            match value.parse::<f32>() {
                Ok(gain) if gain.is_finite() => p.gain = Some(gain),
                Ok(_) => {
                    tracing::warn!(offset = pos, value, "non-finite filter gain");
                    p.malformed = true;
                }
                Err(e) => {
                    tracing::warn!(offset = pos, value, "bad filter gain: {e}");
                    p.malformed = true;
                }
            }
        }

        if let Some(Pending {
            freq: Some(freq),
            gain: Some(gain),
            malformed: false,
            ..
        }) = pending
        {
            pending = None;
            matched += 1;
            if let Err(e) = gains.set(freq, gain) {
                tracing::warn!(offset = pos, "skipping filter descriptor: {e}");
            }
        }
    }

    if let Some(p) = pending {
        p.drop_incomplete();
    }

    if matched == 0 {
        tracing::debug!("no peaking filter descriptors found");
    }
    gains
}

/// Read `path` and extract band gains from it.
///
/// Only the read can fail; content problems are logged and skipped.
pub fn load_gains(path: impl AsRef<Path>) -> Result<GainTable, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    Ok(parse_gains(&text))
}
