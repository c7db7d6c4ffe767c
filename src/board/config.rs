//! A single board configuration block.
//!
//! A block is a named set of hardware parameters parsed from the
//! colon-delimited board file:
//!
//! ```text
//! [C3]
//!     clkfreq: 80000000
//!     rxpin: 31
//! ```
//!
//! Writes go through [`BoardConfig::set`], which upper-cases the value and
//! silently drops values that fail the rule for the field (clock frequency
//! and pin fields). Everything else is stored verbatim.

use std::collections::HashMap;

/// Clock mode, e.g. `XTAL1+PLL16X`.
pub const CLKMODE: &str = "clkmode";
/// PLL mode. Accepted but not emitted by the formatter.
pub const PLLMODE: &str = "pllmode";
/// Clock frequency in Hz; must be a positive integer.
pub const CLKFREQ: &str = "clkfreq";
/// Console baud rate.
pub const BAUDRATE: &str = "baudrate";
/// Receive pin.
pub const RXPIN: &str = "rxpin";
/// Transmit pin.
pub const TXPIN: &str = "txpin";
/// TV output pin.
pub const TVPIN: &str = "tvpin";
/// Code segment location (`hub` or `flash`).
pub const TEXTSEG: &str = "text";
/// Data segment location (`hub` or `ram`).
pub const DATASEG: &str = "data";
/// External flash size.
pub const FLASHSIZE: &str = "flash-size";
/// External RAM size.
pub const RAMSIZE: &str = "ram-size";
/// Cache driver name.
pub const CACHEDRIVER: &str = "cache-driver";
/// Cache size.
pub const CACHESIZE: &str = "cache-size";
/// First cache driver parameter.
pub const CACHEPARAM1: &str = "cache-param1";
/// Second cache driver parameter.
pub const CACHEPARAM2: &str = "cache-param2";

/// Fields reset by [`BoardConfig::parse`].
const KNOWN_FIELDS: [&str; 14] = [
    CLKMODE,
    CLKFREQ,
    BAUDRATE,
    RXPIN,
    TXPIN,
    TVPIN,
    TEXTSEG,
    DATASEG,
    FLASHSIZE,
    RAMSIZE,
    CACHEDRIVER,
    CACHESIZE,
    CACHEPARAM1,
    CACHEPARAM2,
];

/// Order in which [`BoardConfig::formatted`] emits fields.
pub const FORMAT_ORDER: [&str; 14] = [
    CLKFREQ,
    CLKMODE,
    BAUDRATE,
    RXPIN,
    TXPIN,
    TVPIN,
    TEXTSEG,
    DATASEG,
    FLASHSIZE,
    RAMSIZE,
    CACHEDRIVER,
    CACHESIZE,
    CACHEPARAM1,
    CACHEPARAM2,
];

/// Pins 28 and 29 carry the boot EEPROM bus.
const RESERVED_PINS: [i32; 2] = [28, 29];

/// Outcome of parsing a configuration body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Lines that looked like `field: value` assignments, accepted or not.
    pub assignments: usize,
    /// Set when the body could not be parsed at all.
    pub failure: Option<String>,
}

impl ParseReport {
    /// Number of fields parsed; zero when the parse failed.
    pub fn count(&self) -> usize {
        if self.failure.is_some() {
            0
        } else {
            self.assignments
        }
    }

    /// Whether the body was readable.
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// One board's configuration block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardConfig {
    name: String,
    fields: HashMap<String, String>,
}

impl BoardConfig {
    /// Create an empty, unnamed config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with the given board name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: HashMap::new(),
        }
    }

    /// Board name as written between the brackets.
    pub fn board_name(&self) -> &str {
        &self.name
    }

    /// Rename the board. No validation.
    pub fn set_board_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Stored value of `field`, or an empty string.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    /// Store `value` under `field` if it passes the field's rule.
    ///
    /// The value is upper-cased first. Rules are selected by substring, so
    /// any field whose name contains `clkfreq` gets the clock rule and any
    /// containing `rxpin`/`txpin`/`tvpin` gets the pin rule. Returns whether
    /// the value was stored; a rejected value leaves the field unchanged.
    pub fn set(&mut self, field: &str, value: &str) -> bool {
        let value = value.to_uppercase();

        let accepted = if field.contains(CLKFREQ) {
            is_valid_clock(&value)
        } else if field.contains(RXPIN) || field.contains(TXPIN) || field.contains(TVPIN) {
            is_valid_pin(&value)
        } else {
            true
        };

        if accepted {
            self.fields.insert(field.to_string(), value);
        } else {
            tracing::debug!(board = %self.name, field, value = %value, "rejected board field value");
        }
        accepted
    }

    /// Parse a configuration body, replacing all known fields.
    ///
    /// Input that is not valid UTF-8 fails the whole parse; the report's
    /// [`count`](ParseReport::count) is then zero and the fields are left
    /// reset to empty.
    pub fn parse(&mut self, raw: impl AsRef<[u8]>) -> ParseReport {
        self.reset();

        let text = match std::str::from_utf8(raw.as_ref()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(board = %self.name, "board config is not valid UTF-8: {e}");
                return ParseReport {
                    assignments: 0,
                    failure: Some(e.to_string()),
                };
            }
        };

        let mut assignments = 0;
        for line in text.split('\n') {
            let line = strip_comment(line).trim();
            if let Some((field, value)) = line.split_once(':') {
                self.set(field, value.trim());
                assignments += 1;
            }
        }

        ParseReport {
            assignments,
            failure: None,
        }
    }

    /// Parse a text body and return the number of assignment lines.
    pub fn parse_config(&mut self, text: &str) -> usize {
        self.parse(text).count()
    }

    /// Non-empty fields in format order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        FORMAT_ORDER
            .iter()
            .map(move |&field| (field, self.get(field)))
            .filter(|(_, value)| !value.is_empty())
    }

    /// Render the block in board-file syntax.
    ///
    /// Only fields with a non-empty value are written. The block ends with a
    /// blank line so blocks can be concatenated.
    pub fn formatted(&self) -> String {
        let mut out = format!("[{}]\n", self.name);
        for (field, value) in self.fields() {
            out.push_str("    ");
            out.push_str(field);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out
    }

    fn reset(&mut self) {
        self.fields.clear();
        for field in KNOWN_FIELDS {
            self.fields.insert(field.to_string(), String::new());
        }
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn is_valid_clock(value: &str) -> bool {
    value.parse::<i64>().map(|hz| hz > 0).unwrap_or(false)
}

fn is_valid_pin(value: &str) -> bool {
    value
        .parse::<i32>()
        .map(|pin| (0..32).contains(&pin) && !RESERVED_PINS.contains(&pin))
        .unwrap_or(false)
}
