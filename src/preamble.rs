//! The `#weft!` preamble line.
//!
//! Every weft file opens with a single UTF-8 line, terminated by one `\n`,
//! that names the body, the data source, the stored quantity and its value
//! behavior. The line is the only human-readable part of the format; all
//! fields after the version literal are space-separated tokens at fixed
//! positions, and anything beyond the generation timestamp is ignored.

use std::fmt;

use hifitime::Epoch;

use crate::constants::{WEFT_MAGIC, WEFT_METHOD, WEFT_VERSION};
use crate::value_behavior::ValueBehavior;
use crate::weft_errors::WeftError;

/// Parsed form of the preamble line.
///
/// `timespan` and `generated_at` are informational labels; the remaining
/// fields participate in combine compatibility checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Preamble {
    /// Body or point identifier, e.g. `mars`.
    pub id: String,
    /// Opaque data-source token, e.g. `jpl:horizons`.
    pub data_source: String,
    /// Human-readable covered span, e.g. `2000s` or `1900-2100`.
    pub timespan: String,
    /// Coefficient width literal, e.g. `32bit`.
    pub precision: String,
    /// Stored quantity, e.g. `longitude`.
    pub quantity: String,
    /// Range semantics; absent token means unbounded.
    pub behavior: ValueBehavior,
    /// Generation timestamp label (the part after `generated@`).
    pub generated_at: String,
}

impl Preamble {
    /// Parse the preamble from the head of a file buffer.
    ///
    /// Arguments
    /// -----------------
    /// * `bytes`: Full file contents, starting at offset 0.
    ///
    /// Return
    /// ----------
    /// * The parsed preamble and the byte offset of the first block marker
    ///   (one past the terminating `\n`).
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), WeftError> {
        let newline = bytes
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| WeftError::PreambleInvalid("missing terminating newline".into()))?;
        let line = std::str::from_utf8(&bytes[..newline])
            .map_err(|_| WeftError::PreambleInvalid("preamble is not UTF-8".into()))?;

        let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
        if tokens.len() < 8 {
            return Err(WeftError::PreambleInvalid(format!(
                "too few fields: {line}"
            )));
        }
        if tokens[0] != WEFT_MAGIC {
            return Err(WeftError::PreambleInvalid(format!(
                "bad magic: {}",
                tokens[0]
            )));
        }
        if tokens[1] != WEFT_VERSION {
            return Err(WeftError::PreambleInvalid(format!(
                "unsupported version: {}",
                tokens[1]
            )));
        }

        let id = tokens[2].to_string();
        let data_source = tokens[3].to_string();
        let timespan = tokens[4].to_string();
        let precision = tokens[5].to_string();
        let quantity = tokens[6].to_string();

        // The behavior token is optional: an unbounded quantity goes straight
        // from the quantity to the method literal.
        let (behavior, method_idx) = if tokens[7] == WEFT_METHOD {
            (ValueBehavior::Unbounded, 7)
        } else {
            (ValueBehavior::parse(tokens[7])?, 8)
        };

        match tokens.get(method_idx) {
            Some(&token) if token == WEFT_METHOD => {}
            Some(&token) => {
                return Err(WeftError::PreambleInvalid(format!(
                    "unknown method: {token}"
                )));
            }
            None => {
                return Err(WeftError::PreambleInvalid("missing method field".into()));
            }
        }

        let generated_at = tokens
            .get(method_idx + 1)
            .and_then(|t| t.strip_prefix("generated@"))
            .unwrap_or("")
            .to_string();

        Ok((
            Preamble {
                id,
                data_source,
                timespan,
                precision,
                quantity,
                behavior,
                generated_at,
            },
            newline + 1,
        ))
    }

    /// Check field-for-field compatibility for [`crate::weft_file::WeftFile::combine`].
    ///
    /// Timespan and generation timestamp are recomputed by combine and do not
    /// participate; everything else must match byte-for-byte.
    pub fn check_compatible(&self, other: &Preamble) -> Result<(), WeftError> {
        let fields: [(&'static str, &str, &str); 4] = [
            ("id", &self.id, &other.id),
            ("data_source", &self.data_source, &other.data_source),
            ("precision", &self.precision, &other.precision),
            ("quantity", &self.quantity, &other.quantity),
        ];
        for (field, left, right) in fields {
            if left != right {
                return Err(WeftError::IncompatiblePreambles {
                    field,
                    left: left.to_string(),
                    right: right.to_string(),
                });
            }
        }

        if self.behavior != other.behavior {
            return Err(WeftError::IncompatiblePreambles {
                field: "value_behavior",
                left: self.behavior.to_string(),
                right: other.behavior.to_string(),
            });
        }

        Ok(())
    }

    /// Format an epoch as the preamble's `generated@` label.
    pub fn generation_label(now: Epoch) -> String {
        let (year, month, day, hour, minute, second, _) = now.to_gregorian_utc();
        format!(
            "{:02}-{:02}-{:02}T{:02}:{:02}:{:02}",
            year.rem_euclid(100),
            month,
            day,
            hour,
            minute,
            second
        )
    }
}

impl fmt::Display for Preamble {
    /// Render the canonical single-line form, `\n`-terminated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{WEFT_MAGIC} {WEFT_VERSION} {} {} {} {} {}",
            self.id, self.data_source, self.timespan, self.precision, self.quantity
        )?;
        if let Some(token) = self.behavior.token() {
            write!(f, " {token}")?;
        }
        writeln!(f, " {WEFT_METHOD} generated@{}", self.generated_at)
    }
}
