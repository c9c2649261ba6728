use serde::{Deserialize, Serialize};

use crate::error::NameError;
use crate::{DEFAULT_EXTENSION, DEFAULT_STEM_DIGITS};

/// Filename convention for uploads: a numeric stem of fixed width, a dot,
/// and a fixed extension (`00042.SST`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingRule {
    /// Number of ASCII digits in the stem.
    #[serde(default = "default_stem_digits")]
    pub stem_digits: usize,

    /// Extension without the leading dot. Compared case-sensitively.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_stem_digits() -> usize {
    DEFAULT_STEM_DIGITS
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.into()
}

impl Default for NamingRule {
    fn default() -> Self {
        Self {
            stem_digits: default_stem_digits(),
            extension: default_extension(),
        }
    }
}

impl NamingRule {
    /// Length in bytes of every conforming name.
    pub fn name_len(&self) -> usize {
        self.stem_digits + 1 + self.extension.len()
    }

    /// Length of the wire header: the name plus its NUL terminator.
    pub fn header_len(&self) -> usize {
        self.name_len() + 1
    }

    /// Checks that the rule itself can produce names.
    pub fn check(&self) -> Result<(), NameError> {
        if self.stem_digits == 0 {
            return Err(NameError::Rule("stem_digits must be at least 1".into()));
        }
        if self.extension.is_empty() || !self.extension.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(NameError::Rule(format!(
                "extension must be non-empty ASCII alphanumeric: {:?}",
                self.extension
            )));
        }
        Ok(())
    }

    /// Validates `name` against the rule.
    ///
    /// Rejects:
    /// - Names of the wrong length
    /// - Stems containing anything other than ASCII digits
    /// - A missing `.` at the stem boundary
    /// - Any other extension
    pub fn validate(&self, name: &str) -> Result<(), NameError> {
        self.check()?;

        let expected = self.name_len();
        if name.len() != expected {
            return Err(NameError::Length {
                expected,
                actual: name.len(),
            });
        }

        let bytes = name.as_bytes();
        let (stem, rest) = bytes.split_at(self.stem_digits);
        if !stem.iter().all(u8::is_ascii_digit) {
            return Err(NameError::Stem {
                digits: self.stem_digits,
                name: name.into(),
            });
        }
        if rest[0] != b'.' {
            return Err(NameError::Separator(name.into()));
        }
        if &rest[1..] != self.extension.as_bytes() {
            return Err(NameError::Extension {
                expected: self.extension.clone(),
                name: name.into(),
            });
        }

        Ok(())
    }

}
