//! Output formatting options
//!
//! Hosts pass these as a JSON object, e.g.
//! `{"style": "both", "base": 10, "minExp": 8, "maxDigits": 4096}`.
//! Every field is optional.

use crate::error::{Error, Result};
use crate::expansion::Expansion;
use crate::fraction::Fraction;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE: u32 = 10;
pub const DEFAULT_MIN_EXP: usize = 8;
pub const DEFAULT_MAX_DIGITS: usize = 4096;
/// Upper bound on `maxDigits`; one digit costs a byte plus a bignum step
pub const MAX_DIGITS_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStyle {
    /// Canonical `n/d`
    #[default]
    Fraction,
    /// Positional digits with a repeating block
    Expansion,
    /// `n/d = digits`
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FormatOptions {
    pub style: DisplayStyle,
    pub base: u32,
    pub min_exp: usize,
    pub max_digits: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions {
            style: DisplayStyle::default(),
            base: DEFAULT_BASE,
            min_exp: DEFAULT_MIN_EXP,
            max_digits: DEFAULT_MAX_DIGITS,
        }
    }
}

impl FormatOptions {
    /// Parse options from JSON. Empty text and `null` give the defaults.
    pub fn from_json(text: &str) -> Result<FormatOptions> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(FormatOptions::default());
        }
        let options: Option<FormatOptions> = serde_json::from_str(text)?;
        let options = options.unwrap_or_default();
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !(2..=36).contains(&self.base) {
            return Err(Error::InvalidOptions(format!(
                "base must be between 2 and 36, got {}",
                self.base
            )));
        }
        check_max_digits(self.max_digits)
    }

    /// Render a fraction according to the selected style
    pub fn format(&self, value: &Fraction) -> Result<String> {
        match self.style {
            DisplayStyle::Fraction => Ok(value.to_string()),
            DisplayStyle::Expansion => Ok(self.expand(value)?.to_string()),
            DisplayStyle::Both => {
                let text = value.to_string();
                let expansion = self.expand(value)?.to_string();
                if text == expansion {
                    Ok(text)
                } else {
                    Ok(format!("{} = {}", text, expansion))
                }
            }
        }
    }

    fn expand(&self, value: &Fraction) -> Result<Expansion> {
        Expansion::new(value, self.base, self.min_exp, self.max_digits)
    }
}

pub fn check_max_digits(max_digits: usize) -> Result<()> {
    if max_digits > MAX_DIGITS_LIMIT {
        return Err(Error::InvalidOptions(format!(
            "maxDigits must be at most {}, got {}",
            MAX_DIGITS_LIMIT, max_digits
        )));
    }
    Ok(())
}
