//! Command arguments
//!
//! An insertion-ordered argument map. Order matters because commands are
//! serialized back in the order their arguments were read.

use std::fmt;

/// Key of a command argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKey {
    /// Letter-prefixed argument such as `X` or `E`
    Letter(char),
    /// Keyword-less argument (free text after M117, checksums)
    Bare,
}

/// Value of a command argument
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Written without a decimal point
    Int(i64),
    /// Written with a decimal point, or produced by arithmetic
    Float(f64),
    /// Free text
    Text(String),
}

impl ArgValue {
    /// Parse a numeric argument: integer when there is no decimal point
    pub fn parse_number(text: &str) -> Option<Self> {
        if text.contains('.') {
            text.parse().ok().map(ArgValue::Float)
        } else {
            text.parse().ok().map(ArgValue::Int)
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Int(value) => Some(*value as f64),
            ArgValue::Float(value) => Some(*value),
            ArgValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Int(value) => write!(f, "{value}"),
            ArgValue::Float(value) => {
                // Plain decimal, never an exponent; whole numbers keep ".0"
                let text = value.to_string();
                if value.is_finite() && !text.contains('.') {
                    write!(f, "{text}.0")
                } else {
                    f.write_str(&text)
                }
            }
            ArgValue::Text(text) => f.write_str(text),
        }
    }
}

/// Ordered map of command arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgMap {
    entries: Vec<(ArgKey, Option<ArgValue>)>,
}

impl ArgMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an argument. An existing key keeps its position.
    pub fn insert(&mut self, key: ArgKey, value: Option<ArgValue>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: ArgKey) -> Option<&Option<ArgValue>> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, letter: char) -> bool {
        self.get(ArgKey::Letter(letter)).is_some()
    }

    /// Numeric value of a letter argument, if present and numeric
    pub fn number(&self, letter: char) -> Option<f64> {
        self.get(ArgKey::Letter(letter))?
            .as_ref()
            .and_then(ArgValue::as_f64)
    }

    /// Set a letter argument to a float value
    pub fn set_number(&mut self, letter: char, value: f64) {
        self.insert(ArgKey::Letter(letter), Some(ArgValue::Float(value)));
    }

    pub fn remove(&mut self, letter: char) -> Option<Option<ArgValue>> {
        let index = self
            .entries
            .iter()
            .position(|(k, _)| *k == ArgKey::Letter(letter))?;
        Some(self.entries.remove(index).1)
    }

    /// Add `amount` to a numeric letter argument. Returns false when the
    /// argument is absent or not numeric.
    pub fn offset(&mut self, letter: char, amount: f64) -> bool {
        self.update(letter, |value| value + amount)
    }

    /// Multiply a numeric letter argument by `factor`
    pub fn scale(&mut self, letter: char, factor: f64) -> bool {
        self.update(letter, |value| value * factor)
    }

    fn update(&mut self, letter: char, op: impl FnOnce(f64) -> f64) -> bool {
        match self.number(letter) {
            Some(current) => {
                self.set_number(letter, op(current));
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ArgKey, Option<ArgValue>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ArgMap {
    /// Renders the arguments the way they appear in a toolpath line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if let ArgKey::Letter(letter) = key {
                write!(f, "{letter}")?;
            }
            if let Some(value) = value {
                write!(f, "{value}")?;
            }
        }
        Ok(())
    }
}
