//! INFO column decoding.

use std::collections::{HashMap, HashSet};

/// Raw value of one INFO entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoValue {
    /// Key present without `=`.
    Flag,
    /// Unescaped text after the first `=`; multi-valued entries stay
    /// comma-joined.
    Text(String),
}

impl InfoValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Flag => None,
            Self::Text(text) => Some(text),
        }
    }
}

/// INFO entries of one record, keyed by raw INFO key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoAttributes {
    entries: HashMap<String, InfoValue>,
}

impl InfoAttributes {
    /// Split an INFO column on `;` then on the first `=`.
    ///
    /// Keys in `skip` are dropped, as are entries whose value is `.` or
    /// empty. Escaped delimiters in values are unescaped.
    pub fn parse(info: &str, skip: &HashSet<String>) -> Self {
        let mut entries = HashMap::new();

        for token in info.split(';') {
            if token.is_empty() || token == "." {
                continue;
            }

            let (key, value) = match token.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (token, None),
            };
            if skip.contains(key) {
                continue;
            }

            match value {
                None => {
                    entries.insert(key.to_string(), InfoValue::Flag);
                }
                Some("") | Some(".") => {}
                Some(value) => {
                    entries.insert(key.to_string(), InfoValue::Text(unescape(value)));
                }
            }
        }

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.entries.get(key)
    }

    /// Text value of a key; `None` for absent keys and flags.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(InfoValue::as_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace the `\x3b`, `\x2c` and `\x3d` escapes with `;`, `,` and `=`.
pub fn unescape(value: &str) -> String {
    if !value.contains("\\x") {
        return value.to_string();
    }

    value
        .replace("\\x3b", ";")
        .replace("\\x2c", ",")
        .replace("\\x3d", "=")
}
