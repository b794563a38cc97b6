//! Per-key flags from the plugin's declared scripting dictionary.
//!
//! Parsing the plugin's AETE resource happens elsewhere; the suites only need
//! the resulting key to flags lookup when they tag a stored value.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One parameter declared by the plugin's scripting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AeteParameter {
    /// Parameter key.
    pub key: u32,
    /// Declared value type.
    pub type_id: u32,
    /// Declared flags.
    pub flags: i32,
}

/// Key to flags lookup built from the plugin's scripting dictionary.
///
/// A plugin without scripting info gets an empty dictionary, and every key
/// reads back flags `0`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptingDictionary {
    flags: HashMap<u32, i32>,
}

impl ScriptingDictionary {
    /// Dictionary for a plugin that declared no scripting info.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the lookup from declared parameters. Later declarations win.
    pub fn from_parameters(parameters: impl IntoIterator<Item = AeteParameter>) -> Self {
        Self {
            flags: parameters.into_iter().map(|p| (p.key, p.flags)).collect(),
        }
    }

    /// Flags declared for `key`, or `0`.
    pub fn flags_for(&self, key: u32) -> i32 {
        self.flags.get(&key).copied().unwrap_or(0)
    }

    /// Whether the plugin declared anything.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::fourcc;

    #[test]
    fn test_undeclared_key_has_no_flags() {
        let dict = ScriptingDictionary::empty();
        assert!(dict.is_empty());
        assert_eq!(dict.flags_for(fourcc(b"Amnt")), 0);
    }

    #[test]
    fn test_declared_flags() {
        let dict = ScriptingDictionary::from_parameters([
            AeteParameter { key: fourcc(b"Amnt"), type_id: fourcc(b"long"), flags: 0x2000 },
            AeteParameter { key: fourcc(b"Rds "), type_id: fourcc(b"UntF"), flags: 0x0800 },
        ]);
        assert_eq!(dict.flags_for(fourcc(b"Amnt")), 0x2000);
        assert_eq!(dict.flags_for(fourcc(b"Rds ")), 0x0800);
        assert_eq!(dict.flags_for(fourcc(b"none")), 0);
    }
}
