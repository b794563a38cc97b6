//! Last-error message capture (the Error suite).
//!
//! A plugin that is about to fail can leave a human-readable message for the
//! host. The message is advisory: the last one set wins, and the host reads
//! it after the plugin returns a failure code.

use crate::error::Result;
use crate::handle::Handle;
use crate::zstring::{decode_latin1, StringSuite};

/// Host side of the error suite for one session.
#[derive(Debug, Default)]
pub struct ErrorSuite {
    message: Option<String>,
}

impl ErrorSuite {
    /// Create a suite with no message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message from a length-prefixed string.
    pub fn set_error_from_pstring(&mut self, pstring: &[u8]) -> Result<()> {
        let text = match pstring.split_first() {
            Some((&len, rest)) => decode_latin1(&rest[..usize::from(len).min(rest.len())])?,
            None => String::new(),
        };
        self.store(text);
        Ok(())
    }

    /// Set the message from a null-terminated string.
    pub fn set_error_from_cstring(&mut self, cstring: &[u8]) -> Result<()> {
        let end = cstring.iter().position(|&b| b == 0).unwrap_or(cstring.len());
        let text = decode_latin1(&cstring[..end])?;
        self.store(text);
        Ok(())
    }

    /// Set the message from a string object.
    pub fn set_error_from_zstring(&mut self, zstring: Handle, strings: &StringSuite) -> Result<()> {
        let text = strings.text(zstring)?;
        self.store(text);
        Ok(())
    }

    /// The current message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Take the current message, leaving none.
    pub fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }

    fn store(&mut self, text: String) {
        tracing::debug!(message = %text, "plugin reported error message");
        self.message = Some(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut suite = ErrorSuite::new();
        assert_eq!(suite.message(), None);
        suite.set_error_from_cstring(b"first\0").unwrap();
        suite.set_error_from_pstring(b"\x06second").unwrap();
        assert_eq!(suite.message(), Some("second"));
    }

    #[test]
    fn test_zstring_message() {
        let mut strings = StringSuite::new();
        let mut suite = ErrorSuite::new();
        let z = strings.make_from_text("Not enough memory").unwrap();
        suite.set_error_from_zstring(z, &strings).unwrap();
        assert_eq!(suite.take_message().as_deref(), Some("Not enough memory"));
        assert_eq!(suite.message(), None);
    }

    #[test]
    fn test_unknown_zstring_leaves_message() {
        let strings = StringSuite::new();
        let mut suite = ErrorSuite::new();
        suite.set_error_from_cstring(b"kept").unwrap();
        assert!(suite.set_error_from_zstring(Handle::from_raw(5), &strings).is_err());
        assert_eq!(suite.message(), Some("kept"));
    }

    #[test]
    fn test_pstring_length_is_clamped() {
        let mut suite = ErrorSuite::new();
        suite.set_error_from_pstring(b"\x09abc").unwrap();
        assert_eq!(suite.message(), Some("abc"));
    }
}
