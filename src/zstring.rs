//! Reference-counted string objects (the ASZString suite).
//!
//! Plugins never exchange raw text with the host. They create a string
//! object from one of three source encodings, pass its [`Handle`] around, and
//! materialize it back into a buffer they own. Handle `0` is the shared
//! Empty string: it is never allocated and never freed.
//!
//! Single-byte encodings decode as ISO-8859-1, so every byte maps to exactly
//! one `char` and back again.

use crate::error::{Result, SuiteError};
use crate::handle::{Handle, HandleRegistry};

/// Longest payload a length-prefixed string can carry.
pub const PASCAL_MAX_LEN: usize = 255;

/// Source encoding handed to [`StringSuite::make_from`].
#[derive(Debug, Clone, Copy)]
pub enum StringSource<'a> {
    /// Null-terminated single-byte text.
    AnsiCString(&'a [u8]),
    /// Null-terminated UTF-16 text, in 16-bit units.
    UnicodeCString(&'a [u16]),
    /// Length-prefixed single-byte text; the first byte is the length.
    PascalString(&'a [u8]),
}

impl StringSource<'_> {
    fn is_empty(&self) -> bool {
        match self {
            StringSource::AnsiCString(b) | StringSource::PascalString(b) => b.is_empty(),
            StringSource::UnicodeCString(u) => u.is_empty(),
        }
    }
}

/// A live string object.
#[derive(Debug)]
struct ZString {
    ref_count: u32,
    text: String,
}

/// Host side of the string suite for one session.
#[derive(Debug)]
pub struct StringSuite {
    strings: HandleRegistry<ZString>,
}

impl Default for StringSuite {
    fn default() -> Self {
        Self::new()
    }
}

impl StringSuite {
    /// Create an empty suite.
    pub fn new() -> Self {
        Self {
            strings: HandleRegistry::new("zstring"),
        }
    }

    /// The shared Empty string.
    pub fn get_empty(&self) -> Handle {
        Handle::NULL
    }

    /// Decode `source` into a new string object.
    ///
    /// Zero-length input and input that decodes to nothing both yield the
    /// Empty handle.
    pub fn make_from(&mut self, source: StringSource<'_>) -> Result<Handle> {
        if source.is_empty() {
            return Ok(Handle::NULL);
        }
        let text = decode(source)?;
        self.make_from_text(text)
    }

    /// Wrap host-provided text in a new string object.
    pub fn make_from_text(&mut self, text: impl Into<String>) -> Result<Handle> {
        let text = text.into();
        if text.is_empty() {
            return Ok(Handle::NULL);
        }
        self.strings.allocate(ZString { ref_count: 1, text })
    }

    /// Decimal rendering of an integer.
    pub fn make_romanization_of_integer(&mut self, value: i32) -> Result<Handle> {
        self.make_from_text(value.to_string())
    }

    /// Decimal rendering of a 16.16 fixed-point number.
    pub fn make_romanization_of_fixed(&mut self, value: i32) -> Result<Handle> {
        self.make_from_text((f64::from(value) / 65536.0).to_string())
    }

    /// Decimal rendering of a double.
    pub fn make_romanization_of_double(&mut self, value: f64) -> Result<Handle> {
        self.make_from_text(value.to_string())
    }

    /// Duplicate the text of `handle` into a new object with reference count 1.
    pub fn copy(&mut self, handle: Handle) -> Result<Handle> {
        if handle.is_null() {
            return Ok(Handle::NULL);
        }
        let text = try_clone(&self.strings.get(handle)?.text)?;
        self.strings.allocate(ZString { ref_count: 1, text })
    }

    /// Increment the reference count.
    pub fn add_ref(&mut self, handle: Handle) -> Result<()> {
        if handle.is_null() {
            return Ok(());
        }
        let entry = self.strings.get_mut(handle)?;
        entry.ref_count = entry.ref_count.saturating_add(1);
        Ok(())
    }

    /// Decrement the reference count, deleting the object when it reaches zero.
    pub fn release(&mut self, handle: Handle) -> Result<()> {
        if handle.is_null() {
            return Ok(());
        }
        let entry = self.strings.get_mut(handle)?;
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            self.strings.remove(handle)?;
        }
        Ok(())
    }

    /// Whether the text contains a `^index` placeholder.
    pub fn will_replace(&self, handle: Handle, index: u32) -> Result<bool> {
        let token = format!("^{index}");
        Ok(self.text_ref(handle)?.contains(&token))
    }

    /// Substitute every `^index` placeholder with the text of `replacement`.
    pub fn replace(&mut self, handle: Handle, index: u32, replacement: Handle) -> Result<()> {
        if handle.is_null() {
            return Ok(());
        }
        let with = self.text_ref(replacement)?.to_owned();
        let token = format!("^{index}");
        let entry = self.strings.get_mut(handle)?;
        if entry.text.contains(&token) {
            entry.text = entry.text.replace(&token, &with);
        }
        Ok(())
    }

    /// Drop a trailing literal `"..."`.
    pub fn trim_ellipsis(&mut self, handle: Handle) -> Result<()> {
        self.edit(handle, |text| {
            if text.ends_with("...") {
                text.truncate(text.len() - 3);
            }
        })
    }

    /// Strip leading and trailing ASCII spaces.
    pub fn trim_spaces(&mut self, handle: Handle) -> Result<()> {
        self.edit(handle, |text| {
            let trimmed = text.trim_matches(' ');
            if trimmed.len() != text.len() {
                *text = trimmed.to_owned();
            }
        })
    }

    /// Remove `&` mnemonic markers, keeping `&&` as a literal ampersand pair.
    pub fn remove_accelerators(&mut self, handle: Handle) -> Result<()> {
        self.edit(handle, |text| *text = strip_accelerators(text))
    }

    /// Whether every character is whitespace. Vacuously true for Empty.
    pub fn is_all_whitespace(&self, handle: Handle) -> Result<bool> {
        Ok(self.text_ref(handle)?.chars().all(char::is_whitespace))
    }

    /// Whether the text is empty.
    pub fn is_empty(&self, handle: Handle) -> Result<bool> {
        Ok(self.text_ref(handle)?.is_empty())
    }

    /// Bytes needed for [`StringSuite::as_cstring`], terminator included.
    pub fn length_as_cstring(&self, handle: Handle) -> Result<usize> {
        Ok(self.text_ref(handle)?.chars().count() + 1)
    }

    /// 16-bit units needed for [`StringSuite::as_unicode_cstring`], terminator included.
    pub fn length_as_unicode_cstring(&self, handle: Handle) -> Result<usize> {
        Ok(self.text_ref(handle)?.encode_utf16().count() + 1)
    }

    /// Bytes needed for [`StringSuite::as_pascal_string`], length prefix included.
    pub fn length_as_pascal_string(&self, handle: Handle) -> Result<usize> {
        Ok(self.text_ref(handle)?.chars().count().min(PASCAL_MAX_LEN) + 1)
    }

    /// Write the text as a null-terminated single-byte string.
    ///
    /// Returns the number of bytes written. Nothing is written when `dest`
    /// is too small.
    pub fn as_cstring(&self, handle: Handle, dest: &mut [u8]) -> Result<usize> {
        let text = self.text_ref(handle)?;
        let required = text.chars().count() + 1;
        check_capacity(required, dest.len())?;
        for (slot, byte) in dest.iter_mut().zip(encode_latin1(text)) {
            *slot = byte;
        }
        dest[required - 1] = 0;
        Ok(required)
    }

    /// Write the text as a null-terminated UTF-16 string.
    ///
    /// Returns the number of 16-bit units written.
    pub fn as_unicode_cstring(&self, handle: Handle, dest: &mut [u16]) -> Result<usize> {
        let text = self.text_ref(handle)?;
        let required = text.encode_utf16().count() + 1;
        check_capacity(required, dest.len())?;
        for (slot, unit) in dest.iter_mut().zip(text.encode_utf16()) {
            *slot = unit;
        }
        dest[required - 1] = 0;
        Ok(required)
    }

    /// Write the text as a length-prefixed single-byte string.
    ///
    /// Text longer than [`PASCAL_MAX_LEN`] is truncated.
    pub fn as_pascal_string(&self, handle: Handle, dest: &mut [u8]) -> Result<usize> {
        let text = self.text_ref(handle)?;
        let len = text.chars().count().min(PASCAL_MAX_LEN);
        check_capacity(len + 1, dest.len())?;
        dest[0] = len as u8;
        for (slot, byte) in dest[1..].iter_mut().zip(encode_latin1(text).take(len)) {
            *slot = byte;
        }
        Ok(len + 1)
    }

    /// Owned copy of the text, for host-side consumers.
    pub fn text(&self, handle: Handle) -> Result<String> {
        Ok(self.text_ref(handle)?.to_owned())
    }

    /// Borrow the text of a live string. Empty reads as `""`.
    pub fn text_ref(&self, handle: Handle) -> Result<&str> {
        if handle.is_null() {
            return Ok("");
        }
        Ok(&self.strings.get(handle)?.text)
    }

    /// Current reference count of a live string.
    pub fn ref_count(&self, handle: Handle) -> Result<u32> {
        Ok(self.strings.get(handle)?.ref_count)
    }

    /// Number of live string objects.
    pub fn live_count(&self) -> usize {
        self.strings.len()
    }

    fn edit(&mut self, handle: Handle, f: impl FnOnce(&mut String)) -> Result<()> {
        if handle.is_null() {
            return Ok(());
        }
        f(&mut self.strings.get_mut(handle)?.text);
        Ok(())
    }
}

fn decode(source: StringSource<'_>) -> Result<String> {
    match source {
        StringSource::AnsiCString(bytes) => decode_latin1(until_nul(bytes)),
        StringSource::PascalString(bytes) => {
            let declared = usize::from(bytes[0]);
            let payload = &bytes[1..];
            let payload = &payload[..declared.min(payload.len())];
            decode_latin1(until_nul(payload))
        }
        StringSource::UnicodeCString(units) => {
            let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
            let mut text = String::new();
            text.try_reserve(end).map_err(|_| SuiteError::OutOfMemory)?;
            text.extend(
                char::decode_utf16(units[..end].iter().copied())
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
            );
            Ok(text)
        }
    }
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

pub(crate) fn decode_latin1(bytes: &[u8]) -> Result<String> {
    let mut text = String::new();
    // Bytes above 0x7f take two UTF-8 bytes.
    text.try_reserve(bytes.len() * 2)
        .map_err(|_| SuiteError::OutOfMemory)?;
    text.extend(bytes.iter().map(|&b| char::from(b)));
    Ok(text)
}

pub(crate) fn encode_latin1(text: &str) -> impl Iterator<Item = u8> + '_ {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
}

fn try_clone(text: &str) -> Result<String> {
    let mut copy = String::new();
    copy.try_reserve_exact(text.len())
        .map_err(|_| SuiteError::OutOfMemory)?;
    copy.push_str(text);
    Ok(copy)
}

fn check_capacity(required: usize, capacity: usize) -> Result<()> {
    if capacity < required {
        return Err(SuiteError::BufferTooSmall { required, capacity });
    }
    Ok(())
}

/// `&x` drops the marker, `&&` stays as written.
fn strip_accelerators(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'&') {
            chars.next();
            out.push_str("&&");
        }
    }
    out
}
