//! Error taxonomy shared by every suite.
//!
//! Errors never cross the C ABI as panics. Each variant maps to a fixed
//! integer code through [`SuiteError::code`], which is what the plugin sees.

use thiserror::Error;

/// Code returned to the plugin on success.
pub const NO_ERROR: i32 = 0;

/// `'Parm'`
pub const BAD_PARAMETER_CODE: i32 = 0x5061_726d;
/// `errAEParamMissed`
pub const MISSING_PARAMETER_CODE: i32 = -1715;
/// `memFullErr`
pub const OUT_OF_MEMORY_CODE: i32 = -108;
/// `'tsml'`
pub const BUFFER_TOO_SMALL_CODE: i32 = 0x7473_6d6c;
/// `'!IMP'`
pub const UNIMPLEMENTED_CODE: i32 = 0x2149_4d50;

/// Result type alias using [`SuiteError`].
pub type Result<T> = std::result::Result<T, SuiteError>;

/// Failure reported by a suite operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuiteError {
    /// Null or invalid pointer, unknown handle, or malformed argument.
    #[error("bad parameter: {0}")]
    BadParameter(&'static str),

    /// The object exists but the requested key or segment does not.
    #[error("missing parameter")]
    MissingParameter,

    /// A host-side allocation could not be satisfied.
    #[error("out of memory")]
    OutOfMemory,

    /// The caller-supplied output buffer is too small.
    #[error("buffer too small: {required} bytes required, {capacity} available")]
    BufferTooSmall {
        /// Bytes needed to hold the result.
        required: usize,
        /// Bytes the caller provided.
        capacity: usize,
    },

    /// Declared ABI surface the host deliberately does not provide.
    #[error("unimplemented suite function")]
    Unimplemented,
}

impl SuiteError {
    /// The integer code handed back across the ABI.
    pub fn code(&self) -> i32 {
        match self {
            SuiteError::BadParameter(_) => BAD_PARAMETER_CODE,
            SuiteError::MissingParameter => MISSING_PARAMETER_CODE,
            SuiteError::OutOfMemory => OUT_OF_MEMORY_CODE,
            SuiteError::BufferTooSmall { .. } => BUFFER_TOO_SMALL_CODE,
            SuiteError::Unimplemented => UNIMPLEMENTED_CODE,
        }
    }
}

/// Collapse a suite result into the ABI integer code.
pub fn to_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => NO_ERROR,
        Err(e) => e.code(),
    }
}
