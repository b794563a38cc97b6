//! SuiteHost Core Library
//!
//! Host-side implementation of the callback suites an image-editing host
//! exposes to native filter plugins.
//!
//! # Architecture
//!
//! Plugins are native code loaded into the host process. They receive an
//! [`ffi::SPBasicSuite`] and acquire the other suites from it by name and
//! version. Every object a plugin creates lives in a [`SuiteSession`] and is
//! addressed by an opaque [`Handle`].
//!
//! # Suites
//!
//! ## Strings (`zstring` module)
//! - Reference-counted strings built from C, UTF-16 or Pascal input
//! - Conversion back to those formats into caller buffers
//!
//! ## Scripting values (`descriptor`, `list`, `reference` modules)
//! - `DescriptorSuite` - Ordered key/value maps of typed values
//! - `ListSuite` - Ordered sequences of typed values
//! - `ReferenceSuite` - Chains of object specifiers
//!
//! ## Registry (`registry`, `persistence` modules)
//! - Named descriptors kept across invocations
//! - Persistent entries written to a checksummed JSON file
//!
//! ## Memory and errors (`memory`, `last_error` modules)
//! - Buffer suite with a host-wide memory budget
//! - Movable memory handles
//! - Last error message reported by the plugin

pub mod aete;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod last_error;
pub mod list;
pub mod memory;
pub mod persistence;
pub mod reference;
pub mod registry;
pub mod session;
pub mod value;
pub mod zstring;

pub use config::HostConfig;
pub use error::{Result, SuiteError};
pub use handle::Handle;
pub use registry::{DescriptorRegistry, RegistrySnapshot};
pub use session::{SessionOutcome, SuiteSession};
pub use value::{fourcc, ActionValue, AeteValue, DescriptorType, ScriptingParameters};
