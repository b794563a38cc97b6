//! Per-invocation context owning every suite.
//!
//! The host creates one [`SuiteSession`] around each plugin call, makes it
//! reachable from the C ABI with [`crate::ffi::SessionScope`], and calls
//! [`SuiteSession::finish`] afterwards to read back the registry and any error
//! message. Dropping the session invalidates every handle it issued.

use crate::aete::ScriptingDictionary;
use crate::config::HostConfig;
use crate::descriptor::DescriptorSuite;
use crate::error::Result;
use crate::last_error::ErrorSuite;
use crate::list::ListSuite;
use crate::memory::{BufferSuite, HandleSuite};
use crate::reference::ReferenceSuite;
use crate::registry::{DescriptorRegistry, RegistrySnapshot};
use crate::zstring::StringSuite;

/// What the host reads back once the plugin returns.
#[derive(Debug, Clone, Default)]
pub struct SessionOutcome {
    /// Both registry buckets as the plugin left them.
    pub registry: RegistrySnapshot,
    /// Whether persisted registry data changed and should be saved.
    pub registry_dirty: bool,
    /// Last message the plugin set through the error suite.
    pub error_message: Option<String>,
}

/// Every suite instance for one plugin invocation.
///
/// Fields are public so callers can borrow two suites at once, which the
/// cross-suite operations need (e.g. a descriptor read that creates a string).
#[derive(Debug)]
pub struct SuiteSession {
    host_name: String,
    pub strings: StringSuite,
    pub descriptors: DescriptorSuite,
    pub references: ReferenceSuite,
    pub lists: ListSuite,
    pub buffers: BufferSuite,
    pub handles: HandleSuite,
    pub errors: ErrorSuite,
    pub registry: DescriptorRegistry,
}

impl SuiteSession {
    /// Build the suites for one invocation.
    ///
    /// Fails when `registry` defines a key in both buckets.
    pub fn new(
        config: &HostConfig,
        dictionary: ScriptingDictionary,
        registry: RegistrySnapshot,
    ) -> Result<Self> {
        Ok(Self {
            host_name: config.host_name.clone(),
            strings: StringSuite::new(),
            descriptors: DescriptorSuite::new(dictionary),
            references: ReferenceSuite::new(),
            lists: ListSuite::new(),
            buffers: BufferSuite::new(config.available_space),
            handles: HandleSuite::new(),
            errors: ErrorSuite::new(),
            registry: DescriptorRegistry::load(registry)?,
        })
    }

    /// Name of the host application.
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Tear the session down, keeping what the host needs.
    pub fn finish(mut self) -> SessionOutcome {
        tracing::debug!(
            strings = self.strings.live_count(),
            descriptors = self.descriptors.live_count(),
            references = self.references.live_count(),
            buffers = self.buffers.live_count(),
            "plugin session finished"
        );
        let registry_dirty = self.registry.is_dirty();
        SessionOutcome {
            registry: self.registry.into_snapshot(),
            registry_dirty,
            error_message: self.errors.take_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::fourcc;

    #[test]
    fn test_registry_survives_sessions() {
        let config = HostConfig::default();
        let mut first =
            SuiteSession::new(&config, ScriptingDictionary::empty(), RegistrySnapshot::default()).unwrap();
        let d = first.descriptors.make().unwrap();
        first.descriptors.put_integer(d, fourcc(b"Rds "), 4).unwrap();
        first.registry.register("blur", d, false, &first.descriptors).unwrap();
        first.errors.set_error_from_cstring(b"cancelled").unwrap();
        let outcome = first.finish();
        assert!(!outcome.registry_dirty);
        assert_eq!(outcome.error_message.as_deref(), Some("cancelled"));

        let mut second =
            SuiteSession::new(&config, ScriptingDictionary::empty(), outcome.registry).unwrap();
        let restored = second.registry.get("blur", &mut second.descriptors).unwrap();
        assert_eq!(second.descriptors.get_integer(restored, fourcc(b"Rds ")).unwrap(), 4);
        assert_eq!(second.host_name(), "suitehost");
    }

    #[test]
    fn test_sessions_do_not_share_handles() {
        let config = HostConfig::default();
        let mut a = SuiteSession::new(&config, ScriptingDictionary::empty(), RegistrySnapshot::default()).unwrap();
        let b = SuiteSession::new(&config, ScriptingDictionary::empty(), RegistrySnapshot::default()).unwrap();
        let h = a.strings.make_from_text("only in a").unwrap();
        assert!(b.strings.text(h).is_err());
    }
}
