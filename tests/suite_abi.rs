//! Drives a session the way a native plugin does: acquire the suite tables
//! through the basic suite and call the function pointers.

use std::ffi::{c_char, c_void, CStr};
use std::ptr;
use suitehost_core::aete::ScriptingDictionary;
use suitehost_core::error::{BAD_PARAMETER_CODE, BUFFER_TOO_SMALL_CODE, MISSING_PARAMETER_CODE, NO_ERROR};
use suitehost_core::ffi::{
    suitehost_basic_suite, ASZStringSuite, ActionDescriptorSuite, ActionListSuite, ActionReferenceSuite,
    BufferProcsSuite, DescriptorRegistrySuite, ErrorProcsSuite, HandleProcsSuite, SessionScope, BUFFER_SUITE_NAME,
    DESCRIPTOR_SUITE_NAME, ERROR_SUITE_NAME, HANDLE_SUITE_NAME, LIST_SUITE_NAME, REFERENCE_SUITE_NAME,
    REGISTRY_SUITE_NAME, ZSTRING_SUITE_NAME,
};
use suitehost_core::persistence::RegistryFile;
use suitehost_core::{fourcc, DescriptorType, Handle, HostConfig, RegistrySnapshot, SuiteSession};

fn acquire<T>(name: &str, version: i32) -> &'static T {
    let basic = unsafe { &*suitehost_basic_suite() };
    let name = format!("{name}\0");
    let mut table: *const c_void = ptr::null();
    let code = unsafe { (basic.acquire_suite)(name.as_ptr().cast(), version, &mut table) };
    assert_eq!(code, NO_ERROR, "acquire {name}");
    unsafe { &*table.cast::<T>() }
}

fn session_with(config: &HostConfig, registry: RegistrySnapshot) -> SuiteSession {
    SuiteSession::new(config, ScriptingDictionary::empty(), registry).unwrap()
}

fn cstr(bytes: &[u8]) -> *const c_char {
    CStr::from_bytes_with_nul(bytes).unwrap().as_ptr()
}

#[test]
fn test_string_lifecycle_through_tables() {
    let strings: &ASZStringSuite = acquire(ZSTRING_SUITE_NAME, 1);
    let mut session = session_with(&HostConfig::default(), RegistrySnapshot::default());
    let _scope = SessionScope::enter(&mut session);

    unsafe {
        let mut z = Handle::NULL;
        let src = b"Hello\0";
        assert_eq!((strings.make_from_cstring)(src.as_ptr().cast(), src.len(), &mut z), NO_ERROR);
        assert!(!z.is_null());
        assert_eq!((strings.length_as_cstring)(z), 6);

        let mut small = [0 as c_char; 3];
        assert_eq!((strings.as_cstring)(z, small.as_mut_ptr(), 3), BUFFER_TOO_SMALL_CODE);

        let mut out = [0 as c_char; 6];
        assert_eq!((strings.as_cstring)(z, out.as_mut_ptr(), 6), NO_ERROR);
        assert_eq!(CStr::from_ptr(out.as_ptr()).to_bytes(), b"Hello");

        assert_eq!((strings.add_ref)(z), NO_ERROR);
        assert_eq!((strings.release)(z), NO_ERROR);
        assert_eq!((strings.is_empty)(z), 0);
        assert_eq!((strings.release)(z), NO_ERROR);
        assert_eq!((strings.release)(z), BAD_PARAMETER_CODE);

        let mut empty = Handle::from_raw(99);
        assert_eq!((strings.make_from_cstring)(src.as_ptr().cast(), 0, &mut empty), NO_ERROR);
        assert!(empty.is_null());
        assert_eq!((strings.make_from_cstring)(ptr::null(), 4, &mut empty), BAD_PARAMETER_CODE);
    }
}

#[test]
fn test_descriptor_roundtrip_through_tables() {
    let descriptors: &ActionDescriptorSuite = acquire(DESCRIPTOR_SUITE_NAME, 2);
    let lists: &ActionListSuite = acquire(LIST_SUITE_NAME, 1);
    let mut session = session_with(&HostConfig::default(), RegistrySnapshot::default());
    let _scope = SessionScope::enter(&mut session);

    let name = fourcc(b"Nm  ");
    let radius = fourcc(b"Rds ");
    unsafe {
        let mut d = Handle::NULL;
        assert_eq!((descriptors.make)(&mut d), NO_ERROR);
        assert_eq!((descriptors.put_integer)(d, radius, 5), NO_ERROR);
        assert_eq!((descriptors.put_string)(d, name, cstr(b"Layer 1\0")), NO_ERROR);

        let mut count = 0;
        assert_eq!((descriptors.get_count)(d, &mut count), NO_ERROR);
        assert_eq!(count, 2);
        let mut key = 0;
        assert_eq!((descriptors.get_key)(d, 1, &mut key), NO_ERROR);
        assert_eq!(key, name);

        let mut len = 0;
        assert_eq!((descriptors.get_string_length)(d, name, &mut len), NO_ERROR);
        assert_eq!(len, 7);
        let mut text = [0 as c_char; 8];
        assert_eq!((descriptors.get_string)(d, name, text.as_mut_ptr(), 8), NO_ERROR);
        assert_eq!(CStr::from_ptr(text.as_ptr()).to_bytes(), b"Layer 1");

        let mut value = 0;
        assert_eq!((descriptors.get_integer)(d, fourcc(b"none"), &mut value), MISSING_PARAMETER_CODE);

        let keys = [radius, name, 0];
        let mut has = 0;
        assert_eq!((descriptors.has_keys)(d, keys.as_ptr(), &mut has), NO_ERROR);
        assert_eq!(has, 1);

        let mut list = Handle::NULL;
        assert_eq!((lists.make)(&mut list), NO_ERROR);
        assert_eq!((lists.put_integer)(list, 1), NO_ERROR);
        assert_eq!((lists.put_float)(list, 2.5), NO_ERROR);
        assert_eq!((descriptors.put_list)(d, fourcc(b"Itms"), list), NO_ERROR);

        let mut type_code = 0;
        assert_eq!((descriptors.get_type)(d, fourcc(b"Itms"), &mut type_code), NO_ERROR);
        assert_eq!(type_code, DescriptorType::List.code());

        let mut copy = Handle::NULL;
        assert_eq!((descriptors.get_list)(d, fourcc(b"Itms"), &mut copy), NO_ERROR);
        let mut float = 0.0;
        assert_eq!((lists.get_float)(copy, 1, &mut float), NO_ERROR);
        assert_eq!(float, 2.5);

        let mut snapshot = Handle::NULL;
        assert_eq!((descriptors.as_handle)(d, &mut snapshot), NO_ERROR);
        assert_eq!((descriptors.free)(d), NO_ERROR);
        let mut restored = Handle::NULL;
        assert_eq!((descriptors.handle_to_descriptor)(snapshot, &mut restored), NO_ERROR);
        assert_eq!((descriptors.get_integer)(restored, radius, &mut value), NO_ERROR);
        assert_eq!(value, 5);
    }
}

#[test]
fn test_alias_uses_memory_handles() {
    let descriptors: &ActionDescriptorSuite = acquire(DESCRIPTOR_SUITE_NAME, 2);
    let handles: &HandleProcsSuite = acquire(HANDLE_SUITE_NAME, 1);
    let mut session = session_with(&HostConfig::default(), RegistrySnapshot::default());
    let _scope = SessionScope::enter(&mut session);

    unsafe {
        let alias = (handles.new)(4);
        let data = (handles.lock)(alias, 0);
        assert!(!data.is_null());
        ptr::copy_nonoverlapping(b"path".as_ptr(), data, 4);
        (handles.unlock)(alias);

        let mut d = Handle::NULL;
        assert_eq!((descriptors.make)(&mut d), NO_ERROR);
        assert_eq!((descriptors.put_alias)(d, fourcc(b"In  "), alias), NO_ERROR);
        (handles.dispose)(alias);

        let mut fetched = Handle::NULL;
        assert_eq!((descriptors.get_alias)(d, fourcc(b"In  "), &mut fetched), NO_ERROR);
        assert_eq!((handles.get_size)(fetched), 4);
        let data = (handles.lock)(fetched, 0);
        assert_eq!(std::slice::from_raw_parts(data, 4), b"path");
    }
}

#[test]
fn test_reference_chain_walk() {
    let references: &ActionReferenceSuite = acquire(REFERENCE_SUITE_NAME, 2);
    let mut session = session_with(&HostConfig::default(), RegistrySnapshot::default());
    let _scope = SessionScope::enter(&mut session);

    let layer = fourcc(b"Lyr ");
    let document = fourcc(b"Dcmn");
    unsafe {
        let mut r = Handle::NULL;
        assert_eq!((references.make)(&mut r), NO_ERROR);
        assert_eq!((references.put_name)(r, layer, cstr(b"Background\0")), NO_ERROR);
        assert_eq!((references.put_index)(r, document, 1), NO_ERROR);

        let mut class = 0;
        assert_eq!((references.get_desired_class)(r, &mut class), NO_ERROR);
        assert_eq!(class, layer);
        let mut len = 0;
        assert_eq!((references.get_name_length)(r, &mut len), NO_ERROR);
        assert_eq!(len, 10);

        let mut container = Handle::NULL;
        assert_eq!((references.get_container)(r, &mut container), NO_ERROR);
        let mut index = 0;
        assert_eq!((references.get_index)(container, &mut index), NO_ERROR);
        assert_eq!(index, 1);

        let mut outer = Handle::from_raw(7);
        assert_eq!((references.get_container)(container, &mut outer), NO_ERROR);
        assert!(outer.is_null());
    }
}

#[test]
fn test_registry_persists_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    let config = HostConfig {
        registry_path: Some(path.clone()),
        ..HostConfig::default()
    };
    let descriptors: &ActionDescriptorSuite = acquire(DESCRIPTOR_SUITE_NAME, 2);
    let registry: &DescriptorRegistrySuite = acquire(REGISTRY_SUITE_NAME, 1);
    let opacity = fourcc(b"Opct");

    let mut first = session_with(&config, RegistryFile::load_or_default(&path).unwrap());
    {
        let _scope = SessionScope::enter(&mut first);
        unsafe {
            let mut d = Handle::NULL;
            assert_eq!((descriptors.make)(&mut d), NO_ERROR);
            assert_eq!((descriptors.put_integer)(d, opacity, 50), NO_ERROR);
            assert_eq!((registry.register)(cstr(b"opacity\0"), d, 1), NO_ERROR);
            assert_eq!((registry.register)(cstr(b"scratch\0"), d, 0), NO_ERROR);
            assert_eq!((registry.erase)(cstr(b"absent\0")), MISSING_PARAMETER_CODE);
        }
    }
    let outcome = first.finish();
    assert!(outcome.registry_dirty);
    RegistryFile::save(&path, &outcome.registry).unwrap();

    let mut second = session_with(&config, RegistryFile::load(&path).unwrap());
    let _scope = SessionScope::enter(&mut second);
    unsafe {
        let mut fetched = Handle::NULL;
        assert_eq!((registry.get)(cstr(b"opacity\0"), &mut fetched), NO_ERROR);
        let mut value = 0;
        assert_eq!((descriptors.get_integer)(fetched, opacity, &mut value), NO_ERROR);
        assert_eq!(value, 50);

        let mut gone = Handle::from_raw(5);
        assert_eq!((registry.get)(cstr(b"scratch\0"), &mut gone), NO_ERROR);
        assert!(gone.is_null());
    }
}

#[test]
fn test_buffer_budget_and_error_message() {
    let buffers: &BufferProcsSuite = acquire(BUFFER_SUITE_NAME, 1);
    let errors: &ErrorProcsSuite = acquire(ERROR_SUITE_NAME, 1);
    let config = HostConfig {
        available_space: 16 * 1024 * 1024,
        ..HostConfig::default()
    };
    let mut session = session_with(&config, RegistrySnapshot::default());
    {
        let _scope = SessionScope::enter(&mut session);
        unsafe {
            let mut requested = 64 * 1024 * 1024;
            let mut buffer = (buffers.new)(&mut requested, 4096);
            assert!(!buffer.is_null());
            assert_eq!(requested, 16 * 1024 * 1024);
            assert_eq!((buffers.get_size)(buffer), requested);
            assert_eq!((buffers.get_space)(), 0);
            assert!(!(buffers.data)(buffer).is_null());

            (buffers.dispose)(&mut buffer);
            assert!(buffer.is_null());
            assert_eq!((buffers.get_space)(), 16 * 1024 * 1024);

            assert_eq!((errors.set_error_from_cstring)(cstr(b"Out of paper\0")), NO_ERROR);
        }
    }
    let outcome = session.finish();
    assert_eq!(outcome.error_message.as_deref(), Some("Out of paper"));
}
