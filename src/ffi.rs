//! C ABI suite tables handed to plugins.
//!
//! A plugin acquires a suite by name and version through [`SPBasicSuite`] and
//! receives a `#[repr(C)]` table of function pointers. Every entry returns an
//! integer code (see [`crate::error`]) or, for simple queries, the value
//! itself with a neutral fallback on failure.
//!
//! # Session binding
//!
//! Suite callbacks carry no context argument, so the host binds the
//! [`SuiteSession`] for the current invocation to the calling thread:
//!
//! ```ignore
//! let mut session = SuiteSession::new(&config, dictionary, snapshot)?;
//! {
//!     let _scope = SessionScope::enter(&mut session);
//!     run_plugin(suitehost_basic_suite());
//! }
//! let outcome = session.finish();
//! ```
//!
//! A callback arriving with no session bound fails with `BadParameter`.
//!
//! # Memory Management
//!
//! - Every object is owned by the session and addressed by [`Handle`]
//! - Output text is copied into caller-owned buffers; nothing is written
//!   when the buffer is too small
//! - Panics never unwind into the plugin; they surface as `BadParameter`

use crate::error::{to_code, Result, SuiteError, BAD_PARAMETER_CODE, NO_ERROR, UNIMPLEMENTED_CODE};
use crate::handle::Handle;
use crate::session::SuiteSession;
use crate::zstring::{decode_latin1, StringSource};
use std::cell::Cell;
use std::ffi::{c_char, c_void, CStr};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

/// Integer result code.
pub type SPErr = i32;
/// C boolean: `0` false, anything else true.
pub type Boolean = u8;

// ============================================================================
// Session binding
// ============================================================================

thread_local! {
    static ACTIVE: Cell<*mut SuiteSession> = const { Cell::new(ptr::null_mut()) };
}

/// Binds a session to the current thread for the duration of a plugin call.
pub struct SessionScope<'a> {
    previous: *mut SuiteSession,
    _session: PhantomData<&'a mut SuiteSession>,
}

impl<'a> SessionScope<'a> {
    /// Make `session` reachable from the suite tables until the scope drops.
    pub fn enter(session: &'a mut SuiteSession) -> Self {
        let previous = ACTIVE.with(|slot| slot.replace(session as *mut SuiteSession));
        Self {
            previous,
            _session: PhantomData,
        }
    }
}

impl Drop for SessionScope<'_> {
    fn drop(&mut self) {
        ACTIVE.with(|slot| slot.set(self.previous));
    }
}

/// Puts the session pointer back when a call finishes or unwinds.
struct Restore(*mut SuiteSession);

impl Drop for Restore {
    fn drop(&mut self) {
        ACTIVE.with(|slot| slot.set(self.0));
    }
}

fn with_session<R>(f: impl FnOnce(&mut SuiteSession) -> Result<R>) -> Result<R> {
    // Taken out of the slot so a reentrant call finds no session.
    let active = ACTIVE.with(|slot| slot.replace(ptr::null_mut()));
    if active.is_null() {
        tracing::warn!("suite called outside of a plugin session");
        return Err(SuiteError::BadParameter("no active plugin session"));
    }
    let _restore = Restore(active);
    // SAFETY: the pointer was installed by a live `SessionScope` holding the
    // session's unique borrow, and it stays out of the slot until `_restore`
    // drops, so this is the only reference to the session.
    let session = unsafe { &mut *active };
    f(session)
}

fn guarded<R>(fallback: R, f: impl FnOnce() -> R) -> R {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        tracing::error!("panic inside suite callback");
        fallback
    })
}

/// Run an operation and report its result code.
fn call(f: impl FnOnce(&mut SuiteSession) -> Result<()>) -> SPErr {
    guarded(BAD_PARAMETER_CODE, || to_code(with_session(f)))
}

/// Run a query that returns its value directly, with `fallback` on failure.
fn query<R: Copy>(fallback: R, f: impl FnOnce(&mut SuiteSession) -> Result<R>) -> R {
    guarded(fallback, || with_session(f).unwrap_or(fallback))
}

// ============================================================================
// Pointer helpers
// ============================================================================

/// # Safety
///
/// `ptr` must be null or valid for writes of `T`.
unsafe fn out<'a, T>(ptr: *mut T) -> Result<&'a mut T> {
    // SAFETY: caller guarantees `ptr` is null or valid.
    unsafe { ptr.as_mut() }.ok_or(SuiteError::BadParameter("null output pointer"))
}

/// # Safety
///
/// `ptr` must be null or valid for reads of `len` elements.
unsafe fn input<'a, T>(ptr: *const T, len: usize) -> Result<&'a [T]> {
    if ptr.is_null() {
        return Err(SuiteError::BadParameter("null input pointer"));
    }
    // SAFETY: non-null, and caller guarantees `len` readable elements.
    Ok(unsafe { slice::from_raw_parts(ptr, len) })
}

/// # Safety
///
/// `ptr` must be null or valid for writes of `len` elements.
unsafe fn output<'a, T>(ptr: *mut T, len: usize) -> Result<&'a mut [T]> {
    if ptr.is_null() {
        return Err(SuiteError::BadParameter("null output buffer"));
    }
    // SAFETY: non-null, and caller guarantees `len` writable elements.
    Ok(unsafe { slice::from_raw_parts_mut(ptr, len) })
}

/// # Safety
///
/// `ptr` must be null or point to a null-terminated string.
unsafe fn cstring<'a>(ptr: *const c_char) -> Result<&'a [u8]> {
    if ptr.is_null() {
        return Err(SuiteError::BadParameter("null string"));
    }
    // SAFETY: non-null and null-terminated per the caller.
    Ok(unsafe { CStr::from_ptr(ptr) }.to_bytes())
}

/// The prefix byte plus the payload it announces.
///
/// # Safety
///
/// `ptr` must be null or point to a length-prefixed string.
unsafe fn pstring<'a>(ptr: *const u8) -> Result<&'a [u8]> {
    if ptr.is_null() {
        return Err(SuiteError::BadParameter("null string"));
    }
    // SAFETY: the prefix byte is readable, and announces that many more.
    let len = usize::from(unsafe { *ptr });
    Ok(unsafe { slice::from_raw_parts(ptr, len + 1) })
}

/// Keys up to, not including, the terminating `0`.
///
/// # Safety
///
/// `ptr` must be null or point to a zero-terminated key array.
unsafe fn key_list<'a>(ptr: *const u32) -> Result<&'a [u32]> {
    if ptr.is_null() {
        return Err(SuiteError::BadParameter("null key list"));
    }
    let mut len = 0;
    // SAFETY: every element up to the terminator is readable.
    while unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    Ok(unsafe { slice::from_raw_parts(ptr, len) })
}

fn flag(value: bool) -> Boolean {
    Boolean::from(value)
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| SuiteError::OutOfMemory)
}

fn len_i32(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| SuiteError::OutOfMemory)
}

fn registry_key(bytes: &[u8]) -> Result<String> {
    decode_latin1(bytes)
}

// ============================================================================
// ASZString suite
// ============================================================================

/// `ASZString` suite, version 1.
#[repr(C)]
pub struct ASZStringSuite {
    pub make_from_unicode: unsafe extern "C" fn(*const u16, usize, *mut Handle) -> SPErr,
    pub make_from_cstring: unsafe extern "C" fn(*const c_char, usize, *mut Handle) -> SPErr,
    pub make_from_pascal_string: unsafe extern "C" fn(*const u8, usize, *mut Handle) -> SPErr,
    pub make_romanization_of_integer: unsafe extern "C" fn(i32, *mut Handle) -> SPErr,
    pub make_romanization_of_fixed: unsafe extern "C" fn(i32, *mut Handle) -> SPErr,
    pub make_romanization_of_double: unsafe extern "C" fn(f64, *mut Handle) -> SPErr,
    pub get_empty: unsafe extern "C" fn() -> Handle,
    pub copy: unsafe extern "C" fn(Handle, *mut Handle) -> SPErr,
    pub replace: unsafe extern "C" fn(Handle, u32, Handle) -> SPErr,
    pub trim_ellipsis: unsafe extern "C" fn(Handle) -> SPErr,
    pub trim_spaces: unsafe extern "C" fn(Handle) -> SPErr,
    pub remove_accelerators: unsafe extern "C" fn(Handle) -> SPErr,
    pub add_ref: unsafe extern "C" fn(Handle) -> SPErr,
    pub release: unsafe extern "C" fn(Handle) -> SPErr,
    pub is_all_white_space: unsafe extern "C" fn(Handle) -> Boolean,
    pub is_empty: unsafe extern "C" fn(Handle) -> Boolean,
    pub will_replace: unsafe extern "C" fn(Handle, u32) -> Boolean,
    pub length_as_unicode_cstring: unsafe extern "C" fn(Handle) -> u32,
    pub as_unicode_cstring: unsafe extern "C" fn(Handle, *mut u16, u32) -> SPErr,
    pub length_as_cstring: unsafe extern "C" fn(Handle) -> u32,
    pub as_cstring: unsafe extern "C" fn(Handle, *mut c_char, u32) -> SPErr,
    pub length_as_pascal_string: unsafe extern "C" fn(Handle) -> u32,
    pub as_pascal_string: unsafe extern "C" fn(Handle, *mut u8, u32) -> SPErr,
}

unsafe extern "C" fn zstring_make_from_unicode(src: *const u16, count: usize, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes `count` readable units and a handle slot.
        let (src, result) = unsafe { (input(src, count)?, out(result)?) };
        *result = session.strings.make_from(StringSource::UnicodeCString(src))?;
        Ok(())
    })
}

unsafe extern "C" fn zstring_make_from_cstring(src: *const c_char, count: usize, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes `count` readable bytes and a handle slot.
        let (src, result) = unsafe { (input(src.cast::<u8>(), count)?, out(result)?) };
        *result = session.strings.make_from(StringSource::AnsiCString(src))?;
        Ok(())
    })
}

unsafe extern "C" fn zstring_make_from_pascal_string(src: *const u8, count: usize, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes `count` readable bytes and a handle slot.
        let (src, result) = unsafe { (input(src, count)?, out(result)?) };
        *result = session.strings.make_from(StringSource::PascalString(src))?;
        Ok(())
    })
}

unsafe extern "C" fn zstring_make_romanization_of_integer(value: i32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.strings.make_romanization_of_integer(value)?;
        Ok(())
    })
}

unsafe extern "C" fn zstring_make_romanization_of_fixed(value: i32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.strings.make_romanization_of_fixed(value)?;
        Ok(())
    })
}

unsafe extern "C" fn zstring_make_romanization_of_double(value: f64, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.strings.make_romanization_of_double(value)?;
        Ok(())
    })
}

unsafe extern "C" fn zstring_get_empty() -> Handle {
    Handle::NULL
}

unsafe extern "C" fn zstring_copy(source: Handle, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.strings.copy(source)?;
        Ok(())
    })
}

unsafe extern "C" fn zstring_replace(zstring: Handle, index: u32, replacement: Handle) -> SPErr {
    call(|session| session.strings.replace(zstring, index, replacement))
}

unsafe extern "C" fn zstring_trim_ellipsis(zstring: Handle) -> SPErr {
    call(|session| session.strings.trim_ellipsis(zstring))
}

unsafe extern "C" fn zstring_trim_spaces(zstring: Handle) -> SPErr {
    call(|session| session.strings.trim_spaces(zstring))
}

unsafe extern "C" fn zstring_remove_accelerators(zstring: Handle) -> SPErr {
    call(|session| session.strings.remove_accelerators(zstring))
}

unsafe extern "C" fn zstring_add_ref(zstring: Handle) -> SPErr {
    call(|session| session.strings.add_ref(zstring))
}

unsafe extern "C" fn zstring_release(zstring: Handle) -> SPErr {
    call(|session| session.strings.release(zstring))
}

unsafe extern "C" fn zstring_is_all_white_space(zstring: Handle) -> Boolean {
    query(0, |session| session.strings.is_all_whitespace(zstring).map(flag))
}

unsafe extern "C" fn zstring_is_empty(zstring: Handle) -> Boolean {
    query(0, |session| session.strings.is_empty(zstring).map(flag))
}

unsafe extern "C" fn zstring_will_replace(zstring: Handle, index: u32) -> Boolean {
    query(0, |session| session.strings.will_replace(zstring, index).map(flag))
}

unsafe extern "C" fn zstring_length_as_unicode_cstring(zstring: Handle) -> u32 {
    query(0, |session| len_u32(session.strings.length_as_unicode_cstring(zstring)?))
}

unsafe extern "C" fn zstring_as_unicode_cstring(zstring: Handle, dest: *mut u16, capacity: u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin owns `capacity` writable units at `dest`.
        let dest = unsafe { output(dest, capacity as usize)? };
        session.strings.as_unicode_cstring(zstring, dest).map(drop)
    })
}

unsafe extern "C" fn zstring_length_as_cstring(zstring: Handle) -> u32 {
    query(0, |session| len_u32(session.strings.length_as_cstring(zstring)?))
}

unsafe extern "C" fn zstring_as_cstring(zstring: Handle, dest: *mut c_char, capacity: u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin owns `capacity` writable bytes at `dest`.
        let dest = unsafe { output(dest.cast::<u8>(), capacity as usize)? };
        session.strings.as_cstring(zstring, dest).map(drop)
    })
}

unsafe extern "C" fn zstring_length_as_pascal_string(zstring: Handle) -> u32 {
    query(0, |session| len_u32(session.strings.length_as_pascal_string(zstring)?))
}

unsafe extern "C" fn zstring_as_pascal_string(zstring: Handle, dest: *mut u8, capacity: u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin owns `capacity` writable bytes at `dest`.
        let dest = unsafe { output(dest, capacity as usize)? };
        session.strings.as_pascal_string(zstring, dest).map(drop)
    })
}

pub static ZSTRING_SUITE: ASZStringSuite = ASZStringSuite {
    make_from_unicode: zstring_make_from_unicode,
    make_from_cstring: zstring_make_from_cstring,
    make_from_pascal_string: zstring_make_from_pascal_string,
    make_romanization_of_integer: zstring_make_romanization_of_integer,
    make_romanization_of_fixed: zstring_make_romanization_of_fixed,
    make_romanization_of_double: zstring_make_romanization_of_double,
    get_empty: zstring_get_empty,
    copy: zstring_copy,
    replace: zstring_replace,
    trim_ellipsis: zstring_trim_ellipsis,
    trim_spaces: zstring_trim_spaces,
    remove_accelerators: zstring_remove_accelerators,
    add_ref: zstring_add_ref,
    release: zstring_release,
    is_all_white_space: zstring_is_all_white_space,
    is_empty: zstring_is_empty,
    will_replace: zstring_will_replace,
    length_as_unicode_cstring: zstring_length_as_unicode_cstring,
    as_unicode_cstring: zstring_as_unicode_cstring,
    length_as_cstring: zstring_length_as_cstring,
    as_cstring: zstring_as_cstring,
    length_as_pascal_string: zstring_length_as_pascal_string,
    as_pascal_string: zstring_as_pascal_string,
};

// ============================================================================
// ActionDescriptor suite
// ============================================================================

/// `ActionDescriptor` suite, version 2.
#[repr(C)]
pub struct ActionDescriptorSuite {
    pub make: unsafe extern "C" fn(*mut Handle) -> SPErr,
    pub free: unsafe extern "C" fn(Handle) -> SPErr,
    pub get_type: unsafe extern "C" fn(Handle, u32, *mut u32) -> SPErr,
    pub get_key: unsafe extern "C" fn(Handle, u32, *mut u32) -> SPErr,
    pub has_key: unsafe extern "C" fn(Handle, u32, *mut Boolean) -> SPErr,
    pub get_count: unsafe extern "C" fn(Handle, *mut u32) -> SPErr,
    pub is_equal: unsafe extern "C" fn(Handle, Handle, *mut Boolean) -> SPErr,
    pub erase: unsafe extern "C" fn(Handle, u32) -> SPErr,
    pub clear: unsafe extern "C" fn(Handle) -> SPErr,
    pub put_integer: unsafe extern "C" fn(Handle, u32, i32) -> SPErr,
    pub put_float: unsafe extern "C" fn(Handle, u32, f64) -> SPErr,
    pub put_unit_float: unsafe extern "C" fn(Handle, u32, u32, f64) -> SPErr,
    pub put_string: unsafe extern "C" fn(Handle, u32, *const c_char) -> SPErr,
    pub put_boolean: unsafe extern "C" fn(Handle, u32, Boolean) -> SPErr,
    pub put_list: unsafe extern "C" fn(Handle, u32, Handle) -> SPErr,
    pub put_object: unsafe extern "C" fn(Handle, u32, u32, Handle) -> SPErr,
    pub put_global_object: unsafe extern "C" fn(Handle, u32, u32, Handle) -> SPErr,
    pub put_enumerated: unsafe extern "C" fn(Handle, u32, u32, u32) -> SPErr,
    pub put_reference: unsafe extern "C" fn(Handle, u32, Handle) -> SPErr,
    pub put_class: unsafe extern "C" fn(Handle, u32, u32) -> SPErr,
    pub put_global_class: unsafe extern "C" fn(Handle, u32, u32) -> SPErr,
    pub put_alias: unsafe extern "C" fn(Handle, u32, Handle) -> SPErr,
    pub get_integer: unsafe extern "C" fn(Handle, u32, *mut i32) -> SPErr,
    pub get_float: unsafe extern "C" fn(Handle, u32, *mut f64) -> SPErr,
    pub get_unit_float: unsafe extern "C" fn(Handle, u32, *mut u32, *mut f64) -> SPErr,
    pub get_string: unsafe extern "C" fn(Handle, u32, *mut c_char, u32) -> SPErr,
    pub get_boolean: unsafe extern "C" fn(Handle, u32, *mut Boolean) -> SPErr,
    pub get_list: unsafe extern "C" fn(Handle, u32, *mut Handle) -> SPErr,
    pub get_object: unsafe extern "C" fn(Handle, u32, *mut u32, *mut Handle) -> SPErr,
    pub get_global_object: unsafe extern "C" fn(Handle, u32, *mut u32, *mut Handle) -> SPErr,
    pub get_enumerated: unsafe extern "C" fn(Handle, u32, *mut u32, *mut u32) -> SPErr,
    pub get_reference: unsafe extern "C" fn(Handle, u32, *mut Handle) -> SPErr,
    pub get_class: unsafe extern "C" fn(Handle, u32, *mut u32) -> SPErr,
    pub get_global_class: unsafe extern "C" fn(Handle, u32, *mut u32) -> SPErr,
    pub get_alias: unsafe extern "C" fn(Handle, u32, *mut Handle) -> SPErr,
    pub has_keys: unsafe extern "C" fn(Handle, *const u32, *mut Boolean) -> SPErr,
    pub put_integers: unsafe extern "C" fn(Handle, u32, u32, *const i32) -> SPErr,
    pub get_integers: unsafe extern "C" fn(Handle, u32, u32, *mut i32) -> SPErr,
    pub as_handle: unsafe extern "C" fn(Handle, *mut Handle) -> SPErr,
    pub handle_to_descriptor: unsafe extern "C" fn(Handle, *mut Handle) -> SPErr,
    pub put_zstring: unsafe extern "C" fn(Handle, u32, Handle) -> SPErr,
    pub get_zstring: unsafe extern "C" fn(Handle, u32, *mut Handle) -> SPErr,
    pub put_data: unsafe extern "C" fn(Handle, u32, i32, *const u8) -> SPErr,
    pub get_data_length: unsafe extern "C" fn(Handle, u32, *mut i32) -> SPErr,
    pub get_data: unsafe extern "C" fn(Handle, u32, *mut u8, i32) -> SPErr,
    pub get_string_length: unsafe extern "C" fn(Handle, u32, *mut u32) -> SPErr,
}

unsafe extern "C" fn descriptor_make(result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.make()?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_free(descriptor: Handle) -> SPErr {
    call(|session| session.descriptors.free(descriptor))
}

unsafe extern "C" fn descriptor_get_type(descriptor: Handle, key: u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.get_type(descriptor, key)?.code();
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_key(descriptor: Handle, index: u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.get_key(descriptor, index)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_has_key(descriptor: Handle, key: u32, result: *mut Boolean) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = flag(session.descriptors.has_key(descriptor, key)?);
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_count(descriptor: Handle, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.get_count(descriptor)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_is_equal(descriptor: Handle, other: Handle, result: *mut Boolean) -> SPErr {
    call(|session| {
        let equal = session.descriptors.is_equal(descriptor, other)?;
        // SAFETY: the plugin passes a writable slot.
        *unsafe { out(result)? } = flag(equal);
        Ok(())
    })
}

unsafe extern "C" fn descriptor_erase(descriptor: Handle, key: u32) -> SPErr {
    call(|session| session.descriptors.erase(descriptor, key))
}

unsafe extern "C" fn descriptor_clear(descriptor: Handle) -> SPErr {
    call(|session| session.descriptors.clear(descriptor))
}

unsafe extern "C" fn descriptor_put_integer(descriptor: Handle, key: u32, value: i32) -> SPErr {
    call(|session| session.descriptors.put_integer(descriptor, key, value))
}

unsafe extern "C" fn descriptor_put_float(descriptor: Handle, key: u32, value: f64) -> SPErr {
    call(|session| session.descriptors.put_float(descriptor, key, value))
}

unsafe extern "C" fn descriptor_put_unit_float(descriptor: Handle, key: u32, unit: u32, value: f64) -> SPErr {
    call(|session| session.descriptors.put_unit_float(descriptor, key, unit, value))
}

unsafe extern "C" fn descriptor_put_string(descriptor: Handle, key: u32, text: *const c_char) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a null-terminated string.
        let text = unsafe { cstring(text)? };
        session.descriptors.put_string(descriptor, key, text)
    })
}

unsafe extern "C" fn descriptor_put_boolean(descriptor: Handle, key: u32, value: Boolean) -> SPErr {
    call(|session| session.descriptors.put_boolean(descriptor, key, value != 0))
}

unsafe extern "C" fn descriptor_put_list(descriptor: Handle, key: u32, list: Handle) -> SPErr {
    call(|session| session.descriptors.put_list(descriptor, key, list, &session.lists))
}

unsafe extern "C" fn descriptor_put_object(descriptor: Handle, key: u32, class: u32, object: Handle) -> SPErr {
    call(|session| session.descriptors.put_object(descriptor, key, class, object))
}

unsafe extern "C" fn descriptor_put_global_object(descriptor: Handle, key: u32, class: u32, object: Handle) -> SPErr {
    call(|session| session.descriptors.put_global_object(descriptor, key, class, object))
}

unsafe extern "C" fn descriptor_put_enumerated(descriptor: Handle, key: u32, type_id: u32, value: u32) -> SPErr {
    call(|session| session.descriptors.put_enumerated(descriptor, key, type_id, value))
}

unsafe extern "C" fn descriptor_put_reference(descriptor: Handle, key: u32, reference: Handle) -> SPErr {
    call(|session| {
        session
            .descriptors
            .put_reference(descriptor, key, reference, &session.references)
    })
}

unsafe extern "C" fn descriptor_put_class(descriptor: Handle, key: u32, class: u32) -> SPErr {
    call(|session| session.descriptors.put_class(descriptor, key, class))
}

unsafe extern "C" fn descriptor_put_global_class(descriptor: Handle, key: u32, class: u32) -> SPErr {
    call(|session| session.descriptors.put_global_class(descriptor, key, class))
}

unsafe extern "C" fn descriptor_put_alias(descriptor: Handle, key: u32, alias: Handle) -> SPErr {
    call(|session| {
        let bytes = session.handles.data(alias)?;
        session.descriptors.put_alias(descriptor, key, bytes)
    })
}

unsafe extern "C" fn descriptor_get_integer(descriptor: Handle, key: u32, result: *mut i32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.get_integer(descriptor, key)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_float(descriptor: Handle, key: u32, result: *mut f64) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.get_float(descriptor, key)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_unit_float(
    descriptor: Handle,
    key: u32,
    unit: *mut u32,
    result: *mut f64,
) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable value slot; the unit slot is optional.
        let (unit, result) = unsafe { (unit.as_mut(), out(result)?) };
        let (unit_id, value) = session.descriptors.get_unit_float(descriptor, key)?;
        if let Some(unit) = unit {
            *unit = unit_id;
        }
        *result = value;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_string(descriptor: Handle, key: u32, dest: *mut c_char, capacity: u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin owns `capacity` writable bytes at `dest`.
        let dest = unsafe { output(dest.cast::<u8>(), capacity as usize)? };
        session.descriptors.get_string(descriptor, key, dest).map(drop)
    })
}

unsafe extern "C" fn descriptor_get_boolean(descriptor: Handle, key: u32, result: *mut Boolean) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = flag(session.descriptors.get_boolean(descriptor, key)?);
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_list(descriptor: Handle, key: u32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.get_list(descriptor, key, &mut session.lists)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_object(
    descriptor: Handle,
    key: u32,
    class: *mut u32,
    result: *mut Handle,
) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot; the class slot is optional.
        let (class, result) = unsafe { (class.as_mut(), out(result)?) };
        let (class_id, object) = session.descriptors.get_object(descriptor, key)?;
        if let Some(class) = class {
            *class = class_id;
        }
        *result = object;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_global_object(
    descriptor: Handle,
    key: u32,
    class: *mut u32,
    result: *mut Handle,
) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot; the class slot is optional.
        let (class, result) = unsafe { (class.as_mut(), out(result)?) };
        let (class_id, object) = session.descriptors.get_global_object(descriptor, key)?;
        if let Some(class) = class {
            *class = class_id;
        }
        *result = object;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_enumerated(
    descriptor: Handle,
    key: u32,
    type_id: *mut u32,
    result: *mut u32,
) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable value slot; the type slot is optional.
        let (type_id, result) = unsafe { (type_id.as_mut(), out(result)?) };
        let (type_code, value) = session.descriptors.get_enumerated(descriptor, key)?;
        if let Some(type_id) = type_id {
            *type_id = type_code;
        }
        *result = value;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_reference(descriptor: Handle, key: u32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session
            .descriptors
            .get_reference(descriptor, key, &mut session.references)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_class(descriptor: Handle, key: u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.get_class(descriptor, key)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_global_class(descriptor: Handle, key: u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.get_global_class(descriptor, key)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_alias(descriptor: Handle, key: u32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        let len = session.descriptors.get_alias_length(descriptor, key)?;
        let alias = session.handles.new_handle(len)?;
        session
            .descriptors
            .get_alias(descriptor, key, session.handles.data_mut(alias)?)?;
        *result = alias;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_has_keys(descriptor: Handle, keys: *const u32, result: *mut Boolean) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a zero-terminated key array and a writable slot.
        let (keys, result) = unsafe { (key_list(keys)?, out(result)?) };
        *result = flag(session.descriptors.has_keys(descriptor, keys)?);
        Ok(())
    })
}

unsafe extern "C" fn descriptor_put_integers(descriptor: Handle, key: u32, count: u32, values: *const i32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes `count` readable integers.
        let values = unsafe { input(values, count as usize)? };
        session.descriptors.put_integers(descriptor, key, values)
    })
}

unsafe extern "C" fn descriptor_get_integers(descriptor: Handle, key: u32, count: u32, values: *mut i32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin owns `count` writable integers.
        let values = unsafe { output(values, count as usize)? };
        session.descriptors.get_integers(descriptor, key, values)
    })
}

unsafe extern "C" fn descriptor_as_handle(descriptor: Handle, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.as_handle(descriptor)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_handle_to_descriptor(snapshot: Handle, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.descriptors.handle_to_descriptor(snapshot)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_put_zstring(descriptor: Handle, key: u32, zstring: Handle) -> SPErr {
    call(|session| {
        session
            .descriptors
            .put_zstring(descriptor, key, zstring, &session.strings)
    })
}

unsafe extern "C" fn descriptor_get_zstring(descriptor: Handle, key: u32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session
            .descriptors
            .get_zstring(descriptor, key, &mut session.strings)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_put_data(descriptor: Handle, key: u32, length: i32, data: *const u8) -> SPErr {
    call(|session| {
        let length = usize::try_from(length).map_err(|_| SuiteError::BadParameter("negative length"))?;
        // SAFETY: the plugin passes `length` readable bytes.
        let data = unsafe { input(data, length)? };
        session.descriptors.put_data(descriptor, key, data)
    })
}

unsafe extern "C" fn descriptor_get_data_length(descriptor: Handle, key: u32, result: *mut i32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = len_i32(session.descriptors.get_data_length(descriptor, key)?)?;
        Ok(())
    })
}

unsafe extern "C" fn descriptor_get_data(descriptor: Handle, key: u32, dest: *mut u8, capacity: i32) -> SPErr {
    call(|session| {
        let capacity = usize::try_from(capacity).map_err(|_| SuiteError::BadParameter("negative length"))?;
        // SAFETY: the plugin owns `capacity` writable bytes at `dest`.
        let dest = unsafe { output(dest, capacity)? };
        session.descriptors.get_data(descriptor, key, dest).map(drop)
    })
}

unsafe extern "C" fn descriptor_get_string_length(descriptor: Handle, key: u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = len_u32(session.descriptors.get_string_length(descriptor, key)?)?;
        Ok(())
    })
}

pub static DESCRIPTOR_SUITE: ActionDescriptorSuite = ActionDescriptorSuite {
    make: descriptor_make,
    free: descriptor_free,
    get_type: descriptor_get_type,
    get_key: descriptor_get_key,
    has_key: descriptor_has_key,
    get_count: descriptor_get_count,
    is_equal: descriptor_is_equal,
    erase: descriptor_erase,
    clear: descriptor_clear,
    put_integer: descriptor_put_integer,
    put_float: descriptor_put_float,
    put_unit_float: descriptor_put_unit_float,
    put_string: descriptor_put_string,
    put_boolean: descriptor_put_boolean,
    put_list: descriptor_put_list,
    put_object: descriptor_put_object,
    put_global_object: descriptor_put_global_object,
    put_enumerated: descriptor_put_enumerated,
    put_reference: descriptor_put_reference,
    put_class: descriptor_put_class,
    put_global_class: descriptor_put_global_class,
    put_alias: descriptor_put_alias,
    get_integer: descriptor_get_integer,
    get_float: descriptor_get_float,
    get_unit_float: descriptor_get_unit_float,
    get_string: descriptor_get_string,
    get_boolean: descriptor_get_boolean,
    get_list: descriptor_get_list,
    get_object: descriptor_get_object,
    get_global_object: descriptor_get_global_object,
    get_enumerated: descriptor_get_enumerated,
    get_reference: descriptor_get_reference,
    get_class: descriptor_get_class,
    get_global_class: descriptor_get_global_class,
    get_alias: descriptor_get_alias,
    has_keys: descriptor_has_keys,
    put_integers: descriptor_put_integers,
    get_integers: descriptor_get_integers,
    as_handle: descriptor_as_handle,
    handle_to_descriptor: descriptor_handle_to_descriptor,
    put_zstring: descriptor_put_zstring,
    get_zstring: descriptor_get_zstring,
    put_data: descriptor_put_data,
    get_data_length: descriptor_get_data_length,
    get_data: descriptor_get_data,
    get_string_length: descriptor_get_string_length,
};

// ============================================================================
// ActionReference suite
// ============================================================================

/// `ActionReference` suite, version 2.
#[repr(C)]
pub struct ActionReferenceSuite {
    pub make: unsafe extern "C" fn(*mut Handle) -> SPErr,
    pub free: unsafe extern "C" fn(Handle) -> SPErr,
    pub get_form: unsafe extern "C" fn(Handle, *mut u32) -> SPErr,
    pub get_desired_class: unsafe extern "C" fn(Handle, *mut u32) -> SPErr,
    pub put_name: unsafe extern "C" fn(Handle, u32, *const c_char) -> SPErr,
    pub put_index: unsafe extern "C" fn(Handle, u32, u32) -> SPErr,
    pub put_identifier: unsafe extern "C" fn(Handle, u32, u32) -> SPErr,
    pub put_offset: unsafe extern "C" fn(Handle, u32, i32) -> SPErr,
    pub put_enumerated: unsafe extern "C" fn(Handle, u32, u32, u32) -> SPErr,
    pub put_property: unsafe extern "C" fn(Handle, u32, u32) -> SPErr,
    pub put_class: unsafe extern "C" fn(Handle, u32) -> SPErr,
    pub get_name_length: unsafe extern "C" fn(Handle, *mut u32) -> SPErr,
    pub get_name: unsafe extern "C" fn(Handle, *mut c_char, u32) -> SPErr,
    pub get_index: unsafe extern "C" fn(Handle, *mut u32) -> SPErr,
    pub get_identifier: unsafe extern "C" fn(Handle, *mut u32) -> SPErr,
    pub get_offset: unsafe extern "C" fn(Handle, *mut i32) -> SPErr,
    pub get_enumerated: unsafe extern "C" fn(Handle, *mut u32, *mut u32) -> SPErr,
    pub get_property: unsafe extern "C" fn(Handle, *mut u32) -> SPErr,
    pub get_container: unsafe extern "C" fn(Handle, *mut Handle) -> SPErr,
}

unsafe extern "C" fn reference_make(result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.references.make()?;
        Ok(())
    })
}

unsafe extern "C" fn reference_free(reference: Handle) -> SPErr {
    call(|session| session.references.free(reference))
}

unsafe extern "C" fn reference_get_form(reference: Handle, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.references.get_form(reference)?.code();
        Ok(())
    })
}

unsafe extern "C" fn reference_get_desired_class(reference: Handle, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.references.get_desired_class(reference)?;
        Ok(())
    })
}

unsafe extern "C" fn reference_put_name(reference: Handle, class: u32, name: *const c_char) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a null-terminated string.
        let name = unsafe { cstring(name)? };
        session.references.put_name(reference, class, name)
    })
}

unsafe extern "C" fn reference_put_index(reference: Handle, class: u32, index: u32) -> SPErr {
    call(|session| session.references.put_index(reference, class, index))
}

unsafe extern "C" fn reference_put_identifier(reference: Handle, class: u32, id: u32) -> SPErr {
    call(|session| session.references.put_identifier(reference, class, id))
}

unsafe extern "C" fn reference_put_offset(reference: Handle, class: u32, offset: i32) -> SPErr {
    call(|session| session.references.put_offset(reference, class, offset))
}

unsafe extern "C" fn reference_put_enumerated(reference: Handle, class: u32, type_id: u32, value: u32) -> SPErr {
    call(|session| session.references.put_enumerated(reference, class, type_id, value))
}

unsafe extern "C" fn reference_put_property(reference: Handle, class: u32, key: u32) -> SPErr {
    call(|session| session.references.put_property(reference, class, key))
}

unsafe extern "C" fn reference_put_class(reference: Handle, class: u32) -> SPErr {
    call(|session| session.references.put_class(reference, class))
}

unsafe extern "C" fn reference_get_name_length(reference: Handle, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = len_u32(session.references.get_name_length(reference)?)?;
        Ok(())
    })
}

unsafe extern "C" fn reference_get_name(reference: Handle, dest: *mut c_char, capacity: u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin owns `capacity` writable bytes at `dest`.
        let dest = unsafe { output(dest.cast::<u8>(), capacity as usize)? };
        session.references.get_name(reference, dest).map(drop)
    })
}

unsafe extern "C" fn reference_get_index(reference: Handle, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.references.get_index(reference)?;
        Ok(())
    })
}

unsafe extern "C" fn reference_get_identifier(reference: Handle, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.references.get_identifier(reference)?;
        Ok(())
    })
}

unsafe extern "C" fn reference_get_offset(reference: Handle, result: *mut i32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.references.get_offset(reference)?;
        Ok(())
    })
}

unsafe extern "C" fn reference_get_enumerated(reference: Handle, type_id: *mut u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable value slot; the type slot is optional.
        let (type_id, result) = unsafe { (type_id.as_mut(), out(result)?) };
        let (type_code, value) = session.references.get_enumerated(reference)?;
        if let Some(type_id) = type_id {
            *type_id = type_code;
        }
        *result = value;
        Ok(())
    })
}

unsafe extern "C" fn reference_get_property(reference: Handle, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.references.get_property(reference)?;
        Ok(())
    })
}

unsafe extern "C" fn reference_get_container(reference: Handle, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.references.get_container(reference)?;
        Ok(())
    })
}

pub static REFERENCE_SUITE: ActionReferenceSuite = ActionReferenceSuite {
    make: reference_make,
    free: reference_free,
    get_form: reference_get_form,
    get_desired_class: reference_get_desired_class,
    put_name: reference_put_name,
    put_index: reference_put_index,
    put_identifier: reference_put_identifier,
    put_offset: reference_put_offset,
    put_enumerated: reference_put_enumerated,
    put_property: reference_put_property,
    put_class: reference_put_class,
    get_name_length: reference_get_name_length,
    get_name: reference_get_name,
    get_index: reference_get_index,
    get_identifier: reference_get_identifier,
    get_offset: reference_get_offset,
    get_enumerated: reference_get_enumerated,
    get_property: reference_get_property,
    get_container: reference_get_container,
};

// ============================================================================
// ActionList suite
// ============================================================================

/// `ActionList` suite, version 1.
#[repr(C)]
pub struct ActionListSuite {
    pub make: unsafe extern "C" fn(*mut Handle) -> SPErr,
    pub free: unsafe extern "C" fn(Handle) -> SPErr,
    pub get_type: unsafe extern "C" fn(Handle, u32, *mut u32) -> SPErr,
    pub get_count: unsafe extern "C" fn(Handle, *mut u32) -> SPErr,
    pub put_integer: unsafe extern "C" fn(Handle, i32) -> SPErr,
    pub put_float: unsafe extern "C" fn(Handle, f64) -> SPErr,
    pub put_unit_float: unsafe extern "C" fn(Handle, u32, f64) -> SPErr,
    pub put_string: unsafe extern "C" fn(Handle, *const c_char) -> SPErr,
    pub put_boolean: unsafe extern "C" fn(Handle, Boolean) -> SPErr,
    pub put_list: unsafe extern "C" fn(Handle, Handle) -> SPErr,
    pub put_object: unsafe extern "C" fn(Handle, u32, Handle) -> SPErr,
    pub put_enumerated: unsafe extern "C" fn(Handle, u32, u32) -> SPErr,
    pub put_reference: unsafe extern "C" fn(Handle, Handle) -> SPErr,
    pub put_class: unsafe extern "C" fn(Handle, u32) -> SPErr,
    pub put_zstring: unsafe extern "C" fn(Handle, Handle) -> SPErr,
    pub get_integer: unsafe extern "C" fn(Handle, u32, *mut i32) -> SPErr,
    pub get_float: unsafe extern "C" fn(Handle, u32, *mut f64) -> SPErr,
    pub get_unit_float: unsafe extern "C" fn(Handle, u32, *mut u32, *mut f64) -> SPErr,
    pub get_string_length: unsafe extern "C" fn(Handle, u32, *mut u32) -> SPErr,
    pub get_string: unsafe extern "C" fn(Handle, u32, *mut c_char, u32) -> SPErr,
    pub get_boolean: unsafe extern "C" fn(Handle, u32, *mut Boolean) -> SPErr,
    pub get_list: unsafe extern "C" fn(Handle, u32, *mut Handle) -> SPErr,
    pub get_object: unsafe extern "C" fn(Handle, u32, *mut u32, *mut Handle) -> SPErr,
    pub get_enumerated: unsafe extern "C" fn(Handle, u32, *mut u32, *mut u32) -> SPErr,
    pub get_reference: unsafe extern "C" fn(Handle, u32, *mut Handle) -> SPErr,
    pub get_class: unsafe extern "C" fn(Handle, u32, *mut u32) -> SPErr,
    pub get_zstring: unsafe extern "C" fn(Handle, u32, *mut Handle) -> SPErr,
}

unsafe extern "C" fn list_make(result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.lists.make()?;
        Ok(())
    })
}

unsafe extern "C" fn list_free(list: Handle) -> SPErr {
    call(|session| session.lists.free(list))
}

unsafe extern "C" fn list_get_type(list: Handle, index: u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.lists.get_type(list, index)?.code();
        Ok(())
    })
}

unsafe extern "C" fn list_get_count(list: Handle, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.lists.get_count(list)?;
        Ok(())
    })
}

unsafe extern "C" fn list_put_integer(list: Handle, value: i32) -> SPErr {
    call(|session| session.lists.put_integer(list, value))
}

unsafe extern "C" fn list_put_float(list: Handle, value: f64) -> SPErr {
    call(|session| session.lists.put_float(list, value))
}

unsafe extern "C" fn list_put_unit_float(list: Handle, unit: u32, value: f64) -> SPErr {
    call(|session| session.lists.put_unit_float(list, unit, value))
}

unsafe extern "C" fn list_put_string(list: Handle, text: *const c_char) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a null-terminated string.
        let text = unsafe { cstring(text)? };
        session.lists.put_string(list, text)
    })
}

unsafe extern "C" fn list_put_boolean(list: Handle, value: Boolean) -> SPErr {
    call(|session| session.lists.put_boolean(list, value != 0))
}

unsafe extern "C" fn list_put_list(list: Handle, other: Handle) -> SPErr {
    call(|session| session.lists.put_list(list, other))
}

unsafe extern "C" fn list_put_object(list: Handle, class: u32, object: Handle) -> SPErr {
    call(|session| session.lists.put_object(list, class, object, &session.descriptors))
}

unsafe extern "C" fn list_put_enumerated(list: Handle, type_id: u32, value: u32) -> SPErr {
    call(|session| session.lists.put_enumerated(list, type_id, value))
}

unsafe extern "C" fn list_put_reference(list: Handle, reference: Handle) -> SPErr {
    call(|session| session.lists.put_reference(list, reference, &session.references))
}

unsafe extern "C" fn list_put_class(list: Handle, class: u32) -> SPErr {
    call(|session| session.lists.put_class(list, class))
}

unsafe extern "C" fn list_put_zstring(list: Handle, zstring: Handle) -> SPErr {
    call(|session| session.lists.put_zstring(list, zstring, &session.strings))
}

unsafe extern "C" fn list_get_integer(list: Handle, index: u32, result: *mut i32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.lists.get_integer(list, index)?;
        Ok(())
    })
}

unsafe extern "C" fn list_get_float(list: Handle, index: u32, result: *mut f64) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.lists.get_float(list, index)?;
        Ok(())
    })
}

unsafe extern "C" fn list_get_unit_float(list: Handle, index: u32, unit: *mut u32, result: *mut f64) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable value slot; the unit slot is optional.
        let (unit, result) = unsafe { (unit.as_mut(), out(result)?) };
        let (unit_id, value) = session.lists.get_unit_float(list, index)?;
        if let Some(unit) = unit {
            *unit = unit_id;
        }
        *result = value;
        Ok(())
    })
}

unsafe extern "C" fn list_get_string_length(list: Handle, index: u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = len_u32(session.lists.get_string_length(list, index)?)?;
        Ok(())
    })
}

unsafe extern "C" fn list_get_string(list: Handle, index: u32, dest: *mut c_char, capacity: u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin owns `capacity` writable bytes at `dest`.
        let dest = unsafe { output(dest.cast::<u8>(), capacity as usize)? };
        session.lists.get_string(list, index, dest).map(drop)
    })
}

unsafe extern "C" fn list_get_boolean(list: Handle, index: u32, result: *mut Boolean) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = flag(session.lists.get_boolean(list, index)?);
        Ok(())
    })
}

unsafe extern "C" fn list_get_list(list: Handle, index: u32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.lists.get_list(list, index)?;
        Ok(())
    })
}

unsafe extern "C" fn list_get_object(list: Handle, index: u32, class: *mut u32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot; the class slot is optional.
        let (class, result) = unsafe { (class.as_mut(), out(result)?) };
        let (class_id, object) = session.lists.get_object(list, index, &mut session.descriptors)?;
        if let Some(class) = class {
            *class = class_id;
        }
        *result = object;
        Ok(())
    })
}

unsafe extern "C" fn list_get_enumerated(list: Handle, index: u32, type_id: *mut u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable value slot; the type slot is optional.
        let (type_id, result) = unsafe { (type_id.as_mut(), out(result)?) };
        let (type_code, value) = session.lists.get_enumerated(list, index)?;
        if let Some(type_id) = type_id {
            *type_id = type_code;
        }
        *result = value;
        Ok(())
    })
}

unsafe extern "C" fn list_get_reference(list: Handle, index: u32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.lists.get_reference(list, index, &mut session.references)?;
        Ok(())
    })
}

unsafe extern "C" fn list_get_class(list: Handle, index: u32, result: *mut u32) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable slot.
        let result = unsafe { out(result)? };
        *result = session.lists.get_class(list, index)?;
        Ok(())
    })
}

unsafe extern "C" fn list_get_zstring(list: Handle, index: u32, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a writable handle slot.
        let result = unsafe { out(result)? };
        *result = session.lists.get_zstring(list, index, &mut session.strings)?;
        Ok(())
    })
}

pub static LIST_SUITE: ActionListSuite = ActionListSuite {
    make: list_make,
    free: list_free,
    get_type: list_get_type,
    get_count: list_get_count,
    put_integer: list_put_integer,
    put_float: list_put_float,
    put_unit_float: list_put_unit_float,
    put_string: list_put_string,
    put_boolean: list_put_boolean,
    put_list: list_put_list,
    put_object: list_put_object,
    put_enumerated: list_put_enumerated,
    put_reference: list_put_reference,
    put_class: list_put_class,
    put_zstring: list_put_zstring,
    get_integer: list_get_integer,
    get_float: list_get_float,
    get_unit_float: list_get_unit_float,
    get_string_length: list_get_string_length,
    get_string: list_get_string,
    get_boolean: list_get_boolean,
    get_list: list_get_list,
    get_object: list_get_object,
    get_enumerated: list_get_enumerated,
    get_reference: list_get_reference,
    get_class: list_get_class,
    get_zstring: list_get_zstring,
};

// ============================================================================
// Descriptor registry suite
// ============================================================================

/// Descriptor registry suite, version 1.
#[repr(C)]
pub struct DescriptorRegistrySuite {
    pub register: unsafe extern "C" fn(*const c_char, Handle, Boolean) -> SPErr,
    pub erase: unsafe extern "C" fn(*const c_char) -> SPErr,
    pub get: unsafe extern "C" fn(*const c_char, *mut Handle) -> SPErr,
}

unsafe extern "C" fn registry_register(key: *const c_char, descriptor: Handle, persistent: Boolean) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a null-terminated key.
        let key = registry_key(unsafe { cstring(key)? })?;
        session
            .registry
            .register(&key, descriptor, persistent != 0, &session.descriptors)
    })
}

unsafe extern "C" fn registry_erase(key: *const c_char) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a null-terminated key.
        let key = registry_key(unsafe { cstring(key)? })?;
        session.registry.erase(&key)
    })
}

unsafe extern "C" fn registry_get(key: *const c_char, result: *mut Handle) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a null-terminated key and a writable handle slot.
        let (key, result) = unsafe { (cstring(key)?, out(result)?) };
        let key = registry_key(key)?;
        *result = session.registry.get(&key, &mut session.descriptors)?;
        Ok(())
    })
}

pub static REGISTRY_SUITE: DescriptorRegistrySuite = DescriptorRegistrySuite {
    register: registry_register,
    erase: registry_erase,
    get: registry_get,
};

// ============================================================================
// Buffer suite
// ============================================================================

/// Buffer suite, version 1.
#[repr(C)]
pub struct BufferProcsSuite {
    pub new: unsafe extern "C" fn(*mut u32, u32) -> Handle,
    pub dispose: unsafe extern "C" fn(*mut Handle),
    pub get_size: unsafe extern "C" fn(Handle) -> u32,
    pub get_space: unsafe extern "C" fn() -> u32,
    pub data: unsafe extern "C" fn(Handle) -> *mut u8,
}

unsafe extern "C" fn buffer_new(requested: *mut u32, minimum: u32) -> Handle {
    query(Handle::NULL, |session| {
        // SAFETY: the plugin passes a readable and writable size slot.
        let requested = unsafe { out(requested)? };
        let mut size = *requested as usize;
        let buffer = session.buffers.new_buffer(&mut size, minimum as usize);
        *requested = len_u32(size)?;
        Ok(buffer)
    })
}

unsafe extern "C" fn buffer_dispose(buffer: *mut Handle) {
    query((), |session| {
        // SAFETY: the plugin passes its handle variable.
        let buffer = unsafe { out(buffer)? };
        session.buffers.dispose(buffer)
    })
}

unsafe extern "C" fn buffer_get_size(buffer: Handle) -> u32 {
    query(0, |session| len_u32(session.buffers.get_size(buffer)?))
}

unsafe extern "C" fn buffer_get_space() -> u32 {
    query(0, |session| Ok(u32::try_from(session.buffers.get_space()).unwrap_or(u32::MAX)))
}

unsafe extern "C" fn buffer_data(buffer: Handle) -> *mut u8 {
    query(ptr::null_mut(), |session| Ok(session.buffers.data_mut(buffer)?.as_mut_ptr()))
}

pub static BUFFER_SUITE: BufferProcsSuite = BufferProcsSuite {
    new: buffer_new,
    dispose: buffer_dispose,
    get_size: buffer_get_size,
    get_space: buffer_get_space,
    data: buffer_data,
};

// ============================================================================
// Handle suite
// ============================================================================

/// Movable-memory handle suite, version 1.
#[repr(C)]
pub struct HandleProcsSuite {
    pub new: unsafe extern "C" fn(i32) -> Handle,
    pub dispose: unsafe extern "C" fn(Handle),
    pub get_size: unsafe extern "C" fn(Handle) -> i32,
    pub set_size: unsafe extern "C" fn(Handle, i32) -> SPErr,
    pub lock: unsafe extern "C" fn(Handle, Boolean) -> *mut u8,
    pub unlock: unsafe extern "C" fn(Handle),
}

unsafe extern "C" fn handle_new(size: i32) -> Handle {
    query(Handle::NULL, |session| {
        let size = usize::try_from(size).map_err(|_| SuiteError::BadParameter("negative size"))?;
        session.handles.new_handle(size)
    })
}

unsafe extern "C" fn handle_dispose(handle: Handle) {
    query((), |session| session.handles.dispose(handle))
}

unsafe extern "C" fn handle_get_size(handle: Handle) -> i32 {
    query(0, |session| len_i32(session.handles.get_size(handle)?))
}

unsafe extern "C" fn handle_set_size(handle: Handle, size: i32) -> SPErr {
    call(|session| {
        let size = usize::try_from(size).map_err(|_| SuiteError::BadParameter("negative size"))?;
        session.handles.set_size(handle, size)
    })
}

unsafe extern "C" fn handle_lock(handle: Handle, _move_high: Boolean) -> *mut u8 {
    query(ptr::null_mut(), |session| session.handles.lock(handle))
}

unsafe extern "C" fn handle_unlock(handle: Handle) {
    query((), |session| session.handles.unlock(handle))
}

pub static HANDLE_SUITE: HandleProcsSuite = HandleProcsSuite {
    new: handle_new,
    dispose: handle_dispose,
    get_size: handle_get_size,
    set_size: handle_set_size,
    lock: handle_lock,
    unlock: handle_unlock,
};

// ============================================================================
// Error suite
// ============================================================================

/// Error suite, version 1.
#[repr(C)]
pub struct ErrorProcsSuite {
    pub set_error_from_pstring: unsafe extern "C" fn(*const u8) -> SPErr,
    pub set_error_from_cstring: unsafe extern "C" fn(*const c_char) -> SPErr,
    pub set_error_from_zstring: unsafe extern "C" fn(Handle) -> SPErr,
}

unsafe extern "C" fn error_set_from_pstring(message: *const u8) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a length-prefixed string.
        let message = unsafe { pstring(message)? };
        session.errors.set_error_from_pstring(message)
    })
}

unsafe extern "C" fn error_set_from_cstring(message: *const c_char) -> SPErr {
    call(|session| {
        // SAFETY: the plugin passes a null-terminated string.
        let message = unsafe { cstring(message)? };
        session.errors.set_error_from_cstring(message)
    })
}

unsafe extern "C" fn error_set_from_zstring(message: Handle) -> SPErr {
    call(|session| session.errors.set_error_from_zstring(message, &session.strings))
}

pub static ERROR_SUITE: ErrorProcsSuite = ErrorProcsSuite {
    set_error_from_pstring: error_set_from_pstring,
    set_error_from_cstring: error_set_from_cstring,
    set_error_from_zstring: error_set_from_zstring,
};

// ============================================================================
// Suite acquisition
// ============================================================================

pub const ZSTRING_SUITE_NAME: &str = "AS ZString Suite";
pub const DESCRIPTOR_SUITE_NAME: &str = "df135115-c769-11d0-8079-00c04fd7ec47";
pub const REFERENCE_SUITE_NAME: &str = "df135116-c769-11d0-8079-00c04fd7ec47";
pub const LIST_SUITE_NAME: &str = "df135117-c769-11d0-8079-00c04fd7ec47";
pub const REGISTRY_SUITE_NAME: &str = "61e608b0-40fd-11d1-8da3-00c04fd5f7ee";
pub const BUFFER_SUITE_NAME: &str = "Photoshop Buffer Suite for Plug-ins";
pub const HANDLE_SUITE_NAME: &str = "Photoshop Handle Suite for Plug-ins";
pub const ERROR_SUITE_NAME: &str = "Photoshop Error Suite for Plug-ins";

/// Function table for a known `(name, version)` pair.
pub fn suite_table(name: &[u8], version: i32) -> Option<*const c_void> {
    fn table<T>(suite: &'static T) -> *const c_void {
        (suite as *const T).cast()
    }
    let name = std::str::from_utf8(name).ok()?;
    let found = match (name, version) {
        (ZSTRING_SUITE_NAME, 1) => table(&ZSTRING_SUITE),
        (DESCRIPTOR_SUITE_NAME, 2) => table(&DESCRIPTOR_SUITE),
        (REFERENCE_SUITE_NAME, 2) => table(&REFERENCE_SUITE),
        (LIST_SUITE_NAME, 1) => table(&LIST_SUITE),
        (REGISTRY_SUITE_NAME, 1) => table(&REGISTRY_SUITE),
        (BUFFER_SUITE_NAME, 1) => table(&BUFFER_SUITE),
        (HANDLE_SUITE_NAME, 1) => table(&HANDLE_SUITE),
        (ERROR_SUITE_NAME, 1) => table(&ERROR_SUITE),
        _ => return None,
    };
    Some(found)
}

/// Entry point plugins use to acquire the other suites.
#[repr(C)]
pub struct SPBasicSuite {
    pub acquire_suite: unsafe extern "C" fn(*const c_char, i32, *mut *const c_void) -> SPErr,
    pub release_suite: unsafe extern "C" fn(*const c_char, i32) -> SPErr,
    pub is_equal: unsafe extern "C" fn(*const c_char, *const c_char) -> Boolean,
}

unsafe extern "C" fn basic_acquire_suite(name: *const c_char, version: i32, suite: *mut *const c_void) -> SPErr {
    guarded(BAD_PARAMETER_CODE, || {
        if name.is_null() || suite.is_null() {
            return BAD_PARAMETER_CODE;
        }
        // SAFETY: non-null, and the plugin passes a null-terminated name.
        let name = unsafe { CStr::from_ptr(name) }.to_bytes();
        match suite_table(name, version) {
            Some(table) => {
                // SAFETY: non-null output slot supplied by the plugin.
                unsafe { suite.write(table) };
                NO_ERROR
            }
            None => {
                tracing::debug!(name = %String::from_utf8_lossy(name), version, "unknown suite requested");
                UNIMPLEMENTED_CODE
            }
        }
    })
}

unsafe extern "C" fn basic_release_suite(_name: *const c_char, _version: i32) -> SPErr {
    NO_ERROR
}

unsafe extern "C" fn basic_is_equal(a: *const c_char, b: *const c_char) -> Boolean {
    if a.is_null() || b.is_null() {
        return 0;
    }
    // SAFETY: both non-null and null-terminated per the plugin.
    flag(unsafe { CStr::from_ptr(a) == CStr::from_ptr(b) })
}

pub static BASIC_SUITE: SPBasicSuite = SPBasicSuite {
    acquire_suite: basic_acquire_suite,
    release_suite: basic_release_suite,
    is_equal: basic_is_equal,
};

/// The basic suite, handed to a plugin when it is invoked.
#[no_mangle]
pub extern "C" fn suitehost_basic_suite() -> *const SPBasicSuite {
    &BASIC_SUITE
}
