//! Structured parameter dictionaries (the ActionDescriptor suite).
//!
//! A descriptor is an insertion-ordered map from 32-bit keys to tagged
//! values. Plugins build one with `put_*` calls to record their settings and
//! read the host's with `get_*`. Every stored value carries the AETE flags
//! the plugin declared for its key.
//!
//! Values that name other host objects (sub-descriptors, lists, references,
//! strings) are copied in when stored and handed out as fresh handles when
//! read, so nothing in a descriptor aliases a live handle.
//!
//! [`DescriptorSuite::as_handle`] detaches a snapshot of a descriptor into a
//! separate handle space so the plugin can keep it as an opaque cookie, and
//! [`DescriptorSuite::handle_to_descriptor`] brings it back.

use crate::aete::ScriptingDictionary;
use crate::error::{Result, SuiteError};
use crate::handle::{Handle, HandleRegistry};
use crate::list::ListSuite;
use crate::reference::ReferenceSuite;
use crate::value::{
    ActionValue, AeteValue, DescriptorType, EnumeratedValue, ObjectValue, ScriptingParameters,
    UnitFloat,
};
use crate::zstring::StringSuite;

/// Host side of the descriptor suite for one session.
#[derive(Debug)]
pub struct DescriptorSuite {
    descriptors: HandleRegistry<ScriptingParameters>,
    snapshots: HandleRegistry<ScriptingParameters>,
    dictionary: ScriptingDictionary,
}

impl Default for DescriptorSuite {
    fn default() -> Self {
        Self::new(ScriptingDictionary::empty())
    }
}

impl DescriptorSuite {
    /// Create an empty suite tagging values from `dictionary`.
    pub fn new(dictionary: ScriptingDictionary) -> Self {
        Self {
            descriptors: HandleRegistry::new("descriptor"),
            snapshots: HandleRegistry::new("descriptor-snapshot"),
            dictionary,
        }
    }

    /// Create an empty descriptor.
    pub fn make(&mut self) -> Result<Handle> {
        self.descriptors.allocate(ScriptingParameters::new())
    }

    /// Create a descriptor holding a copy of `parameters`.
    pub fn make_from(&mut self, parameters: ScriptingParameters) -> Result<Handle> {
        self.descriptors.allocate(parameters)
    }

    /// Release a descriptor handle.
    pub fn free(&mut self, descriptor: Handle) -> Result<()> {
        self.descriptors.remove(descriptor).map(drop)
    }

    /// Borrow the contents of a live descriptor.
    pub fn parameters(&self, descriptor: Handle) -> Result<&ScriptingParameters> {
        self.descriptors.get(descriptor)
    }

    /// Number of live descriptors.
    pub fn live_count(&self) -> usize {
        self.descriptors.len()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Whether `key` is present.
    pub fn has_key(&self, descriptor: Handle, key: u32) -> Result<bool> {
        Ok(self.descriptors.get(descriptor)?.contains_key(key))
    }

    /// Whether every key up to the first `0` in `keys` is present.
    pub fn has_keys(&self, descriptor: Handle, keys: &[u32]) -> Result<bool> {
        let parameters = self.descriptors.get(descriptor)?;
        Ok(keys
            .iter()
            .take_while(|&&key| key != 0)
            .all(|&key| parameters.contains_key(key)))
    }

    /// Number of distinct keys.
    pub fn get_count(&self, descriptor: Handle) -> Result<u32> {
        let count = self.descriptors.get(descriptor)?.len();
        u32::try_from(count).map_err(|_| SuiteError::OutOfMemory)
    }

    /// Key at enumeration position `index`.
    pub fn get_key(&self, descriptor: Handle, index: u32) -> Result<u32> {
        self.descriptors
            .get(descriptor)?
            .key_at(index as usize)
            .ok_or(SuiteError::MissingParameter)
    }

    /// Type tag of the value at `key`.
    pub fn get_type(&self, descriptor: Handle, key: u32) -> Result<DescriptorType> {
        Ok(self.value(descriptor, key)?.reported_type())
    }

    /// AETE flags stored with the value at `key`.
    pub fn get_flags(&self, descriptor: Handle, key: u32) -> Result<i32> {
        Ok(self.value(descriptor, key)?.flags)
    }

    /// Remove `key`.
    pub fn erase(&mut self, descriptor: Handle, key: u32) -> Result<()> {
        self.descriptors
            .get_mut(descriptor)?
            .remove(key)
            .map(drop)
            .ok_or(SuiteError::MissingParameter)
    }

    /// Remove every key.
    pub fn clear(&mut self, descriptor: Handle) -> Result<()> {
        self.descriptors.get_mut(descriptor)?.clear();
        Ok(())
    }

    /// Structural equality. Not provided by this host.
    pub fn is_equal(&self, _descriptor: Handle, _other: Handle) -> Result<bool> {
        Err(SuiteError::Unimplemented)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn put_integer(&mut self, descriptor: Handle, key: u32, value: i32) -> Result<()> {
        self.put(descriptor, key, DescriptorType::Integer, ActionValue::Integer(value))
    }

    pub fn put_float(&mut self, descriptor: Handle, key: u32, value: f64) -> Result<()> {
        self.put(descriptor, key, DescriptorType::Float, ActionValue::Float(value))
    }

    pub fn put_unit_float(&mut self, descriptor: Handle, key: u32, unit: u32, value: f64) -> Result<()> {
        self.put(
            descriptor,
            key,
            DescriptorType::UnitFloat,
            ActionValue::UnitFloat(UnitFloat { unit, value }),
        )
    }

    pub fn put_boolean(&mut self, descriptor: Handle, key: u32, value: bool) -> Result<()> {
        self.put(descriptor, key, DescriptorType::Boolean, ActionValue::Boolean(value))
    }

    /// Store single-byte text. Anything after an embedded terminator is dropped.
    pub fn put_string(&mut self, descriptor: Handle, key: u32, text: &[u8]) -> Result<()> {
        let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
        let bytes = copy_bytes(&text[..end])?;
        self.put(descriptor, key, DescriptorType::Text, ActionValue::Text(bytes))
    }

    pub fn put_alias(&mut self, descriptor: Handle, key: u32, alias: &[u8]) -> Result<()> {
        let bytes = copy_bytes(alias)?;
        self.put(descriptor, key, DescriptorType::Alias, ActionValue::Alias(bytes))
    }

    pub fn put_data(&mut self, descriptor: Handle, key: u32, data: &[u8]) -> Result<()> {
        let bytes = copy_bytes(data)?;
        self.put(descriptor, key, DescriptorType::RawData, ActionValue::RawData(bytes))
    }

    pub fn put_integers(&mut self, descriptor: Handle, key: u32, values: &[i32]) -> Result<()> {
        let mut copy = Vec::new();
        copy.try_reserve_exact(values.len())
            .map_err(|_| SuiteError::OutOfMemory)?;
        copy.extend_from_slice(values);
        self.put(descriptor, key, DescriptorType::List, ActionValue::IntegerArray(copy))
    }

    pub fn put_enumerated(&mut self, descriptor: Handle, key: u32, type_id: u32, value: u32) -> Result<()> {
        self.put(
            descriptor,
            key,
            DescriptorType::Enumerated,
            ActionValue::Enumerated(EnumeratedValue { type_id, value }),
        )
    }

    pub fn put_class(&mut self, descriptor: Handle, key: u32, class: u32) -> Result<()> {
        self.put(descriptor, key, DescriptorType::Class, ActionValue::Class(class))
    }

    pub fn put_global_class(&mut self, descriptor: Handle, key: u32, class: u32) -> Result<()> {
        self.put(descriptor, key, DescriptorType::GlobalClass, ActionValue::Class(class))
    }

    /// Store a detached copy of the descriptor `object` under `key`.
    pub fn put_object(&mut self, descriptor: Handle, key: u32, class: u32, object: Handle) -> Result<()> {
        self.put_nested(descriptor, key, DescriptorType::Object, class, object)
    }

    pub fn put_global_object(&mut self, descriptor: Handle, key: u32, class: u32, object: Handle) -> Result<()> {
        self.put_nested(descriptor, key, DescriptorType::GlobalObject, class, object)
    }

    /// Store a copy of the list behind `list`.
    pub fn put_list(&mut self, descriptor: Handle, key: u32, list: Handle, lists: &ListSuite) -> Result<()> {
        let value = lists.list(list)?.clone();
        self.put(descriptor, key, DescriptorType::List, ActionValue::List(value))
    }

    /// Store the chain behind `reference`, from its cursor onward.
    pub fn put_reference(
        &mut self,
        descriptor: Handle,
        key: u32,
        reference: Handle,
        references: &ReferenceSuite,
    ) -> Result<()> {
        let value = references.to_value(reference)?;
        self.put(descriptor, key, DescriptorType::Reference, ActionValue::Reference(value))
    }

    /// Store the current text of the string object `zstring`.
    pub fn put_zstring(
        &mut self,
        descriptor: Handle,
        key: u32,
        zstring: Handle,
        strings: &StringSuite,
    ) -> Result<()> {
        let text = strings.text(zstring)?;
        self.put(descriptor, key, DescriptorType::Text, ActionValue::ZString(text))
    }

    /// Platform path records are not supported.
    pub fn put_path(&mut self, _descriptor: Handle, _key: u32, _path: &[u8]) -> Result<()> {
        Err(SuiteError::Unimplemented)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get_integer(&self, descriptor: Handle, key: u32) -> Result<i32> {
        self.value(descriptor, key)?.as_integer()
    }

    pub fn get_float(&self, descriptor: Handle, key: u32) -> Result<f64> {
        self.value(descriptor, key)?.as_float()
    }

    /// `(unit, value)` stored at `key`.
    pub fn get_unit_float(&self, descriptor: Handle, key: u32) -> Result<(u32, f64)> {
        let v = self.value(descriptor, key)?.as_unit_float()?;
        Ok((v.unit, v.value))
    }

    pub fn get_boolean(&self, descriptor: Handle, key: u32) -> Result<bool> {
        self.value(descriptor, key)?.as_boolean()
    }

    /// Length of the text at `key`, without terminator.
    pub fn get_string_length(&self, descriptor: Handle, key: u32) -> Result<usize> {
        Ok(self.value(descriptor, key)?.as_text()?.len())
    }

    /// Copy the text at `key` plus a terminator into `dest`.
    pub fn get_string(&self, descriptor: Handle, key: u32, dest: &mut [u8]) -> Result<usize> {
        let text = self.value(descriptor, key)?.as_text()?;
        let required = text.len() + 1;
        check_capacity(required, dest.len())?;
        dest[..text.len()].copy_from_slice(&text);
        dest[text.len()] = 0;
        Ok(required)
    }

    pub fn get_alias_length(&self, descriptor: Handle, key: u32) -> Result<usize> {
        Ok(self.value(descriptor, key)?.as_alias()?.len())
    }

    pub fn get_alias(&self, descriptor: Handle, key: u32, dest: &mut [u8]) -> Result<usize> {
        copy_out(self.value(descriptor, key)?.as_alias()?, dest)
    }

    pub fn get_data_length(&self, descriptor: Handle, key: u32) -> Result<usize> {
        Ok(self.value(descriptor, key)?.as_raw_data()?.len())
    }

    pub fn get_data(&self, descriptor: Handle, key: u32, dest: &mut [u8]) -> Result<usize> {
        copy_out(self.value(descriptor, key)?.as_raw_data()?, dest)
    }

    /// Fill `dest` with the first `dest.len()` stored integers.
    pub fn get_integers(&self, descriptor: Handle, key: u32, dest: &mut [i32]) -> Result<()> {
        let values = self.value(descriptor, key)?.as_integers()?;
        if dest.len() > values.len() {
            return Err(SuiteError::BadParameter("more integers requested than stored"));
        }
        dest.copy_from_slice(&values[..dest.len()]);
        Ok(())
    }

    /// `(type, value)` stored at `key`.
    pub fn get_enumerated(&self, descriptor: Handle, key: u32) -> Result<(u32, u32)> {
        let v = self.value(descriptor, key)?.as_enumerated()?;
        Ok((v.type_id, v.value))
    }

    pub fn get_class(&self, descriptor: Handle, key: u32) -> Result<u32> {
        self.value(descriptor, key)?.as_class()
    }

    pub fn get_global_class(&self, descriptor: Handle, key: u32) -> Result<u32> {
        self.get_class(descriptor, key)
    }

    /// Class of the nested descriptor at `key` and a new handle to a copy of it.
    pub fn get_object(&mut self, descriptor: Handle, key: u32) -> Result<(u32, Handle)> {
        let object = self.value(descriptor, key)?.as_object()?;
        let class = object.class;
        let copy = object.descriptor.clone();
        Ok((class, self.descriptors.allocate(copy)?))
    }

    pub fn get_global_object(&mut self, descriptor: Handle, key: u32) -> Result<(u32, Handle)> {
        self.get_object(descriptor, key)
    }

    /// New list handle holding a copy of the list at `key`.
    pub fn get_list(&self, descriptor: Handle, key: u32, lists: &mut ListSuite) -> Result<Handle> {
        let list = self.value(descriptor, key)?.as_list()?;
        lists.make_from(list.into_owned())
    }

    /// New reference handle over the chain at `key`.
    pub fn get_reference(
        &self,
        descriptor: Handle,
        key: u32,
        references: &mut ReferenceSuite,
    ) -> Result<Handle> {
        let reference = self.value(descriptor, key)?.as_reference()?;
        references.from_value(reference)
    }

    /// New string object holding the text at `key`.
    pub fn get_zstring(&self, descriptor: Handle, key: u32, strings: &mut StringSuite) -> Result<Handle> {
        let text = self.value(descriptor, key)?.as_zstring_text()?;
        strings.make_from_text(text.into_owned())
    }

    pub fn get_path(&self, _descriptor: Handle, _key: u32) -> Result<Vec<u8>> {
        Err(SuiteError::Unimplemented)
    }

    // ------------------------------------------------------------------
    // Externalization
    // ------------------------------------------------------------------

    /// Detach a snapshot of `descriptor` into the snapshot handle space.
    pub fn as_handle(&mut self, descriptor: Handle) -> Result<Handle> {
        let snapshot = self.descriptors.get(descriptor)?.clone();
        let handle = self.snapshots.allocate(snapshot)?;
        tracing::debug!(?descriptor, snapshot = ?handle, "descriptor externalized");
        Ok(handle)
    }

    /// Rebuild a live descriptor from a snapshot. The snapshot stays valid.
    pub fn handle_to_descriptor(&mut self, snapshot: Handle) -> Result<Handle> {
        let parameters = self.snapshots.get(snapshot)?.clone();
        self.descriptors.allocate(parameters)
    }

    /// Release a snapshot handle.
    pub fn dispose_snapshot(&mut self, snapshot: Handle) -> Result<()> {
        self.snapshots.remove(snapshot).map(drop)
    }

    /// Borrow the contents of a snapshot.
    pub fn snapshot(&self, snapshot: Handle) -> Result<&ScriptingParameters> {
        self.snapshots.get(snapshot)
    }

    /// Store a snapshot built by the host, e.g. settings from a previous run.
    pub fn make_snapshot(&mut self, parameters: ScriptingParameters) -> Result<Handle> {
        self.snapshots.allocate(parameters)
    }

    fn value(&self, descriptor: Handle, key: u32) -> Result<&AeteValue> {
        self.descriptors
            .get(descriptor)?
            .get(key)
            .ok_or(SuiteError::MissingParameter)
    }

    fn put(&mut self, descriptor: Handle, key: u32, type_tag: DescriptorType, value: ActionValue) -> Result<()> {
        let flags = self.dictionary.flags_for(key);
        let parameters = self.descriptors.get_mut(descriptor)?;
        parameters.insert(key, AeteValue::new(type_tag, flags, value));
        Ok(())
    }

    fn put_nested(
        &mut self,
        descriptor: Handle,
        key: u32,
        type_tag: DescriptorType,
        class: u32,
        object: Handle,
    ) -> Result<()> {
        let nested = self.descriptors.get(object)?.clone();
        self.put(
            descriptor,
            key,
            type_tag,
            ActionValue::Object(ObjectValue {
                class,
                descriptor: nested,
            }),
        )
    }
}

fn copy_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(bytes.len())
        .map_err(|_| SuiteError::OutOfMemory)?;
    copy.extend_from_slice(bytes);
    Ok(copy)
}

fn copy_out(bytes: &[u8], dest: &mut [u8]) -> Result<usize> {
    check_capacity(bytes.len(), dest.len())?;
    dest[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

fn check_capacity(required: usize, capacity: usize) -> Result<()> {
    if capacity < required {
        return Err(SuiteError::BufferTooSmall { required, capacity });
    }
    Ok(())
}
