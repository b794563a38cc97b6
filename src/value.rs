//! Scripting parameter values and the ordered parameter dictionary.
//!
//! Every entry a plugin stores in a descriptor or list becomes an
//! [`AeteValue`]: a type tag, the AETE flags the plugin declared for the key,
//! and an [`ActionValue`] holding the payload. Nested descriptors, lists and
//! references are owned by value, so mutating the source after it has been
//! attached never reaches the copy.

use crate::error::{Result, SuiteError};
use crate::reference::ActionDescriptorReference;
use crate::zstring::{decode_latin1, encode_latin1};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Pack four ASCII bytes into a big-endian 32-bit key.
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

/// Doubles are stored as their IEEE-754 bit pattern so every value,
/// including NaN and the infinities, reloads bit for bit.
mod float_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        u64::deserialize(deserializer).map(f64::from_bits)
    }
}

/// Descriptor type tags as the plugin sees them.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorType {
    /// `'long'`
    Integer = fourcc(b"long"),
    /// `'doub'`
    Float = fourcc(b"doub"),
    /// `'UntF'`
    UnitFloat = fourcc(b"UntF"),
    /// `'bool'`
    Boolean = fourcc(b"bool"),
    /// `'TEXT'`
    Text = fourcc(b"TEXT"),
    /// `'alis'`
    Alias = fourcc(b"alis"),
    /// `'tdta'`
    RawData = fourcc(b"tdta"),
    /// `'Objc'`
    Object = fourcc(b"Objc"),
    /// `'GlbO'`
    GlobalObject = fourcc(b"GlbO"),
    /// `'enum'`
    Enumerated = fourcc(b"enum"),
    /// `'type'`
    Class = fourcc(b"type"),
    /// `'GlbC'`
    GlobalClass = fourcc(b"GlbC"),
    /// `'obj '`
    Reference = fourcc(b"obj "),
    /// `'VlLs'`
    List = fourcc(b"VlLs"),
}

impl DescriptorType {
    /// The raw tag written back to the plugin.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// A measurement paired with its unit, e.g. `'#Pxl'` or `'#Prc'`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitFloat {
    /// Unit key.
    pub unit: u32,
    /// Value in that unit.
    #[serde(with = "float_bits")]
    pub value: f64,
}

/// One member of an enumeration type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratedValue {
    /// Enumeration type key.
    pub type_id: u32,
    /// Selected member.
    pub value: u32,
}

/// A nested descriptor together with its class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectValue {
    /// Class key of the object.
    pub class: u32,
    /// Detached copy of the nested parameters.
    pub descriptor: ScriptingParameters,
}

/// Ordered list of tagged values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionList {
    /// Items in insertion order.
    pub items: Vec<AeteValue>,
}

/// Payload of a scripting parameter, one case per supported kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionValue {
    /// 32-bit integer.
    Integer(i32),
    /// Double.
    Float(#[serde(with = "float_bits")] f64),
    /// Double with a unit.
    UnitFloat(UnitFloat),
    /// Boolean.
    Boolean(bool),
    /// Single-byte text, without terminator.
    Text(Vec<u8>),
    /// Platform alias record.
    Alias(Vec<u8>),
    /// Opaque byte blob.
    RawData(Vec<u8>),
    /// Array of integers.
    IntegerArray(Vec<i32>),
    /// Enumeration member.
    Enumerated(EnumeratedValue),
    /// Class key.
    Class(u32),
    /// Nested descriptor.
    Object(ObjectValue),
    /// Nested list.
    List(ActionList),
    /// Object-path reference.
    Reference(ActionDescriptorReference),
    /// Text captured from a string object.
    ZString(String),
}

/// Tagged value stored under a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeteValue {
    /// Tag reported by `get_type`.
    pub type_tag: DescriptorType,
    /// AETE flags declared for the key.
    pub flags: i32,
    /// The payload.
    pub value: ActionValue,
}

impl AeteValue {
    /// Tag `value` with `type_tag` and `flags`.
    pub fn new(type_tag: DescriptorType, flags: i32, value: ActionValue) -> Self {
        Self {
            type_tag,
            flags,
            value,
        }
    }

    /// Byte length of blob-like payloads, zero for scalars.
    pub fn size(&self) -> usize {
        match &self.value {
            ActionValue::Text(bytes) | ActionValue::Alias(bytes) | ActionValue::RawData(bytes) => {
                bytes.len()
            }
            ActionValue::IntegerArray(values) => values.len() * std::mem::size_of::<i32>(),
            ActionValue::ZString(text) => text.len(),
            _ => 0,
        }
    }
}

// Typed reads. A value of another kind reads as MissingParameter.
impl AeteValue {
    /// Tag reported to the plugin. Nested descriptors always read as
    /// `Object`, since sub-descriptors are fetched with `get_object`.
    pub fn reported_type(&self) -> DescriptorType {
        match self.value {
            ActionValue::Object(_) => DescriptorType::Object,
            _ => self.type_tag,
        }
    }

    pub fn as_integer(&self) -> Result<i32> {
        match self.value {
            ActionValue::Integer(v) => Ok(v),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self.value {
            ActionValue::Float(v) => Ok(v),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    pub fn as_unit_float(&self) -> Result<UnitFloat> {
        match self.value {
            ActionValue::UnitFloat(v) => Ok(v),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    pub fn as_boolean(&self) -> Result<bool> {
        match self.value {
            ActionValue::Boolean(v) => Ok(v),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    /// Single-byte text. String objects stored with `put_zstring` read too.
    pub fn as_text(&self) -> Result<Cow<'_, [u8]>> {
        match &self.value {
            ActionValue::Text(bytes) => Ok(Cow::Borrowed(bytes)),
            ActionValue::ZString(text) => Ok(Cow::Owned(encode_latin1(text).collect())),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    /// Text for a string object. Plain single-byte text reads too.
    pub fn as_zstring_text(&self) -> Result<Cow<'_, str>> {
        match &self.value {
            ActionValue::ZString(text) => Ok(Cow::Borrowed(text)),
            ActionValue::Text(bytes) => Ok(Cow::Owned(decode_latin1(bytes)?)),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    pub fn as_alias(&self) -> Result<&[u8]> {
        match &self.value {
            ActionValue::Alias(bytes) => Ok(bytes),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    pub fn as_raw_data(&self) -> Result<&[u8]> {
        match &self.value {
            ActionValue::RawData(bytes) => Ok(bytes),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    /// Integers stored with `put_integers`, or a list holding only integers.
    pub fn as_integers(&self) -> Result<Cow<'_, [i32]>> {
        match &self.value {
            ActionValue::IntegerArray(values) => Ok(Cow::Borrowed(values)),
            ActionValue::List(list) => list
                .items
                .iter()
                .map(AeteValue::as_integer)
                .collect::<Result<Vec<_>>>()
                .map(Cow::Owned),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    pub fn as_enumerated(&self) -> Result<EnumeratedValue> {
        match self.value {
            ActionValue::Enumerated(v) => Ok(v),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    pub fn as_class(&self) -> Result<u32> {
        match self.value {
            ActionValue::Class(v) => Ok(v),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    pub fn as_object(&self) -> Result<&ObjectValue> {
        match &self.value {
            ActionValue::Object(object) => Ok(object),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    /// A list. An integer array reads as a list of integers.
    pub fn as_list(&self) -> Result<Cow<'_, ActionList>> {
        match &self.value {
            ActionValue::List(list) => Ok(Cow::Borrowed(list)),
            ActionValue::IntegerArray(values) => Ok(Cow::Owned(ActionList {
                items: values
                    .iter()
                    .map(|&v| AeteValue::new(DescriptorType::Integer, self.flags, ActionValue::Integer(v)))
                    .collect(),
            })),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    pub fn as_reference(&self) -> Result<&ActionDescriptorReference> {
        match &self.value {
            ActionValue::Reference(reference) => Ok(reference),
            _ => Err(SuiteError::MissingParameter),
        }
    }
}

/// Ordered key to value dictionary backing a descriptor.
///
/// Enumeration follows first insertion. Overwriting a key keeps its
/// position; removing a key drops it from both the table and the order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptingParameters {
    values: IndexMap<u32, AeteValue>,
}

impl ScriptingParameters {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `key`, keeping the position of an existing key.
    pub fn insert(&mut self, key: u32, value: AeteValue) {
        self.values.insert(key, value);
    }

    /// Value at `key`.
    pub fn get(&self, key: u32) -> Option<&AeteValue> {
        self.values.get(&key)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: u32) -> Option<AeteValue> {
        self.values.shift_remove(&key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: u32) -> bool {
        self.values.contains_key(&key)
    }

    /// Key at enumeration position `index`.
    pub fn key_at(&self, index: usize) -> Option<u32> {
        self.values.get_index(index).map(|(key, _)| *key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the dictionary has no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Entries in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &AeteValue)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }
}

impl FromIterator<(u32, AeteValue)> for ScriptingParameters {
    fn from_iter<I: IntoIterator<Item = (u32, AeteValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i32) -> AeteValue {
        AeteValue::new(DescriptorType::Integer, 0, ActionValue::Integer(v))
    }

    #[test]
    fn test_fourcc() {
        assert_eq!(fourcc(b"long"), 0x6c6f_6e67);
        assert_eq!(DescriptorType::Reference.code(), 0x6f62_6a20);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut params = ScriptingParameters::new();
        params.insert(1, int(10));
        params.insert(2, int(20));
        params.insert(1, int(11));
        assert_eq!(params.len(), 2);
        assert_eq!(params.key_at(0), Some(1));
        assert_eq!(params.key_at(1), Some(2));
        assert_eq!(params.get(1), Some(&int(11)));
    }

    #[test]
    fn test_remove_preserves_order_of_rest() {
        let mut params: ScriptingParameters = (1..=4).map(|k| (k, int(k as i32))).collect();
        params.remove(2);
        let keys: Vec<u32> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![1, 3, 4]);
        assert!(!params.contains_key(2));
        assert_eq!(params.key_at(3), None);
    }

    #[test]
    fn test_size_of_blob_values() {
        let raw = AeteValue::new(DescriptorType::RawData, 0, ActionValue::RawData(vec![0; 12]));
        assert_eq!(raw.size(), 12);
        let ints = AeteValue::new(DescriptorType::List, 0, ActionValue::IntegerArray(vec![1, 2]));
        assert_eq!(ints.size(), 8);
        assert_eq!(int(5).size(), 0);
    }

    #[test]
    fn test_serde_preserves_order() {
        let params: ScriptingParameters = [(9, int(1)), (3, int(2)), (5, int(3))].into_iter().collect();
        let json = serde_json::to_string(&params).unwrap();
        let back: ScriptingParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
        assert_eq!(back.key_at(0), Some(9));
    }
}
