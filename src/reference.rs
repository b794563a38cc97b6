//! Object-path references (the ActionReference suite).
//!
//! A reference is an ordered chain of segments, outermost first, such as
//! "the `Vsbl` property" / "of the 3rd layer" / "of the current document".
//! A reference handle views the chain through a cursor; `get_*` read the
//! segment under the cursor and [`ReferenceSuite::get_container`] hands out a
//! new handle one segment further in, or the null handle past the end.

use crate::error::{Result, SuiteError};
use crate::handle::{Handle, HandleRegistry};
use crate::value::{fourcc, EnumeratedValue};
use serde::{Deserialize, Serialize};

/// How a segment selects its object.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceForm {
    /// `'Clss'`
    Class = fourcc(b"Clss"),
    /// `'Enmr'`
    Enumerated = fourcc(b"Enmr"),
    /// `'Idnt'`
    Identifier = fourcc(b"Idnt"),
    /// `'indx'`
    Index = fourcc(b"indx"),
    /// `'rele'`
    Offset = fourcc(b"rele"),
    /// `'prop'`
    Property = fourcc(b"prop"),
    /// `'name'`
    Name = fourcc(b"name"),
}

impl ReferenceForm {
    /// The raw tag written back to the plugin.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Form-specific payload of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceData {
    /// The class alone.
    Class,
    /// An enumeration member, e.g. `'Ordn'`/`'Trgt'`.
    Enumerated(EnumeratedValue),
    /// Unique identifier.
    Identifier(u32),
    /// One-based index.
    Index(u32),
    /// Offset relative to the current object.
    Offset(i32),
    /// Property key.
    Property(u32),
    /// Single-byte name, without terminator.
    Name(Vec<u8>),
}

/// One segment of a reference chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    /// Class of the object this segment selects.
    pub desired_class: u32,
    /// Selector payload.
    pub data: ReferenceData,
}

impl ReferenceItem {
    /// Form tag of this segment.
    pub fn form(&self) -> ReferenceForm {
        match self.data {
            ReferenceData::Class => ReferenceForm::Class,
            ReferenceData::Enumerated(_) => ReferenceForm::Enumerated,
            ReferenceData::Identifier(_) => ReferenceForm::Identifier,
            ReferenceData::Index(_) => ReferenceForm::Index,
            ReferenceData::Offset(_) => ReferenceForm::Offset,
            ReferenceData::Property(_) => ReferenceForm::Property,
            ReferenceData::Name(_) => ReferenceForm::Name,
        }
    }
}

/// A reference as stored inside a descriptor or list: the ordered segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionDescriptorReference {
    /// Segments, outermost first.
    pub items: Vec<ReferenceItem>,
}

/// A live reference handle: a chain and the segment currently in view.
#[derive(Debug, Clone)]
struct ReferenceCursor {
    items: Vec<ReferenceItem>,
    position: usize,
}

impl ReferenceCursor {
    fn current(&self) -> Result<&ReferenceItem> {
        self.items
            .get(self.position)
            .ok_or(SuiteError::MissingParameter)
    }
}

/// Host side of the reference suite for one session.
#[derive(Debug)]
pub struct ReferenceSuite {
    references: HandleRegistry<ReferenceCursor>,
}

impl Default for ReferenceSuite {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceSuite {
    /// Create an empty suite.
    pub fn new() -> Self {
        Self {
            references: HandleRegistry::new("reference"),
        }
    }

    /// Create an empty chain.
    pub fn make(&mut self) -> Result<Handle> {
        self.references.allocate(ReferenceCursor {
            items: Vec::new(),
            position: 0,
        })
    }

    /// Release a reference handle.
    pub fn free(&mut self, reference: Handle) -> Result<()> {
        self.references.remove(reference).map(drop)
    }

    /// Append a class segment.
    pub fn put_class(&mut self, reference: Handle, desired_class: u32) -> Result<()> {
        self.push(reference, desired_class, ReferenceData::Class)
    }

    /// Append an enumerated segment.
    pub fn put_enumerated(
        &mut self,
        reference: Handle,
        desired_class: u32,
        type_id: u32,
        value: u32,
    ) -> Result<()> {
        self.push(
            reference,
            desired_class,
            ReferenceData::Enumerated(EnumeratedValue { type_id, value }),
        )
    }

    /// Append an identifier segment.
    pub fn put_identifier(&mut self, reference: Handle, desired_class: u32, id: u32) -> Result<()> {
        self.push(reference, desired_class, ReferenceData::Identifier(id))
    }

    /// Append an index segment.
    pub fn put_index(&mut self, reference: Handle, desired_class: u32, index: u32) -> Result<()> {
        self.push(reference, desired_class, ReferenceData::Index(index))
    }

    /// Append a relative-offset segment.
    pub fn put_offset(&mut self, reference: Handle, desired_class: u32, offset: i32) -> Result<()> {
        self.push(reference, desired_class, ReferenceData::Offset(offset))
    }

    /// Append a property segment.
    pub fn put_property(&mut self, reference: Handle, desired_class: u32, key: u32) -> Result<()> {
        self.push(reference, desired_class, ReferenceData::Property(key))
    }

    /// Append a name segment.
    pub fn put_name(&mut self, reference: Handle, desired_class: u32, name: &[u8]) -> Result<()> {
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        self.push(reference, desired_class, ReferenceData::Name(name[..end].to_vec()))
    }

    /// Form of the segment under the cursor.
    pub fn get_form(&self, reference: Handle) -> Result<ReferenceForm> {
        Ok(self.current(reference)?.form())
    }

    /// Desired class of the segment under the cursor.
    pub fn get_desired_class(&self, reference: Handle) -> Result<u32> {
        Ok(self.current(reference)?.desired_class)
    }

    /// Enumeration `(type, value)` of the segment under the cursor.
    pub fn get_enumerated(&self, reference: Handle) -> Result<(u32, u32)> {
        match self.current(reference)?.data {
            ReferenceData::Enumerated(e) => Ok((e.type_id, e.value)),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    /// Identifier of the segment under the cursor.
    pub fn get_identifier(&self, reference: Handle) -> Result<u32> {
        match self.current(reference)?.data {
            ReferenceData::Identifier(id) => Ok(id),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    /// Index of the segment under the cursor.
    pub fn get_index(&self, reference: Handle) -> Result<u32> {
        match self.current(reference)?.data {
            ReferenceData::Index(index) => Ok(index),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    /// Offset of the segment under the cursor.
    pub fn get_offset(&self, reference: Handle) -> Result<i32> {
        match self.current(reference)?.data {
            ReferenceData::Offset(offset) => Ok(offset),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    /// Property key of the segment under the cursor.
    pub fn get_property(&self, reference: Handle) -> Result<u32> {
        match self.current(reference)?.data {
            ReferenceData::Property(key) => Ok(key),
            _ => Err(SuiteError::MissingParameter),
        }
    }

    /// Length of the name under the cursor, without terminator.
    pub fn get_name_length(&self, reference: Handle) -> Result<usize> {
        Ok(self.name(reference)?.len())
    }

    /// Copy the name under the cursor plus a terminator into `dest`.
    pub fn get_name(&self, reference: Handle, dest: &mut [u8]) -> Result<usize> {
        let name = self.name(reference)?;
        let required = name.len() + 1;
        if dest.len() < required {
            return Err(SuiteError::BufferTooSmall {
                required,
                capacity: dest.len(),
            });
        }
        dest[..name.len()].copy_from_slice(name);
        dest[name.len()] = 0;
        Ok(required)
    }

    /// Handle viewing the next segment in, or null past the last segment.
    pub fn get_container(&mut self, reference: Handle) -> Result<Handle> {
        let cursor = self.references.get(reference)?;
        let next = cursor.position + 1;
        if next >= cursor.items.len() {
            return Ok(Handle::NULL);
        }
        let container = ReferenceCursor {
            items: cursor.items.clone(),
            position: next,
        };
        self.references.allocate(container)
    }

    /// Detach the chain as seen from the cursor onward.
    pub fn to_value(&self, reference: Handle) -> Result<ActionDescriptorReference> {
        let cursor = self.references.get(reference)?;
        Ok(ActionDescriptorReference {
            items: cursor.items[cursor.position.min(cursor.items.len())..].to_vec(),
        })
    }

    /// Issue a new handle over a stored chain.
    pub fn from_value(&mut self, value: &ActionDescriptorReference) -> Result<Handle> {
        self.references.allocate(ReferenceCursor {
            items: value.items.clone(),
            position: 0,
        })
    }

    /// Number of live reference handles.
    pub fn live_count(&self) -> usize {
        self.references.len()
    }

    fn push(&mut self, reference: Handle, desired_class: u32, data: ReferenceData) -> Result<()> {
        let cursor = self.references.get_mut(reference)?;
        cursor.items.push(ReferenceItem {
            desired_class,
            data,
        });
        Ok(())
    }

    fn current(&self, reference: Handle) -> Result<&ReferenceItem> {
        self.references.get(reference)?.current()
    }

    fn name(&self, reference: Handle) -> Result<&[u8]> {
        match &self.current(reference)?.data {
            ReferenceData::Name(name) => Ok(name),
            _ => Err(SuiteError::MissingParameter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER: u32 = fourcc(b"Lyr ");
    const DOCUMENT: u32 = fourcc(b"Dcmn");
    const PROPERTY: u32 = fourcc(b"Prpr");
    const VISIBLE: u32 = fourcc(b"Vsbl");

    #[test]
    fn test_walk_terminates_after_put_count() {
        let mut suite = ReferenceSuite::new();
        let reference = suite.make().unwrap();
        suite.put_property(reference, PROPERTY, VISIBLE).unwrap();
        suite.put_index(reference, LAYER, 3).unwrap();
        suite.put_enumerated(reference, DOCUMENT, fourcc(b"Ordn"), fourcc(b"Trgt")).unwrap();

        let mut steps = 0;
        let mut current = reference;
        while !current.is_null() {
            current = suite.get_container(current).unwrap();
            steps += 1;
        }
        assert_eq!(steps, 3);
    }

    #[test]
    fn test_container_reads_next_segment() {
        let mut suite = ReferenceSuite::new();
        let reference = suite.make().unwrap();
        suite.put_property(reference, PROPERTY, VISIBLE).unwrap();
        suite.put_index(reference, LAYER, 3).unwrap();

        assert_eq!(suite.get_form(reference).unwrap(), ReferenceForm::Property);
        assert_eq!(suite.get_property(reference).unwrap(), VISIBLE);

        let container = suite.get_container(reference).unwrap();
        assert_eq!(suite.get_form(container).unwrap(), ReferenceForm::Index);
        assert_eq!(suite.get_desired_class(container).unwrap(), LAYER);
        assert_eq!(suite.get_index(container).unwrap(), 3);
        assert!(suite.get_container(container).unwrap().is_null());
    }

    #[test]
    fn test_empty_chain_is_missing() {
        let mut suite = ReferenceSuite::new();
        let reference = suite.make().unwrap();
        assert_eq!(suite.get_form(reference), Err(SuiteError::MissingParameter));
        assert!(suite.get_container(reference).unwrap().is_null());
    }

    #[test]
    fn test_wrong_form_is_missing() {
        let mut suite = ReferenceSuite::new();
        let reference = suite.make().unwrap();
        suite.put_offset(reference, LAYER, -1).unwrap();
        assert_eq!(suite.get_index(reference), Err(SuiteError::MissingParameter));
        assert_eq!(suite.get_offset(reference).unwrap(), -1);
    }

    #[test]
    fn test_name_round_trip() {
        let mut suite = ReferenceSuite::new();
        let reference = suite.make().unwrap();
        suite.put_name(reference, LAYER, b"Background\0").unwrap();
        assert_eq!(suite.get_name_length(reference).unwrap(), 10);
        let mut small = [0u8; 10];
        assert!(matches!(
            suite.get_name(reference, &mut small),
            Err(SuiteError::BufferTooSmall { required: 11, .. })
        ));
        let mut out = [0u8; 11];
        assert_eq!(suite.get_name(reference, &mut out).unwrap(), 11);
        assert_eq!(&out, b"Background\0");
    }

    #[test]
    fn test_value_conversion_starts_at_cursor() {
        let mut suite = ReferenceSuite::new();
        let reference = suite.make().unwrap();
        suite.put_class(reference, DOCUMENT).unwrap();
        suite.put_identifier(reference, LAYER, 77).unwrap();
        let container = suite.get_container(reference).unwrap();

        let value = suite.to_value(container).unwrap();
        assert_eq!(value.items.len(), 1);
        let rebuilt = suite.from_value(&value).unwrap();
        assert_eq!(suite.get_identifier(rebuilt).unwrap(), 77);
    }

    #[test]
    fn test_free_invalidates() {
        let mut suite = ReferenceSuite::new();
        let reference = suite.make().unwrap();
        suite.free(reference).unwrap();
        assert!(matches!(suite.put_class(reference, LAYER), Err(SuiteError::BadParameter(_))));
        assert_eq!(suite.live_count(), 0);
    }
}
