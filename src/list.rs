//! Ordered value lists (the ActionList suite).
//!
//! Lists hold the same tagged values as descriptors, addressed by position
//! instead of key. A descriptor stores a copy of a list with `put_list` and
//! hands a fresh list handle back from `get_list`.

use crate::descriptor::DescriptorSuite;
use crate::error::{Result, SuiteError};
use crate::handle::{Handle, HandleRegistry};
use crate::reference::ReferenceSuite;
use crate::value::{
    ActionList, ActionValue, AeteValue, DescriptorType, EnumeratedValue, ObjectValue, UnitFloat,
};
use crate::zstring::StringSuite;

/// Host side of the list suite for one session.
#[derive(Debug)]
pub struct ListSuite {
    lists: HandleRegistry<ActionList>,
}

impl Default for ListSuite {
    fn default() -> Self {
        Self::new()
    }
}

impl ListSuite {
    /// Create an empty suite.
    pub fn new() -> Self {
        Self {
            lists: HandleRegistry::new("list"),
        }
    }

    /// Create an empty list.
    pub fn make(&mut self) -> Result<Handle> {
        self.lists.allocate(ActionList::default())
    }

    /// Create a list holding `list`.
    pub fn make_from(&mut self, list: ActionList) -> Result<Handle> {
        self.lists.allocate(list)
    }

    /// Release a list handle.
    pub fn free(&mut self, list: Handle) -> Result<()> {
        self.lists.remove(list).map(drop)
    }

    /// Borrow a live list.
    pub fn list(&self, list: Handle) -> Result<&ActionList> {
        self.lists.get(list)
    }

    /// Number of items.
    pub fn get_count(&self, list: Handle) -> Result<u32> {
        u32::try_from(self.lists.get(list)?.items.len()).map_err(|_| SuiteError::OutOfMemory)
    }

    /// Type tag of the item at `index`.
    pub fn get_type(&self, list: Handle, index: u32) -> Result<DescriptorType> {
        Ok(self.item(list, index)?.reported_type())
    }

    pub fn put_integer(&mut self, list: Handle, value: i32) -> Result<()> {
        self.push(list, DescriptorType::Integer, ActionValue::Integer(value))
    }

    pub fn put_float(&mut self, list: Handle, value: f64) -> Result<()> {
        self.push(list, DescriptorType::Float, ActionValue::Float(value))
    }

    pub fn put_unit_float(&mut self, list: Handle, unit: u32, value: f64) -> Result<()> {
        self.push(
            list,
            DescriptorType::UnitFloat,
            ActionValue::UnitFloat(UnitFloat { unit, value }),
        )
    }

    pub fn put_boolean(&mut self, list: Handle, value: bool) -> Result<()> {
        self.push(list, DescriptorType::Boolean, ActionValue::Boolean(value))
    }

    pub fn put_string(&mut self, list: Handle, text: &[u8]) -> Result<()> {
        let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
        self.push(list, DescriptorType::Text, ActionValue::Text(text[..end].to_vec()))
    }

    pub fn put_enumerated(&mut self, list: Handle, type_id: u32, value: u32) -> Result<()> {
        self.push(
            list,
            DescriptorType::Enumerated,
            ActionValue::Enumerated(EnumeratedValue { type_id, value }),
        )
    }

    pub fn put_class(&mut self, list: Handle, class: u32) -> Result<()> {
        self.push(list, DescriptorType::Class, ActionValue::Class(class))
    }

    /// Append a detached copy of the descriptor `object`.
    pub fn put_object(
        &mut self,
        list: Handle,
        class: u32,
        object: Handle,
        descriptors: &DescriptorSuite,
    ) -> Result<()> {
        let descriptor = descriptors.parameters(object)?.clone();
        self.push(
            list,
            DescriptorType::Object,
            ActionValue::Object(ObjectValue { class, descriptor }),
        )
    }

    pub fn put_reference(
        &mut self,
        list: Handle,
        reference: Handle,
        references: &ReferenceSuite,
    ) -> Result<()> {
        let value = references.to_value(reference)?;
        self.push(list, DescriptorType::Reference, ActionValue::Reference(value))
    }

    pub fn put_zstring(&mut self, list: Handle, zstring: Handle, strings: &StringSuite) -> Result<()> {
        let text = strings.text(zstring)?;
        self.push(list, DescriptorType::Text, ActionValue::ZString(text))
    }

    /// Append a copy of another list. Appending a list to itself copies it first.
    pub fn put_list(&mut self, list: Handle, other: Handle) -> Result<()> {
        let nested = self.lists.get(other)?.clone();
        self.push(list, DescriptorType::List, ActionValue::List(nested))
    }

    pub fn get_integer(&self, list: Handle, index: u32) -> Result<i32> {
        self.item(list, index)?.as_integer()
    }

    pub fn get_float(&self, list: Handle, index: u32) -> Result<f64> {
        self.item(list, index)?.as_float()
    }

    pub fn get_unit_float(&self, list: Handle, index: u32) -> Result<(u32, f64)> {
        let v = self.item(list, index)?.as_unit_float()?;
        Ok((v.unit, v.value))
    }

    pub fn get_boolean(&self, list: Handle, index: u32) -> Result<bool> {
        self.item(list, index)?.as_boolean()
    }

    pub fn get_string_length(&self, list: Handle, index: u32) -> Result<usize> {
        Ok(self.item(list, index)?.as_text()?.len())
    }

    /// Copy the text at `index` plus a terminator into `dest`.
    pub fn get_string(&self, list: Handle, index: u32, dest: &mut [u8]) -> Result<usize> {
        let text = self.item(list, index)?.as_text()?;
        let required = text.len() + 1;
        if dest.len() < required {
            return Err(SuiteError::BufferTooSmall {
                required,
                capacity: dest.len(),
            });
        }
        dest[..text.len()].copy_from_slice(&text);
        dest[text.len()] = 0;
        Ok(required)
    }

    pub fn get_enumerated(&self, list: Handle, index: u32) -> Result<(u32, u32)> {
        let v = self.item(list, index)?.as_enumerated()?;
        Ok((v.type_id, v.value))
    }

    pub fn get_class(&self, list: Handle, index: u32) -> Result<u32> {
        self.item(list, index)?.as_class()
    }

    /// Class of the descriptor at `index` and a new handle to a copy of it.
    pub fn get_object(
        &self,
        list: Handle,
        index: u32,
        descriptors: &mut DescriptorSuite,
    ) -> Result<(u32, Handle)> {
        let object = self.item(list, index)?.as_object()?;
        let handle = descriptors.make_from(object.descriptor.clone())?;
        Ok((object.class, handle))
    }

    pub fn get_reference(
        &self,
        list: Handle,
        index: u32,
        references: &mut ReferenceSuite,
    ) -> Result<Handle> {
        references.from_value(self.item(list, index)?.as_reference()?)
    }

    pub fn get_zstring(&self, list: Handle, index: u32, strings: &mut StringSuite) -> Result<Handle> {
        let text = self.item(list, index)?.as_zstring_text()?;
        strings.make_from_text(text.into_owned())
    }

    /// New list handle holding a copy of the nested list at `index`.
    pub fn get_list(&mut self, list: Handle, index: u32) -> Result<Handle> {
        let nested = self.item(list, index)?.as_list()?.into_owned();
        self.lists.allocate(nested)
    }

    fn item(&self, list: Handle, index: u32) -> Result<&AeteValue> {
        self.lists
            .get(list)?
            .items
            .get(index as usize)
            .ok_or(SuiteError::MissingParameter)
    }

    fn push(&mut self, list: Handle, type_tag: DescriptorType, value: ActionValue) -> Result<()> {
        self.lists
            .get_mut(list)?
            .items
            .push(AeteValue::new(type_tag, 0, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::fourcc;

    #[test]
    fn test_mixed_items() {
        let mut suite = ListSuite::new();
        let list = suite.make().unwrap();
        suite.put_integer(list, 7).unwrap();
        suite.put_string(list, b"abc").unwrap();
        suite.put_unit_float(list, fourcc(b"#Prc"), 50.0).unwrap();

        assert_eq!(suite.get_count(list).unwrap(), 3);
        assert_eq!(suite.get_type(list, 0).unwrap(), DescriptorType::Integer);
        assert_eq!(suite.get_integer(list, 0).unwrap(), 7);
        assert_eq!(suite.get_string_length(list, 1).unwrap(), 3);
        assert_eq!(suite.get_unit_float(list, 2).unwrap(), (fourcc(b"#Prc"), 50.0));
        assert_eq!(suite.get_integer(list, 1), Err(SuiteError::MissingParameter));
        assert_eq!(suite.get_integer(list, 3), Err(SuiteError::MissingParameter));
    }

    #[test]
    fn test_object_items_are_copies() {
        let mut suite = ListSuite::new();
        let mut descriptors = DescriptorSuite::default();
        let list = suite.make().unwrap();
        let d = descriptors.make().unwrap();
        descriptors.put_boolean(d, fourcc(b"Vsbl"), true).unwrap();
        suite.put_object(list, fourcc(b"Lyr "), d, &descriptors).unwrap();
        descriptors.free(d).unwrap();

        let (class, fetched) = suite.get_object(list, 0, &mut descriptors).unwrap();
        assert_eq!(class, fourcc(b"Lyr "));
        assert!(descriptors.get_boolean(fetched, fourcc(b"Vsbl")).unwrap());
    }

    #[test]
    fn test_nested_list_and_descriptor_round_trip() {
        let mut lists = ListSuite::new();
        let mut descriptors = DescriptorSuite::default();
        let inner = lists.make().unwrap();
        lists.put_boolean(inner, false).unwrap();
        let outer = lists.make().unwrap();
        lists.put_list(outer, inner).unwrap();
        lists.put_list(outer, outer).unwrap();
        assert_eq!(lists.get_count(outer).unwrap(), 2);

        let d = descriptors.make().unwrap();
        descriptors.put_list(d, fourcc(b"Itms"), outer, &lists).unwrap();
        let back = descriptors.get_list(d, fourcc(b"Itms"), &mut lists).unwrap();
        let first = lists.get_list(back, 0).unwrap();
        assert!(!lists.get_boolean(first, 0).unwrap());
    }

    #[test]
    fn test_integer_array_reads_as_list() {
        let mut lists = ListSuite::new();
        let mut descriptors = DescriptorSuite::default();
        let d = descriptors.make().unwrap();
        descriptors.put_integers(d, fourcc(b"Pnts"), &[1, 2]).unwrap();
        let list = descriptors.get_list(d, fourcc(b"Pnts"), &mut lists).unwrap();
        assert_eq!(lists.get_count(list).unwrap(), 2);
        assert_eq!(lists.get_integer(list, 1).unwrap(), 2);
    }
}
