//! Change tracking for packet fields.

use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};

/// Mutation marker owned by a packet.
///
/// Always compares equal, so deriving `PartialEq` on a packet compares only
/// its wire fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirtyFlag(bool);

impl DirtyFlag {
    pub fn dirty() -> Self {
        Self(true)
    }

    pub fn clean() -> Self {
        Self(false)
    }

    pub fn is_set(self) -> bool {
        self.0
    }

    pub fn mark(&mut self) {
        self.0 = true;
    }

    pub fn clear(&mut self) {
        self.0 = false;
    }
}

impl PartialEq for DirtyFlag {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Fixed-length sequence that records whether any slot was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedArray<T> {
    items: Box<[T]>,
    #[serde(skip)]
    dirty: bool,
}

impl<T: Clone + Default> TrackedArray<T> {
    /// `len` default slots, initially clean.
    pub fn new(len: usize) -> Self {
        Self {
            items: vec![T::default(); len].into_boxed_slice(),
            dirty: false,
        }
    }
}

impl<T> TrackedArray<T> {
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: items.into_boxed_slice(),
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Replaces slot `index`, returning the previous value.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(CodecError::SlotOutOfRange { index, len })?;
        self.dirty = true;
        Ok(std::mem::replace(slot, value))
    }

    /// Mutates slot `index` in place and marks the container dirty.
    pub fn update<F>(&mut self, index: usize, f: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(CodecError::SlotOutOfRange { index, len })?;
        f(slot);
        self.dirty = true;
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clean(&mut self) {
        self.dirty = false;
    }
}

impl<T: PartialEq> PartialEq for TrackedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<'a, T> IntoIterator for &'a TrackedArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_flag() {
        let mut flag = DirtyFlag::clean();
        assert!(!flag.is_set());
        flag.mark();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
        assert_eq!(DirtyFlag::dirty(), DirtyFlag::clean());
    }

    #[test]
    fn test_set_marks_dirty() {
        let mut slots: TrackedArray<u16> = TrackedArray::new(5);
        assert_eq!(slots.len(), 5);
        assert!(!slots.is_dirty());

        let previous = slots.set(2, 44).unwrap();
        assert_eq!(previous, 0);
        assert!(slots.is_dirty());
        assert_eq!(slots.get(2), Some(&44));
        assert_eq!(slots.len(), 5);
    }

    #[test]
    fn test_clean_keeps_elements() {
        let mut slots = TrackedArray::from_vec(vec![1u8, 2, 3]);
        slots.update(0, |value| *value += 10).unwrap();
        assert!(slots.is_dirty());

        slots.clean();
        assert!(!slots.is_dirty());
        assert_eq!(slots.as_slice(), &[11, 2, 3]);
    }

    #[test]
    fn test_out_of_range() {
        let mut slots: TrackedArray<i32> = TrackedArray::new(2);
        assert!(matches!(
            slots.set(2, 1),
            Err(CodecError::SlotOutOfRange { index: 2, len: 2 })
        ));
        assert!(slots.update(9, |_| {}).is_err());
        assert!(!slots.is_dirty());
        assert_eq!(slots.get(5), None);
    }

    #[test]
    fn test_equality_ignores_dirty_state() {
        let mut a: TrackedArray<u8> = TrackedArray::new(3);
        let b: TrackedArray<u8> = TrackedArray::new(3);
        a.set(1, 0).unwrap();
        assert!(a.is_dirty());
        assert_eq!(a, b);
    }
}
