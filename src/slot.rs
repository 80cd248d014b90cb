//! The unset sentinel shared by every configurable slot of a node.
//!
//! A node distinguishes "never configured" from "configured" for its reader, writer and
//! both parameter objects, and "never loaded" from "loaded" for its data. All five slots
//! use the same `Slot<T>` type so the check is uniform and never relies on `Option`
//! meaning two different things.

use std::fmt;

/// Either `Unset` or `Bound` to a value.
#[derive(Clone, PartialEq, Default)]
pub enum Slot<T> {
    /// Nothing has been bound.
    #[default]
    Unset,
    /// A value has been bound.
    Bound(T),
}

impl<T> Slot<T> {
    /// Creates a slot from an optional value.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Bound(v),
            None => Self::Unset,
        }
    }

    /// True if nothing was ever stored.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// True if a value is stored.
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }

    /// Stored value, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Bound(v) => Some(v),
            Self::Unset => None,
        }
    }

    /// Mutable access to the stored value.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Bound(v) => Some(v),
            Self::Unset => None,
        }
    }

    /// Binds `value`, returning whatever was bound before.
    pub fn replace(&mut self, value: T) -> Option<T> {
        match std::mem::replace(self, Self::Bound(value)) {
            Self::Bound(old) => Some(old),
            Self::Unset => None,
        }
    }

    /// Resets the slot, returning the previous value.
    pub fn take(&mut self) -> Option<T> {
        match std::mem::take(self) {
            Self::Bound(old) => Some(old),
            Self::Unset => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "<Unset>"),
            Self::Bound(v) => v.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unset() {
        let slot: Slot<u8> = Slot::default();
        assert!(slot.is_unset());
        assert_eq!(slot.get(), None);
        assert_eq!(format!("{slot:?}"), "<Unset>");
    }

    #[test]
    fn replace_returns_previous_value() {
        let mut slot = Slot::Unset;
        assert_eq!(slot.replace(1), None);
        assert_eq!(slot.replace(2), Some(1));
        assert_eq!(slot.take(), Some(2));
        assert!(slot.is_unset());
    }

    #[test]
    fn bound_empty_value_is_still_bound() {
        let slot = Slot::Bound(String::new());
        assert!(slot.is_bound());
        assert_eq!(slot.get().map(String::as_str), Some(""));
    }
}
