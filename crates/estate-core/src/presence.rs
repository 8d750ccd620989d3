//! # Presence Rules
//!
//! Request fields are optional on the wire. A field counts as supplied only
//! if it is present *and* non-zero / non-empty: a `property_id` of `0`, an
//! `amount` of `0.0`, a `term_in_months` of `0`, or an empty address string
//! are all treated exactly like a missing field. Callers rely on this (a
//! zero term never reaches the installment division), so it is a rule, not
//! a validation shortcut.

use crate::identity::{Address, PropertyId};

/// Whether a value counts as supplied.
pub trait Presence {
    /// `false` for zero and empty values.
    fn is_present(&self) -> bool;

    /// Filter an optional field through the presence rule.
    fn supplied(value: Option<Self>) -> Option<Self>
    where
        Self: Sized,
    {
        value.filter(Presence::is_present)
    }
}

impl Presence for u32 {
    fn is_present(&self) -> bool {
        *self != 0
    }
}

impl Presence for u64 {
    fn is_present(&self) -> bool {
        *self != 0
    }
}

impl Presence for f64 {
    fn is_present(&self) -> bool {
        *self != 0.0
    }
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Presence for PropertyId {
    fn is_present(&self) -> bool {
        self.get() != 0
    }
}

impl Presence for Address {
    fn is_present(&self) -> bool {
        !self.as_str().is_empty()
    }
}

/// Convert an optional raw string into an address, applying the presence rule.
pub fn supplied_address(raw: Option<String>) -> Option<Address> {
    String::supplied(raw).and_then(|s| Address::new(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_counts_as_absent() {
        assert_eq!(u64::supplied(Some(0)), None);
        assert_eq!(u32::supplied(Some(0)), None);
        assert_eq!(f64::supplied(Some(0.0)), None);
        assert_eq!(PropertyId::supplied(Some(PropertyId::new(0))), None);
    }

    #[test]
    fn negative_zero_counts_as_absent() {
        assert_eq!(f64::supplied(Some(-0.0)), None);
    }

    #[test]
    fn non_zero_is_supplied() {
        assert_eq!(u64::supplied(Some(7)), Some(7));
        assert_eq!(f64::supplied(Some(-12.5)), Some(-12.5));
        assert_eq!(
            PropertyId::supplied(Some(PropertyId::new(3))),
            Some(PropertyId::new(3))
        );
    }

    #[test]
    fn none_stays_none() {
        assert_eq!(u64::supplied(None), None);
        assert_eq!(supplied_address(None), None);
    }

    #[test]
    fn empty_address_string_counts_as_absent() {
        assert_eq!(supplied_address(Some(String::new())), None);
        assert_eq!(
            supplied_address(Some("0xseller".into())).map(|a| a.to_string()),
            Some("0xseller".to_string())
        );
    }
}
