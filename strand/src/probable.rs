//! A value that may or may not be present.
//!
//! [`Probable`] is the result type of
//! [`Mailbox::try_dequeue`](crate::serializer::Mailbox::try_dequeue). It is
//! isomorphic to [`Option`] but carries a different equality contract: every
//! absent value equals every other absent value, whatever its payload type,
//! including the untyped [`NoValue`] marker.

use std::fmt;

/// A potential value: either `Present(value)` or `Absent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Probable<T> {
    /// A value is present.
    Present(T),
    /// No value.
    Absent,
}

/// The untyped absence of a value.
///
/// Compares equal to `Probable::<T>::Absent` for every `T`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoValue;

impl<T> Probable<T> {
    /// Wraps `value` as present.
    pub fn present(value: T) -> Self {
        Probable::Present(value)
    }

    /// Returns `true` if a value is present.
    pub fn has_value(&self) -> bool {
        matches!(self, Probable::Present(_))
    }

    /// Returns `true` if no value is present.
    pub fn is_absent(&self) -> bool {
        !self.has_value()
    }

    /// Projects into either `present(value)` or `absent()`.
    pub fn match_with<R>(self, present: impl FnOnce(T) -> R, absent: impl FnOnce() -> R) -> R {
        match self {
            Probable::Present(value) => present(value),
            Probable::Absent => absent(),
        }
    }

    /// Maps the contained value, keeping absence.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Probable<U> {
        match self {
            Probable::Present(value) => Probable::Present(f(value)),
            Probable::Absent => Probable::Absent,
        }
    }

    /// Borrows the contained value.
    pub fn as_ref(&self) -> Probable<&T> {
        match self {
            Probable::Present(value) => Probable::Present(value),
            Probable::Absent => Probable::Absent,
        }
    }

    /// Returns the contained value or `default`.
    pub fn unwrap_or(self, default: T) -> T {
        self.into_option().unwrap_or(default)
    }

    /// Returns `true` if both are absent or both hold equal values.
    ///
    /// Unlike `==`, the payload types may differ; two absent values are
    /// always the same absence.
    pub fn same_as<U>(&self, other: &Probable<U>) -> bool
    where
        T: PartialEq<U>,
    {
        match (self, other) {
            (Probable::Present(a), Probable::Present(b)) => a == b,
            (Probable::Absent, Probable::Absent) => true,
            _ => false,
        }
    }

    /// Converts into an [`Option`].
    pub fn into_option(self) -> Option<T> {
        self.into()
    }
}

impl<T> Default for Probable<T> {
    fn default() -> Self {
        Probable::Absent
    }
}

impl<T> From<NoValue> for Probable<T> {
    fn from(_: NoValue) -> Self {
        Probable::Absent
    }
}

impl<T> From<Option<T>> for Probable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Probable::Present(value),
            None => Probable::Absent,
        }
    }
}

impl<T> From<Probable<T>> for Option<T> {
    fn from(value: Probable<T>) -> Self {
        match value {
            Probable::Present(value) => Some(value),
            Probable::Absent => None,
        }
    }
}

impl<T> PartialEq<NoValue> for Probable<T> {
    fn eq(&self, _: &NoValue) -> bool {
        self.is_absent()
    }
}

impl<T> PartialEq<Probable<T>> for NoValue {
    fn eq(&self, other: &Probable<T>) -> bool {
        other.is_absent()
    }
}

impl<T: fmt::Display> fmt::Display for Probable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probable::Present(value) => write!(f, "Value: {value}"),
            Probable::Absent => f.write_str("No Value"),
        }
    }
}

impl fmt::Display for NoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("No Value")
    }
}
