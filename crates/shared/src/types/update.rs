//! Field update sets for partial updates.

/// One field of a partial update.
///
/// `Option<T>` cannot tell "leave alone" from "clear", so nullable columns use
/// `FieldUpdate<Option<T>>` and clear with `SetTo(None)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    /// Keep the stored value.
    #[default]
    Unchanged,
    /// Replace the stored value.
    SetTo(T),
}

impl<T> FieldUpdate<T> {
    /// Returns true if the field is being replaced.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::SetTo(_))
    }

    /// Returns the new value, or `current` when unchanged.
    #[must_use]
    pub fn apply(self, current: T) -> T {
        match self {
            Self::Unchanged => current,
            Self::SetTo(value) => value,
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    /// Maps a JSON-style "present or absent" field onto an update.
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unchanged, Self::SetTo)
    }
}
