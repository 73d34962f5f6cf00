use serde::{Deserialize, Serialize};

/// Three-state update for an optional field.
///
/// - `NoChange`: keep the existing value
/// - `Set(value)`: replace it
/// - `Clear`: set it to `None`
///
/// # Example
///
/// ```
/// use taskflow_domain::FieldUpdate;
///
/// let mut description = Some("draft".to_string());
/// FieldUpdate::Set("final".to_string()).apply_to(&mut description);
/// assert_eq!(description.as_deref(), Some("final"));
///
/// FieldUpdate::<String>::Clear.apply_to(&mut description);
/// assert_eq!(description, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldUpdate<T> {
    NoChange,
    Set(T),
    Clear,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::NoChange
    }
}

impl<T> FieldUpdate<T> {
    pub fn apply_to(self, field: &mut Option<T>) {
        match self {
            FieldUpdate::NoChange => {}
            FieldUpdate::Set(value) => *field = Some(value),
            FieldUpdate::Clear => *field = None,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, FieldUpdate::NoChange)
    }
}

impl<T: Clone> FieldUpdate<T> {
    /// The update that would restore `current` if this update were applied to it.
    pub fn inverse_of(&self, current: &Option<T>) -> FieldUpdate<T> {
        if !self.is_change() {
            return FieldUpdate::NoChange;
        }
        current.clone().into()
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    /// `Some(value)` becomes `Set(value)`, `None` becomes `Clear`.
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        }
    }
}
