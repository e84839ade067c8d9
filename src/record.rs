//! Per-frame records.
//!
//! A [`FrameRecord`] is an insertion-ordered mapping from column name to
//! [`FieldValue`]. The column set is whatever the probe reported for that
//! frame plus anything injected later (`filename`, `frame_no`, callback
//! columns), so it can differ from one frame to the next.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Columns contributed by a frame callback, in the order they should appear.
pub type Fields = Vec<(String, FieldValue)>;

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Missing value, stored as SQL `NULL`.
    Null,
    /// Signed integer.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// Free text, as parsed from probe output.
    Text(String),
}

impl FieldValue {
    /// `true` for [`FieldValue::Null`] and empty text.
    ///
    /// Blank values carry no type information and are skipped during
    /// column type inference.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Borrow the text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                FieldValue::Integer(i64::from(value))
            }
        })*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        i64::try_from(value)
            .map(FieldValue::Integer)
            .unwrap_or(FieldValue::Float(value as f64))
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(f64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Metadata for one decoded video frame.
///
/// # Example
///
/// ```
/// use video_to_sqlite::{FieldValue, FrameRecord};
///
/// let mut record = FrameRecord::new();
/// record.insert("pict_type", "I");
/// record.insert("frame_no", 0);
/// record.insert("pict_type", "P");
///
/// assert_eq!(record.len(), 2);
/// assert_eq!(record.get("pict_type"), Some(&FieldValue::from("P")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameRecord {
    columns: Vec<(String, FieldValue)>,
}

impl FrameRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a column's value.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Whether the record has a value for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a column, replacing any existing value in place.
    ///
    /// New columns are appended, so first-seen order is preserved.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == key) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((key, value)),
        }
    }

    /// Iterate over `(column, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Column names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Number of columns in the record.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> Extend<(K, V)> for FrameRecord {
    /// Merge columns; later keys overwrite earlier ones.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FrameRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = FrameRecord::new();
        record.extend(iter);
        record
    }
}
