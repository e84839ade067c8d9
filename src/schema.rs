//! Column type inference for heterogeneous frame records.
//!
//! Frame values arrive as text from the probe or as typed values from a
//! callback, and the set of columns varies between records. [`TypeTracker`]
//! walks every record, takes the union of all column names in first-seen
//! order, and settles each column on the narrowest [`ColumnType`] that fits
//! all of its non-blank values.

use crate::record::{FieldValue, FrameRecord};

/// Storage type of a column, ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnType {
    /// `INTEGER`: whole numbers.
    Integer,
    /// `FLOAT`: any number.
    Float,
    /// `TEXT`: anything.
    Text,
}

impl ColumnType {
    /// SQL type name used in table definitions.
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "FLOAT",
            ColumnType::Text => "TEXT",
        }
    }

    /// Interpret a declared SQL column type using SQLite's affinity rules.
    pub fn from_declared(declared: &str) -> Self {
        let declared = declared.to_ascii_uppercase();
        if declared.contains("INT") {
            ColumnType::Integer
        } else if ["REAL", "FLOA", "DOUB"].iter().any(|name| declared.contains(name)) {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    }

    /// The narrowest type able to hold values of both `self` and `other`.
    pub fn widen(self, other: ColumnType) -> ColumnType {
        self.max(other)
    }

    /// Narrowest type for a single value, or `None` if it is blank.
    pub fn of(value: &FieldValue) -> Option<ColumnType> {
        match value {
            _ if value.is_blank() => None,
            FieldValue::Null => None,
            FieldValue::Integer(_) => Some(ColumnType::Integer),
            FieldValue::Float(_) => Some(ColumnType::Float),
            FieldValue::Text(text) => {
                let text = text.trim();
                if text.parse::<i64>().is_ok() {
                    Some(ColumnType::Integer)
                } else if text.parse::<f64>().is_ok() {
                    Some(ColumnType::Float)
                } else {
                    Some(ColumnType::Text)
                }
            }
        }
    }

    /// Convert `value` to this column's representation.
    ///
    /// Blank values become [`FieldValue::Null`] in numeric columns. Values
    /// that do not fit are passed through unchanged.
    pub fn coerce(self, value: &FieldValue) -> FieldValue {
        match (self, value) {
            (_, FieldValue::Null) => FieldValue::Null,
            (ColumnType::Integer | ColumnType::Float, FieldValue::Text(text)) if text.trim().is_empty() => {
                FieldValue::Null
            }
            (ColumnType::Integer, FieldValue::Text(text)) => text
                .trim()
                .parse()
                .map(FieldValue::Integer)
                .unwrap_or_else(|_| value.clone()),
            (ColumnType::Float, FieldValue::Text(text)) => text
                .trim()
                .parse()
                .map(FieldValue::Float)
                .unwrap_or_else(|_| value.clone()),
            (ColumnType::Float, FieldValue::Integer(number)) => FieldValue::Float(*number as f64),
            (ColumnType::Text, FieldValue::Integer(_) | FieldValue::Float(_)) => {
                FieldValue::Text(value.to_string())
            }
            _ => value.clone(),
        }
    }
}

/// Infers one [`ColumnType`] per column across a set of records.
///
/// # Example
///
/// ```
/// use video_to_sqlite::{ColumnType, FrameRecord, TypeTracker};
///
/// let first: FrameRecord = [("width", "1920"), ("pict_type", "I")].into_iter().collect();
/// let second: FrameRecord = [("width", "1920"), ("max", "5.5")].into_iter().collect();
///
/// let tracker = TypeTracker::track([&first, &second]);
/// assert_eq!(tracker.get("width"), Some(ColumnType::Integer));
/// assert_eq!(tracker.get("pict_type"), Some(ColumnType::Text));
/// assert_eq!(tracker.get("max"), Some(ColumnType::Float));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeTracker {
    /// `None` until a non-blank value has been seen.
    columns: Vec<(String, Option<ColumnType>)>,
}

impl TypeTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tracker that has observed every record in `records`.
    pub fn track<'a>(records: impl IntoIterator<Item = &'a FrameRecord>) -> Self {
        let mut tracker = Self::new();
        for record in records {
            tracker.observe(record);
        }
        tracker
    }

    /// Fold one record's columns into the inferred types.
    pub fn observe(&mut self, record: &FrameRecord) {
        for (name, value) in record.iter() {
            let seen = ColumnType::of(value);
            match self
                .columns
                .iter_mut()
                .find(|(column, _)| column.eq_ignore_ascii_case(name))
            {
                Some((_, inferred)) => {
                    if let Some(seen) = seen {
                        *inferred = Some(inferred.map_or(seen, |current| current.widen(seen)));
                    }
                }
                None => self.columns.push((name.to_string(), seen)),
            }
        }
    }

    /// Inferred type of `column`, if it was ever observed.
    ///
    /// Column names match case-insensitively, as in SQLite. Columns with
    /// only blank values are [`ColumnType::Text`].
    pub fn get(&self, column: &str) -> Option<ColumnType> {
        self.observed_type(column)
            .map(|inferred| inferred.unwrap_or(ColumnType::Text))
    }

    /// Type implied by the non-blank values of `column`.
    ///
    /// The outer `None` means the column was never seen; the inner `None`
    /// means every value was blank.
    pub fn observed_type(&self, column: &str) -> Option<Option<ColumnType>> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, inferred)| *inferred)
    }

    /// All observed columns with their inferred types, in first-seen order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.observed()
            .map(|(name, inferred)| (name, inferred.unwrap_or(ColumnType::Text)))
    }

    /// All observed columns, `None` where every value was blank.
    pub fn observed(&self) -> impl Iterator<Item = (&str, Option<ColumnType>)> {
        self.columns.iter().map(|(name, inferred)| (name.as_str(), *inferred))
    }

    /// Number of distinct columns seen.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether no column has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_is_monotonic() {
        assert_eq!(ColumnType::Integer.widen(ColumnType::Float), ColumnType::Float);
        assert_eq!(ColumnType::Text.widen(ColumnType::Integer), ColumnType::Text);
        assert_eq!(ColumnType::Float.widen(ColumnType::Float), ColumnType::Float);
    }

    #[test]
    fn blank_values_do_not_narrow_or_widen() {
        let first: FrameRecord = [("max", FieldValue::Integer(5))].into_iter().collect();
        let second: FrameRecord = [("max", FieldValue::from(""))].into_iter().collect();
        let third: FrameRecord = [("only_blank", FieldValue::Null)].into_iter().collect();

        let tracker = TypeTracker::track([&first, &second, &third]);
        assert_eq!(tracker.get("max"), Some(ColumnType::Integer));
        assert_eq!(tracker.get("only_blank"), Some(ColumnType::Text));
        assert_eq!(tracker.get("never_seen"), None);
        assert_eq!(tracker.observed_type("only_blank"), Some(None));
        assert_eq!(tracker.observed_type("max"), Some(Some(ColumnType::Integer)));
    }

    #[test]
    fn column_names_match_case_insensitively() {
        let first: FrameRecord = [("max", "5")].into_iter().collect();
        let second: FrameRecord = [("MAX", "5.5")].into_iter().collect();

        let tracker = TypeTracker::track([&first, &second]);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get("Max"), Some(ColumnType::Float));
        assert_eq!(tracker.columns().next(), Some(("max", ColumnType::Float)));
    }

    #[test]
    fn declared_types_follow_affinity() {
        assert_eq!(ColumnType::from_declared("BIGINT"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("float"), ColumnType::Float);
        assert_eq!(ColumnType::from_declared("REAL"), ColumnType::Float);
        assert_eq!(ColumnType::from_declared(""), ColumnType::Text);
    }

    #[test]
    fn coerce_text_to_numbers() {
        assert_eq!(ColumnType::Integer.coerce(&"42".into()), FieldValue::Integer(42));
        assert_eq!(ColumnType::Float.coerce(&"0.5".into()), FieldValue::Float(0.5));
        assert_eq!(ColumnType::Float.coerce(&FieldValue::Integer(2)), FieldValue::Float(2.0));
        assert_eq!(ColumnType::Integer.coerce(&"".into()), FieldValue::Null);
        assert_eq!(ColumnType::Text.coerce(&FieldValue::Integer(7)), FieldValue::from("7"));
    }
}
