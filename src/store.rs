//! SQLite destination store.
//!
//! [`Store`] owns the database connection for one ingestion run and writes
//! the two linked tables:
//!
//! - a videos table keyed on `filename`, with a fixed set of columns;
//! - a frames table keyed on `(frame_no, filename)`, whose columns are the
//!   union of every frame record's keys, with `filename` referencing the
//!   videos table.
//!
//! Writes are upserts that replace whole rows. Tables are created on first
//! use and only ever widened: missing columns are added, and column types
//! are rebuilt to a wider type when new data no longer fits.

use std::path::Path;

use rusqlite::{
    Connection, params_from_iter,
    types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef},
};

use crate::align::FRAME_NO;
use crate::error::Result;
use crate::metadata::VideoRecord;
use crate::record::{FieldValue, FrameRecord};
use crate::schema::{ColumnType, TypeTracker};

const FILENAME: &str = "filename";

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Integer(value) => ToSqlOutput::Owned(Value::Integer(*value)),
            FieldValue::Float(value) => ToSqlOutput::Owned(Value::Real(*value)),
            FieldValue::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

impl FromSql for FieldValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => FieldValue::Null,
            ValueRef::Integer(number) => FieldValue::Integer(number),
            ValueRef::Real(number) => FieldValue::Float(number),
            ValueRef::Text(text) | ValueRef::Blob(text) => {
                FieldValue::Text(String::from_utf8_lossy(text).into_owned())
            }
        })
    }
}

/// Column layout of a table being created, widened, or rebuilt.
struct TableSpec<'a> {
    name: &'a str,
    columns: Vec<(String, ColumnType)>,
    primary_key: &'a [&'a str],
    /// `(column, parent table, parent column)`.
    foreign_key: Option<(&'a str, &'a str, &'a str)>,
}

impl TableSpec<'_> {
    fn create_sql(&self, name: &str) -> String {
        let mut definitions: Vec<String> = self
            .columns
            .iter()
            .map(|(column, column_type)| format!("{} {}", quote(column), column_type.sql_name()))
            .collect();
        definitions.push(format!(
            "PRIMARY KEY ({})",
            quote_list(self.primary_key.iter().copied())
        ));
        if let Some((column, parent, parent_column)) = self.foreign_key {
            definitions.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                quote(column),
                quote(parent),
                quote(parent_column)
            ));
        }
        format!("CREATE TABLE {} ({})", quote(name), definitions.join(", "))
    }
}

/// Handle on the destination database.
///
/// # Example
///
/// ```no_run
/// use video_to_sqlite::{FrameRecord, Store};
///
/// # fn run(video: video_to_sqlite::VideoRecord, frames: Vec<FrameRecord>) -> video_to_sqlite::Result<()> {
/// let mut store = Store::open("videos.db")?;
/// let rows = store.write("videos", "frames", &video, &frames)?;
/// println!("wrote {rows} frames");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Store {
    connection: Connection,
}

impl Store {
    /// Open (or create) the database at `path` with foreign keys enforced.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Storage`](crate::IngestError::Storage) if the
    /// file cannot be opened as a SQLite database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::debug!("Opening store {}", path.as_ref().display());
        Self::from_connection(Connection::open(path)?)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        connection.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { connection })
    }

    /// The underlying connection, for queries outside the ingestion path.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Upsert the video row and all frame rows in a single transaction.
    ///
    /// Either both tables are updated or neither is. Returns the number of
    /// frame rows written.
    pub fn write(
        &mut self,
        videos_table: &str,
        frames_table: &str,
        video: &VideoRecord,
        frames: &[FrameRecord],
    ) -> Result<usize> {
        let transaction = self.connection.transaction()?;
        upsert_video(&transaction, videos_table, video)?;
        let rows = upsert_frames(&transaction, frames_table, videos_table, frames)?;
        transaction.commit()?;
        Ok(rows)
    }

    /// Upsert the video row on its own.
    pub fn upsert_video(&self, table: &str, video: &VideoRecord) -> Result<()> {
        upsert_video(&self.connection, table, video)
    }

    /// Upsert frame rows on their own. See [`Store::write`].
    pub fn upsert_frames(
        &self,
        table: &str,
        videos_table: &str,
        frames: &[FrameRecord],
    ) -> Result<usize> {
        upsert_frames(&self.connection, table, videos_table, frames)
    }

    /// Columns of `table` with their declared types, in table order.
    ///
    /// Empty if the table does not exist.
    pub fn columns(&self, table: &str) -> Result<Vec<(String, ColumnType)>> {
        table_columns(&self.connection, table)
    }
}

fn upsert_video(connection: &Connection, table: &str, video: &VideoRecord) -> Result<()> {
    let text = |value: &str| (ColumnType::Text, FieldValue::from(value));
    let values: Vec<(&str, (ColumnType, FieldValue))> = vec![
        (FILENAME, text(&video.filename)),
        ("duration", text(&video.duration)),
        ("bitrate", text(&video.bitrate)),
        ("codec", text(&video.codec)),
        ("pixel_format", text(&video.pixel_format)),
        ("resolution", text(&video.resolution)),
        ("framerate", (ColumnType::Float, video.frames_per_second()?.into())),
    ];

    let spec = TableSpec {
        name: table,
        columns: values
            .iter()
            .map(|(column, (column_type, _))| (column.to_string(), *column_type))
            .collect(),
        primary_key: &[FILENAME],
        foreign_key: None,
    };
    let columns = ensure_table(connection, &spec)?;

    let row: Vec<FieldValue> = columns
        .iter()
        .map(|(column, _)| {
            values
                .iter()
                .find(|(name, _)| column.eq_ignore_ascii_case(name))
                .map_or(FieldValue::Null, |(_, (_, value))| value.clone())
        })
        .collect();
    connection
        .prepare(&upsert_sql(table, &columns, spec.primary_key))?
        .execute(params_from_iter(row.iter()))?;

    log::debug!("Upserted {} into {table}", video.filename);
    Ok(())
}

fn upsert_frames(
    connection: &Connection,
    table: &str,
    videos_table: &str,
    frames: &[FrameRecord],
) -> Result<usize> {
    if frames.is_empty() {
        log::debug!("No frames to write to {table}");
        return Ok(0);
    }

    let tracker = TypeTracker::track(frames);
    // Types implied by this batch; `None` where every value was blank.
    let mut observed: Vec<(String, Option<ColumnType>)> = tracker
        .observed()
        .map(|(column, observed)| {
            let observed = if column.eq_ignore_ascii_case(FILENAME) {
                // The foreign key always holds text, whatever the file is called.
                Some(ColumnType::Text)
            } else if column.eq_ignore_ascii_case(FRAME_NO) {
                observed.or(Some(ColumnType::Integer))
            } else {
                observed
            };
            (column.to_string(), observed)
        })
        .collect();
    if tracker.get(FRAME_NO).is_none() {
        observed.push((FRAME_NO.to_string(), Some(ColumnType::Integer)));
    }
    if tracker.get(FILENAME).is_none() {
        observed.push((FILENAME.to_string(), Some(ColumnType::Text)));
    }

    let spec = TableSpec {
        name: table,
        // Columns created without any typed value start out as text.
        columns: observed
            .iter()
            .map(|(column, observed)| (column.clone(), observed.unwrap_or(ColumnType::Text)))
            .collect(),
        primary_key: &[FRAME_NO, FILENAME],
        foreign_key: Some((FILENAME, videos_table, FILENAME)),
    };
    let declared = ensure_table(connection, &spec)?;

    // Declared types widened by the values this batch actually carries.
    // All-blank columns leave an existing type alone.
    let target: Vec<(String, ColumnType)> = declared
        .iter()
        .map(|(column, declared_type)| {
            let needed = observed
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .and_then(|(_, observed)| *observed)
                .map_or(*declared_type, |observed| declared_type.widen(observed));
            (column.clone(), needed)
        })
        .collect();

    let mut statement = connection.prepare(&upsert_sql(table, &declared, spec.primary_key))?;
    for (index, record) in frames.iter().enumerate() {
        let row: Vec<FieldValue> = target
            .iter()
            .map(|(column, column_type)| match lookup(record, column) {
                Some(value) => column_type.coerce(value),
                None if column.eq_ignore_ascii_case(FRAME_NO) => FieldValue::from(index),
                None => FieldValue::Null,
            })
            .collect();
        statement.execute(params_from_iter(row.iter()))?;
    }
    drop(statement);

    if target != declared {
        transform(connection, &TableSpec { columns: target, ..spec })?;
    }

    log::debug!("Upserted {} rows into {table}", frames.len());
    Ok(frames.len())
}

/// Create `spec.name` if missing, otherwise add any columns it lacks.
///
/// Returns the table's columns afterwards, in table order.
fn ensure_table(connection: &Connection, spec: &TableSpec<'_>) -> Result<Vec<(String, ColumnType)>> {
    let existing = table_columns(connection, spec.name)?;
    if existing.is_empty() {
        log::debug!("Creating table {}", spec.name);
        connection.execute(&spec.create_sql(spec.name), [])?;
        return Ok(spec.columns.clone());
    }

    let mut columns = existing;
    for (column, column_type) in &spec.columns {
        if columns.iter().any(|(name, _)| name.eq_ignore_ascii_case(column)) {
            continue;
        }
        log::debug!("Adding column {column} {} to {}", column_type.sql_name(), spec.name);
        connection.execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                quote(spec.name),
                quote(column),
                column_type.sql_name()
            ),
            [],
        )?;
        columns.push((column.clone(), *column_type));
    }
    Ok(columns)
}

/// Rebuild `spec.name` with the column types in `spec`, converting the
/// stored data through SQLite's column affinity.
fn transform(connection: &Connection, spec: &TableSpec<'_>) -> Result<()> {
    log::debug!("Transforming column types of {}", spec.name);

    let staging = staging_name(connection, spec.name)?;
    let column_list = quote_list(spec.columns.iter().map(|(column, _)| column.as_str()));
    connection.execute_batch(&format!(
        "{create};
         INSERT INTO {staging} ({columns}) SELECT {columns} FROM {table};
         DROP TABLE {table};
         ALTER TABLE {staging} RENAME TO {table};",
        create = spec.create_sql(&staging),
        staging = quote(&staging),
        columns = column_list,
        table = quote(spec.name),
    ))?;
    Ok(())
}

/// A name derived from `table` that no schema object uses yet.
fn staging_name(connection: &Connection, table: &str) -> Result<String> {
    let mut candidate = format!("{table}_new");
    let mut attempt = 1;
    while name_in_use(connection, &candidate)? {
        attempt += 1;
        candidate = format!("{table}_new_{attempt}");
    }
    Ok(candidate)
}

fn name_in_use(connection: &Connection, name: &str) -> Result<bool> {
    let in_use = connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = ?1 COLLATE NOCASE)",
        [name],
        |row| row.get(0),
    )?;
    Ok(in_use)
}

/// Value of `column` in `record`, matching names as SQLite does.
///
/// If the record spells the column more than one way, the last one wins.
fn lookup<'a>(record: &'a FrameRecord, column: &str) -> Option<&'a FieldValue> {
    record
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(column))
        .map(|(_, value)| value)
        .last()
}

fn table_columns(connection: &Connection, table: &str) -> Result<Vec<(String, ColumnType)>> {
    let mut statement = connection.prepare(&format!("PRAGMA table_info({})", quote(table)))?;
    let columns = statement
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let declared: String = row.get(2)?;
            Ok((name, ColumnType::from_declared(&declared)))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// `INSERT ... ON CONFLICT DO UPDATE` replacing every non-key column.
fn upsert_sql(table: &str, columns: &[(String, ColumnType)], key: &[&str]) -> String {
    let names: Vec<&str> = columns.iter().map(|(column, _)| column.as_str()).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|index| format!("?{index}")).collect();
    let updates: Vec<String> = names
        .iter()
        .filter(|name| !key.iter().any(|key| key.eq_ignore_ascii_case(name)))
        .map(|name| format!("{0} = excluded.{0}", quote(name)))
        .collect();
    let action = if updates.is_empty() {
        "NOTHING".to_string()
    } else {
        format!("UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO {}",
        quote(table),
        quote_list(names.iter().copied()),
        placeholders.join(", "),
        quote_list(key.iter().copied()),
        action
    )
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn quote_list<'a>(identifiers: impl IntoIterator<Item = &'a str>) -> String {
    identifiers.into_iter().map(quote).collect::<Vec<_>>().join(", ")
}
