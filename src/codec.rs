//! Format Codec - delimited text <-> RowTable, RowTable -> identifier-keyed JSON.
//!
//! The text dialect is comma-delimited with a header row and `\n` line endings.
//! Fields are quoted only when they contain a delimiter, quote or newline, so
//! tables of plain values encode exactly as the legacy unquoted files did.

use csv::{ErrorKind, QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DataError, Result};
use crate::table::RowTable;

/// Uniqueness policy for the identifier column when projecting to JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// Later records silently replace earlier ones with the same identifier.
    #[default]
    Lenient,
    /// A repeated identifier fails with `DuplicateKey`.
    Strict,
}

/// Mapping from identifier value to the record's remaining columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonProjection(Map<String, Value>);

impl JsonProjection {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Map<String, Value>> {
        self.0.get(id).and_then(Value::as_object)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Parses a stored projection. Every entry must itself be an object.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| DataError::MalformedInput(format!("invalid JSON projection: {}", e)))?;
        let Value::Object(entries) = value else {
            return Err(DataError::MalformedInput(
                "JSON projection must be an object".to_string(),
            ));
        };
        if let Some((id, _)) = entries.iter().find(|(_, v)| !v.is_object()) {
            return Err(DataError::MalformedInput(format!(
                "entry '{}' is not an object",
                id
            )));
        }
        Ok(Self(entries))
    }
}

/// Parses header + data lines into a table.
///
/// Every data line must have exactly as many fields as the header. Blank lines,
/// including the trailing one left by a final newline, are skipped.
pub fn decode_table(raw_text: &str) -> Result<RowTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(raw_text.as_bytes());

    let columns = reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if columns.is_empty() || columns.iter().all(String::is_empty) {
        return Err(DataError::MalformedInput("missing header row".to_string()));
    }

    let mut table = RowTable::new(columns);
    for result in reader.records() {
        let record = result.map_err(malformed)?;
        let row = record.iter().map(str::to_string).collect::<Vec<_>>();
        table.push_row(row).map_err(|row| {
            DataError::MalformedInput(format!("record has {} fields", row.len()))
        })?;
    }
    Ok(table)
}

/// Header line then one line per record, each terminated by `\n`.
pub fn encode_table_csv(table: &RowTable) -> Result<String> {
    if table.columns().is_empty() {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(table.columns()).map_err(malformed)?;
    for record in table.rows() {
        writer.write_record(record.values()).map_err(malformed)?;
    }

    let bytes = writer.into_inner().map_err(|e| DataError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| DataError::MalformedInput(e.to_string()))
}

/// Re-indexes the table by `id_column`; the remaining columns become the entry.
pub fn project_to_json(table: &RowTable, id_column: &str, mode: KeyMode) -> Result<JsonProjection> {
    let id_index = table.column_index(id_column).ok_or_else(|| {
        DataError::MalformedInput(format!("missing identifier column '{}'", id_column))
    })?;

    let mut entries = Map::new();
    for record in table.rows() {
        let values = record.values();
        let key = values[id_index].clone();

        let mut fields = Map::new();
        for (column, value) in record.fields() {
            if column != id_column {
                fields.insert(column.to_string(), coerce_cell(value));
            }
        }

        if entries.insert(key.clone(), Value::Object(fields)).is_some() && mode == KeyMode::Strict {
            return Err(DataError::DuplicateKey {
                column: id_column.to_string(),
                key,
            });
        }
    }
    Ok(JsonProjection(entries))
}

/// Integers that survive a parse/print round trip become JSON numbers.
fn coerce_cell(value: &str) -> Value {
    match value.parse::<i64>() {
        Ok(n) if n.to_string() == value => Value::Number(n.into()),
        _ => Value::String(value.to_string()),
    }
}

fn malformed(err: csv::Error) -> DataError {
    let detail = match err.kind() {
        ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => format!(
            "line {}: expected {} fields, found {}",
            pos.as_ref().map(|p| p.line()).unwrap_or_default(),
            expected_len,
            len
        ),
        _ => err.to_string(),
    };
    DataError::MalformedInput(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> RowTable {
        let mut t = RowTable::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row.iter().map(|v| v.to_string()).collect()).unwrap();
        }
        t
    }

    #[test]
    fn test_decode_positional_zip() {
        let t = decode_table("flights_number,from_city,economy\nF123456,Leeds,300\nF654321,Oslo,900\n").unwrap();
        assert_eq!(t.columns(), ["flights_number", "from_city", "economy"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.record(1).unwrap().get("from_city"), Some("Oslo"));
    }

    #[test]
    fn test_decode_rejects_ragged_line() {
        let err = decode_table("a,b,c\n1,2,3\n4,5\n").unwrap_err();
        match err {
            DataError::MalformedInput(detail) => {
                assert!(detail.contains("expected 3 fields, found 2"), "{}", detail)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        assert!(matches!(decode_table(""), Err(DataError::MalformedInput(_))));
    }

    #[test]
    fn test_encode_plain_values_has_no_quotes_or_trailing_blank() {
        let t = table(&["bus_number", "to_city"], &[&["B000001", "York"], &["B000002", "Bath"]]);
        assert_eq!(
            encode_table_csv(&t).unwrap(),
            "bus_number,to_city\nB000001,York\nB000002,Bath\n"
        );
    }

    #[test]
    fn test_round_trip_preserves_table() {
        let t = table(
            &["train_number", "from_date", "economy"],
            &[&["T000010", "2024-03-01", "100"], &["T000011", "2021-12-31", ""]],
        );
        assert_eq!(decode_table(&encode_table_csv(&t).unwrap()).unwrap(), t);
    }

    #[test]
    fn test_embedded_comma_survives_round_trip() {
        let t = table(&["id", "city"], &[&["F000001", "Washington, D.C."]]);
        let raw = encode_table_csv(&t).unwrap();
        assert_eq!(raw, "id,city\nF000001,\"Washington, D.C.\"\n");
        assert_eq!(decode_table(&raw).unwrap(), t);
    }

    #[test]
    fn test_project_lenient_keeps_last_record() {
        let t = table(
            &["flights_number", "to_city", "economy"],
            &[&["F1", "Rome", "100"], &["F2", "Lima", "200"], &["F1", "Kyiv", "300"]],
        );
        let json = project_to_json(&t, "flights_number", KeyMode::Lenient).unwrap();
        assert_eq!(json.len(), 2);
        let f1 = json.get("F1").unwrap();
        assert_eq!(f1["to_city"], "Kyiv");
        assert_eq!(f1["economy"], 300);
        assert!(!f1.contains_key("flights_number"));
    }

    #[test]
    fn test_project_strict_rejects_duplicate() {
        let t = table(&["flights_number", "to_city"], &[&["F1", "Rome"], &["F1", "Kyiv"]]);
        let err = project_to_json(&t, "flights_number", KeyMode::Strict).unwrap_err();
        assert!(matches!(err, DataError::DuplicateKey { ref key, .. } if key == "F1"));
    }

    #[test]
    fn test_project_missing_id_column() {
        let t = table(&["to_city"], &[&["Rome"]]);
        assert!(matches!(
            project_to_json(&t, "bus_number", KeyMode::Lenient),
            Err(DataError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_coerce_only_canonical_integers() {
        assert_eq!(coerce_cell("2000"), Value::from(2000));
        assert_eq!(coerce_cell("007"), Value::from("007"));
        assert_eq!(coerce_cell("2024-01-02"), Value::from("2024-01-02"));
    }

    #[test]
    fn test_projection_json_round_trip_and_validation() {
        let t = table(&["bus_number", "to_city"], &[&["B1", "Cork"]]);
        let json = project_to_json(&t, "bus_number", KeyMode::Lenient).unwrap();
        let raw = json.to_json_string().unwrap();
        assert_eq!(raw, r#"{"B1":{"to_city":"Cork"}}"#);
        assert_eq!(JsonProjection::from_json_str(&raw).unwrap(), json);
        assert!(JsonProjection::from_json_str(r#"{"B1":3}"#).is_err());
        assert!(JsonProjection::from_json_str("[1,2]").is_err());
    }
}
