//! CSV export of the accumulated result table and script file loading.

use std::fs;
use std::path::Path;

use crate::db::batch::ResultTable;
use crate::error::Result;

/// Render the table as CSV text, header first.
pub fn to_csv(table: &ResultTable) -> String {
    let mut csv = String::new();

    let header_line: Vec<String> = table
        .columns
        .iter()
        .map(|h| escape_csv_field(h))
        .collect();
    csv.push_str(&header_line.join(","));
    csv.push('\n');

    for row in &table.rows {
        let row_line: Vec<String> = row.iter().map(|c| escape_csv_field(c)).collect();
        csv.push_str(&row_line.join(","));
        csv.push('\n');
    }

    csv
}

pub fn write_csv(path: &Path, table: &ResultTable) -> Result<()> {
    fs::write(path, to_csv(table))?;
    Ok(())
}

/// Escape a CSV field (add quotes if needed)
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Read a script file. Any readable text file is accepted; a suffix other
/// than `.sql` only earns a warning.
pub fn load_script(path: &Path) -> Result<String> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
        tracing::warn!(path = %path.display(), "script file does not end in .sql");
    }
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> ResultTable {
        ResultTable {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn plain_fields_stay_unquoted() {
        let csv = to_csv(&table(&["dbname", "id"], &[&["db1", "1"], &["db2", "2"]]));
        assert_eq!(csv, "dbname,id\ndb1,1\ndb2,2\n");
    }

    #[test]
    fn fields_with_separators_get_quoted() {
        let csv = to_csv(&table(&["name"], &[&["a,b"], &["line\nbreak"]]));
        assert_eq!(csv, "name\n\"a,b\"\n\"line\nbreak\"\n");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let csv = to_csv(&table(&["note"], &[&["say \"hi\""]]));
        assert_eq!(csv, "note\n\"say \"\"hi\"\"\"\n");
    }

    /// Minimal CSV reader understanding the quoting `to_csv` emits.
    fn parse_csv(text: &str) -> Vec<Vec<String>> {
        let mut records = Vec::new();
        let mut record = Vec::new();
        let mut field = String::new();
        let mut quoted = false;
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if quoted {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        quoted = false;
                    }
                } else {
                    field.push(c);
                }
            } else {
                match c {
                    '"' => quoted = true,
                    ',' => record.push(std::mem::take(&mut field)),
                    '\n' => {
                        record.push(std::mem::take(&mut field));
                        records.push(std::mem::take(&mut record));
                    }
                    _ => field.push(c),
                }
            }
        }
        records
    }

    #[test]
    fn export_round_trips_through_a_csv_reader() {
        let original = table(
            &["dbname", "note"],
            &[
                &["db1", "plain"],
                &["db2", "a,b"],
                &["db3", "say \"hi\""],
                &["db4", "line\nbreak"],
            ],
        );

        let parsed = parse_csv(&to_csv(&original));
        assert_eq!(parsed[0], original.columns);
        assert_eq!(&parsed[1..], original.rows.as_slice());
    }

    #[test]
    fn empty_table_exports_header_only() {
        let csv = to_csv(&table(&["dbname", "id"], &[]));
        assert_eq!(csv, "dbname,id\n");
    }

    #[test]
    fn write_csv_creates_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");
        write_csv(&path, &table(&["id"], &[&["1"]])).expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "id\n1\n");
    }

    #[test]
    fn load_script_reads_file_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("batch.sql");
        fs::write(&path, "SELECT 1\nGO\nSELECT 2").expect("write");
        assert_eq!(load_script(&path).expect("load"), "SELECT 1\nGO\nSELECT 2");
    }

    #[test]
    fn load_script_fails_on_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_script(&dir.path().join("missing.sql")).is_err());
    }
}
