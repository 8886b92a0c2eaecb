use anyhow::{anyhow, Context, Result};
use std::{collections::HashMap, fs::File, io::Write, path::Path};

/// One report row, keyed by column name. Columns left out are written as empty cells.
pub type Row = HashMap<&'static str, String>;

/// Destination for report rows.
pub trait RowSink {
    fn write_row(&mut self, row: &Row) -> Result<()>;
}

impl RowSink for Vec<Row> {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        self.push(row.clone());
        Ok(())
    }
}

/// Writes rows as CSV under a fixed header.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    columns: &'static [&'static str],
}

impl CsvSink<File> {
    /// Create (or truncate) the file at `path` and write the header row to it.
    pub fn create(path: impl AsRef<Path>, columns: &'static [&'static str]) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Self::new(file, columns)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, columns: &'static [&'static str]) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(columns)?;
        Ok(Self { writer, columns })
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|error| anyhow!("failed to flush csv output: {}", error.error()))
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        if let Some(column) = row.keys().find(|column| !self.columns.contains(*column)) {
            return Err(anyhow!("row has a column not in the header: {}", column));
        }
        self.writer
            .write_record(self.columns.iter().map(|column| row.get(column).map(String::as_str).unwrap_or("")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;
    use std::fs;

    const COLUMNS: &[&str] = &["project_id", "resource_id", "size"];

    #[test]
    fn test_header_and_rows() {
        let mut sink = CsvSink::new(Vec::new(), COLUMNS).unwrap();
        sink.write_row(&hashmap! {
            "project_id" => String::from("p1"),
            "resource_id" => String::from("r1"),
            "size" => String::from("20"),
        })
        .unwrap();
        sink.write_row(&hashmap! {
            "resource_id" => String::from("r2"),
        })
        .unwrap();
        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(output, "project_id,resource_id,size\np1,r1,20\n,r2,\n");
    }

    #[test]
    fn test_cells_are_quoted() {
        let mut sink = CsvSink::new(Vec::new(), COLUMNS).unwrap();
        sink.write_row(&hashmap! { "project_id" => String::from("10.0.0.1,10.0.0.2") }).unwrap();
        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(output, "project_id,resource_id,size\n\"10.0.0.1,10.0.0.2\",,\n");
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut sink = CsvSink::new(Vec::new(), COLUMNS).unwrap();
        let error = sink.write_row(&hashmap! { "flavor" => String::from("m1.tiny") }).unwrap_err();
        assert!(error.to_string().contains("flavor"));
        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(output, "project_id,resource_id,size\n");
    }

    #[test]
    fn test_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        {
            let mut sink = CsvSink::create(&path, COLUMNS).unwrap();
            sink.write_row(&hashmap! { "size" => String::from("1") }).unwrap();
            sink.flush().unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "project_id,resource_id,size\n,,1\n");
    }
}
