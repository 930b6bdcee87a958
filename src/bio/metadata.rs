/// Tab-delimited metadata tables with a header row.
use crate::utils::io::{create_writer, finish_table, open_reader};
use crate::{GistError, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::HashSet;
use std::path::Path;

fn tsv_reader(path: &Path) -> Result<csv::Reader<Box<dyn std::io::BufRead>>> {
    Ok(ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(open_reader(path)?))
}

fn column_index(headers: &StringRecord, column: &str, path: &Path) -> Result<usize> {
    headers.iter().position(|h| h == column).ok_or_else(|| {
        GistError::Parse(format!("Column '{}' not found in {}", column, path.display()))
    })
}

/// A metadata table held in memory.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl MetadataTable {
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = tsv_reader(path)?;
        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<csv::Result<Vec<_>>>()?;
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Field value of `row` in column `name`, or `None` when the column is absent.
    pub fn value<'a>(&self, row: &'a StringRecord, name: &str) -> Option<&'a str> {
        self.column(name).and_then(|idx| row.get(idx))
    }

    /// Write the header plus the given rows.
    pub fn write_rows<'a, I>(&self, path: &Path, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a StringRecord>,
    {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(create_writer(path)?);
        writer.write_record(&self.headers)?;
        let mut written = 0;
        for row in rows {
            writer.write_record(row)?;
            written += 1;
        }
        finish_table(writer)?;
        Ok(written)
    }
}

/// Stream `input` into `output`, keeping rows whose `column` value is in
/// `ids`. A strain listed twice in the table is written once.
pub fn select_rows(
    input: &Path,
    output: &Path,
    column: &str,
    ids: &HashSet<String>,
) -> Result<usize> {
    let mut reader = tsv_reader(input)?;
    let headers = reader.headers()?.clone();
    let key = column_index(&headers, column, input)?;

    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(create_writer(output)?);
    writer.write_record(&headers)?;

    let mut seen = HashSet::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        let Some(strain) = record.get(key) else {
            continue;
        };
        if ids.contains(strain) && seen.insert(strain.to_string()) {
            writer.write_record(&record)?;
        }
    }
    finish_table(writer)?;
    Ok(seen.len())
}
