//! In-process preparation and filtering.
//!
//! Evaluates the same typed requests the augur toolkit receives, over tables
//! held in memory. Intended for small inputs, dry runs and the test suite.
//! Subsampling is deterministic: within every group the lexically first
//! strains are kept.

use crate::bio::fasta::{open_fasta, write_fasta, write_record};
use crate::bio::metadata::MetadataTable;
use crate::bio::strains::{union_files, write_strains, StrainSet};
use crate::core::config::{ColumnConfig, SanitizeConfig};
use crate::tools::request::{FilterOutput, FilterRequest};
use crate::tools::traits::{FilterEngine, InputPreparer};
use crate::utils::io::{create_writer, finish_table, open_reader};
use crate::{GistError, Result};
use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// Columns written by `index_sequences`, matching `augur index`.
pub const INDEX_COLUMNS: [&str; 11] = [
    "strain",
    "length",
    "A",
    "C",
    "G",
    "T",
    "N",
    "other_IUPAC",
    "-",
    "?",
    "invalid_nucleotides",
];

const LOCATION_COLUMNS: [&str; 4] = ["region", "country", "division", "location"];

#[derive(Debug, Clone, Default)]
pub struct MemoryToolkit {
    columns: ColumnConfig,
    sanitize: SanitizeConfig,
}

impl MemoryToolkit {
    pub fn new(columns: &ColumnConfig, sanitize: &SanitizeConfig) -> Self {
        Self {
            columns: columns.clone(),
            sanitize: sanitize.clone(),
        }
    }

    fn strip_prefixes<'a>(&self, id: &'a str) -> &'a str {
        let mut id = id;
        for prefix in &self.sanitize.strip_prefixes {
            if let Some(rest) = id.strip_prefix(prefix.as_str()) {
                id = rest;
            }
        }
        id
    }

    /// Valid (A/C/G/T) length per strain, from the index when given and from
    /// the metadata length column otherwise.
    fn lengths(
        &self,
        table: &MetadataTable,
        strain_col: usize,
        index: Option<&Path>,
    ) -> Result<HashMap<String, u64>> {
        if let Some(index) = index {
            return read_index_lengths(index);
        }

        let Some(length_col) = table.column(&self.columns.length) else {
            return Err(GistError::InvalidRequest(format!(
                "minimum length needs a sequence index or a '{}' metadata column",
                self.columns.length
            )));
        };
        Ok(table
            .rows()
            .iter()
            .filter_map(|row| {
                let strain = row.get(strain_col)?;
                let length = row.get(length_col)?.trim().parse().ok()?;
                Some((strain.to_string(), length))
            })
            .collect())
    }

    fn eligible(
        &self,
        request: &FilterRequest,
        table: &MetadataTable,
        strain_col: usize,
    ) -> Result<Vec<(String, Option<NaiveDate>, usize)>> {
        let needs_date = request.exclude_ambiguous_dates
            || request.min_date.is_some()
            || request.max_date.is_some();
        let date_col = table.column(&self.columns.date);
        if needs_date && date_col.is_none() {
            return Err(GistError::Parse(format!(
                "Column '{}' not found in {}",
                self.columns.date,
                request.metadata.display()
            )));
        }

        let lengths = match request.min_length {
            Some(_) => Some(self.lengths(table, strain_col, request.sequence_index.as_deref())?),
            None => None,
        };

        let query_cols = match &request.query {
            Some(query) => query
                .conditions()
                .iter()
                .map(|c| {
                    table.column(c.column()).ok_or_else(|| {
                        GistError::Parse(format!(
                            "Query column '{}' not found in {}",
                            c.column(),
                            request.metadata.display()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let mut eligible = Vec::new();
        for (row_idx, row) in table.rows().iter().enumerate() {
            let Some(strain) = row.get(strain_col) else {
                continue;
            };

            if let Some(query) = &request.query {
                let all = query
                    .conditions()
                    .iter()
                    .zip(&query_cols)
                    .all(|(cond, &col)| cond.matches(row.get(col)));
                if !all {
                    continue;
                }
            }

            let date = date_col
                .and_then(|col| row.get(col))
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
            if needs_date {
                let Some(date) = date else {
                    continue;
                };
                if request.min_date.is_some_and(|min| date < min)
                    || request.max_date.is_some_and(|max| date > max)
                {
                    continue;
                }
            }

            if let (Some(min), Some(lengths)) = (request.min_length, &lengths) {
                if lengths.get(strain).copied().unwrap_or(0) < min as u64 {
                    continue;
                }
            }

            eligible.push((strain.to_string(), date, row_idx));
        }
        Ok(eligible)
    }

    fn group_key(
        &self,
        group_by: &[String],
        table: &MetadataTable,
        row: &StringRecord,
        date: Option<NaiveDate>,
    ) -> Vec<String> {
        group_by
            .iter()
            .map(|column| match (table.column(column), column.as_str()) {
                (Some(idx), _) => row.get(idx).unwrap_or_default().to_string(),
                (None, "year") => date.map(|d| d.year().to_string()).unwrap_or_default(),
                (None, "month") => date
                    .map(|d| format!("{}-{:02}", d.year(), d.month()))
                    .unwrap_or_default(),
                (None, _) => String::new(),
            })
            .collect()
    }
}

fn read_index_lengths(path: &Path) -> Result<HashMap<String, u64>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(open_reader(path)?);
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            GistError::Parse(format!("Column '{}' not found in {}", name, path.display()))
        })
    };
    let strain = position("strain")?;
    let bases = ["A", "C", "G", "T"]
        .iter()
        .map(|b| position(b))
        .collect::<Result<Vec<_>>>()?;

    let mut lengths = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let valid: u64 = bases
            .iter()
            .filter_map(|&idx| record.get(idx)?.parse::<u64>().ok())
            .sum();
        if let Some(id) = record.get(strain) {
            lengths.insert(id.to_string(), valid);
        }
    }
    Ok(lengths)
}

/// Keep at most `max` strains spread evenly over groups: the largest
/// per-group quota `k` with `sum(min(k, |group|)) <= max`, then one more
/// strain from each larger group, in group-key order, until `max` is spent.
pub fn sample_groups(groups: BTreeMap<Vec<String>, Vec<String>>, max: usize) -> StrainSet {
    let total: usize = groups.values().map(Vec::len).sum();
    if total <= max {
        return groups.into_values().flatten().collect();
    }

    let taken = |k: usize| groups.values().map(|g| g.len().min(k)).sum::<usize>();
    let (mut lo, mut hi) = (0usize, groups.values().map(Vec::len).max().unwrap_or(0));
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if taken(mid) <= max {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let quota = lo;
    let mut remaining = max - taken(quota);

    let mut selected = StrainSet::new();
    for members in groups.values() {
        let mut n = members.len().min(quota);
        if remaining > 0 && members.len() > quota {
            n += 1;
            remaining -= 1;
        }
        selected.extend(members.iter().take(n).cloned());
    }
    selected
}

impl FilterEngine for MemoryToolkit {
    fn name(&self) -> &str {
        "memory"
    }

    fn filter(&self, request: &FilterRequest) -> Result<()> {
        request.validate()?;

        let table = MetadataTable::read(&request.metadata)?;
        let strain_col = table.column(&self.columns.strain).ok_or_else(|| {
            GistError::Parse(format!(
                "Column '{}' not found in {}",
                self.columns.strain,
                request.metadata.display()
            ))
        })?;

        let excluded = union_files(&request.exclude)?;
        let included = union_files(&request.include)?;

        let mut selected = StrainSet::new();
        if !request.exclude_all {
            let eligible: Vec<_> = self
                .eligible(request, &table, strain_col)?
                .into_iter()
                .filter(|(strain, _, _)| !excluded.contains(strain))
                .collect();

            match request.max_sequences {
                Some(max) => {
                    let mut groups: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();
                    for (strain, date, row_idx) in eligible {
                        let key =
                            self.group_key(&request.group_by, &table, &table.rows()[row_idx], date);
                        groups.entry(key).or_default().push(strain);
                    }
                    for members in groups.values_mut() {
                        members.sort();
                        members.dedup();
                    }
                    debug!("{} groups before sampling", groups.len());
                    selected = sample_groups(groups, max);
                }
                None => selected.extend(eligible.into_iter().map(|(strain, _, _)| strain)),
            }
        }

        // Force-included strains bypass every filter but must exist.
        let known: HashSet<&str> = table
            .rows()
            .iter()
            .filter_map(|row| row.get(strain_col))
            .collect();
        selected.extend(
            included
                .into_iter()
                .filter(|s| known.contains(s.as_str()) && !excluded.contains(s)),
        );

        match &request.output {
            FilterOutput::Strains(path) => {
                write_strains(path, &selected)?;
            }
            FilterOutput::Records { metadata, sequences } => {
                let Some(store) = &request.sequences else {
                    return Err(GistError::InvalidRequest(
                        "record output needs a sequence store".to_string(),
                    ));
                };
                let mut written = HashSet::new();
                let rows = table.rows().iter().filter(|row| {
                    row.get(strain_col)
                        .is_some_and(|s| selected.contains(s) && written.insert(s.to_string()))
                });
                table.write_rows(metadata, rows)?;

                let mut kept = HashSet::new();
                let mut records = Vec::new();
                for record in open_fasta(store)? {
                    let record = record?;
                    if selected.contains(&record.id) && kept.insert(record.id.clone()) {
                        records.push(record);
                    }
                }
                write_fasta(sequences, &records)?;
            }
        }
        Ok(())
    }
}

impl InputPreparer for MemoryToolkit {
    fn sanitize_sequences(&self, raw: &Path, output: &Path) -> Result<()> {
        let mut writer = create_writer(output)?;
        let mut seen = HashSet::new();
        for record in open_fasta(raw)? {
            let mut record = record?;
            record.id = self.strip_prefixes(&record.id).to_string();
            if !seen.insert(record.id.clone()) {
                warn!("Dropping duplicate sequence {}", record.id);
                continue;
            }
            write_record(&mut writer, &record)?;
        }
        writer.finish()?;
        Ok(())
    }

    fn index_sequences(&self, sequences: &Path, output: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(create_writer(output)?);
        writer.write_record(INDEX_COLUMNS)?;

        for record in open_fasta(sequences)? {
            let record = record?;
            let mut counts = [0u64; 9];
            for base in &record.sequence {
                let slot = match base {
                    b'A' => 0,
                    b'C' => 1,
                    b'G' => 2,
                    b'T' => 3,
                    b'N' => 4,
                    b'R' | b'Y' | b'S' | b'W' | b'K' | b'M' | b'B' | b'D' | b'H' | b'V' => 5,
                    b'-' => 6,
                    b'?' => 7,
                    _ => 8,
                };
                counts[slot] += 1;
            }
            let mut row = vec![record.id.clone(), record.len().to_string()];
            row.extend(counts.iter().map(|c| c.to_string()));
            writer.write_record(&row)?;
        }
        finish_table(writer)?;
        Ok(())
    }

    fn sanitize_metadata(&self, raw: &Path, output: &Path) -> Result<()> {
        let table = MetadataTable::read(raw)?;

        let renames: HashMap<&str, &str> = self
            .sanitize
            .rename_fields
            .iter()
            .filter_map(|r| r.split_once('='))
            .collect();
        let mut headers: Vec<String> = table
            .headers()
            .iter()
            .map(|h| renames.get(h).copied().unwrap_or(h).to_string())
            .collect();

        let id_col = self
            .sanitize
            .metadata_id_columns
            .iter()
            .find_map(|c| headers.iter().position(|h| h == c))
            .ok_or_else(|| {
                GistError::Parse(format!(
                    "None of the id columns {:?} found in {}",
                    self.sanitize.metadata_id_columns,
                    raw.display()
                ))
            })?;
        headers[id_col] = self.columns.strain.clone();

        let location_col = table.column(&self.sanitize.location_field);
        let mut location_targets = Vec::new();
        if location_col.is_some() {
            for name in LOCATION_COLUMNS {
                match headers.iter().position(|h| h == name) {
                    Some(idx) => location_targets.push(idx),
                    None => {
                        headers.push(name.to_string());
                        location_targets.push(headers.len() - 1);
                    }
                }
            }
        }

        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(create_writer(output)?);
        writer.write_record(&headers)?;

        let mut seen = HashSet::new();
        for row in table.rows() {
            let mut fields: Vec<String> = row.iter().map(str::to_string).collect();
            fields.resize(headers.len(), String::new());

            let strain = self.strip_prefixes(fields[id_col].trim()).to_string();
            if !seen.insert(strain.clone()) {
                warn!("Dropping duplicate metadata row for {}", strain);
                continue;
            }
            fields[id_col] = strain;

            if let Some(col) = location_col {
                let location = row.get(col).unwrap_or_default().to_string();
                for (part, &target) in location.split('/').zip(&location_targets) {
                    fields[target] = part.trim().to_string();
                }
            }
            writer.write_record(&fields)?;
        }
        finish_table(writer)?;
        Ok(())
    }
}
