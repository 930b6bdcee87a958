/// Identifier-list files: one strain per line. Blank lines and `#` comments
/// are ignored on read; writes are always sorted so the file content does
/// not depend on the order strata finished in.
use crate::utils::io::open_reader;
use crate::Result;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

pub type StrainSet = BTreeSet<String>;

pub fn read_strains(path: &Path) -> Result<StrainSet> {
    let reader = open_reader(path)?;
    let mut strains = StrainSet::new();
    for line in reader.lines() {
        let line = line?;
        let strain = line.trim();
        if strain.is_empty() || strain.starts_with('#') {
            continue;
        }
        strains.insert(strain.to_string());
    }
    Ok(strains)
}

pub fn write_strains<'a, I>(path: &Path, strains: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a String>,
{
    let sorted: BTreeSet<&String> = strains.into_iter().collect();
    let mut writer = BufWriter::new(File::create(path)?);
    for strain in &sorted {
        writeln!(writer, "{}", strain)?;
    }
    writer.flush()?;
    Ok(sorted.len())
}

/// Union of several identifier-list files.
pub fn union_files<P: AsRef<Path>>(paths: &[P]) -> Result<StrainSet> {
    let mut union = StrainSet::new();
    for path in paths {
        union.extend(read_strains(path.as_ref())?);
    }
    Ok(union)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_ignores_comments_and_blanks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.txt");
        fs::write(&path, "# header\nB\n\n  A  \nB\n").unwrap();

        let strains = read_strains(&path).unwrap();
        assert_eq!(strains.into_iter().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_write_is_sorted_and_unique() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.txt");
        let ids = vec!["c".to_string(), "a".to_string(), "c".to_string()];

        assert_eq!(write_strains(&path, &ids).unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nc\n");
    }

    #[test]
    fn test_union_of_files() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("1.txt");
        let second = dir.path().join("2.txt");
        fs::write(&first, "x\ny\n").unwrap();
        fs::write(&second, "y\nz\n").unwrap();

        let union = union_files(&[first, second]).unwrap();
        assert_eq!(union.len(), 3);
    }
}
