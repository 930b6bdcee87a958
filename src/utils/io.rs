/// Compression-aware file handles. A `.gz` extension selects gzip on both
/// the read and the write side; anything else is plain text.
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub fn is_gzipped(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("gz")
}

pub fn open_reader(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Output file, plain or gzip. Call `finish` when done: the gzip trailer
/// is only written there, and dropping the writer discards write errors.
pub enum FileWriter {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
}

impl FileWriter {
    pub fn finish(self) -> io::Result<()> {
        match self {
            FileWriter::Plain(mut writer) => writer.flush(),
            FileWriter::Gzip(writer) => {
                let encoder = writer.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?;
                Ok(())
            }
        }
    }
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileWriter::Plain(writer) => writer.write(buf),
            FileWriter::Gzip(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileWriter::Plain(writer) => writer.flush(),
            FileWriter::Gzip(writer) => writer.flush(),
        }
    }
}

pub fn create_writer(path: &Path) -> io::Result<FileWriter> {
    let file = File::create(path)?;
    if is_gzipped(path) {
        Ok(FileWriter::Gzip(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(FileWriter::Plain(BufWriter::new(file)))
    }
}

/// Flush a table writer and finish the file underneath it.
pub fn finish_table(writer: csv::Writer<FileWriter>) -> io::Result<()> {
    writer.into_inner().map_err(|e| e.into_error())?.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_gzip_round_trip_after_finish() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.txt.gz");
        let mut writer = create_writer(&path).unwrap();
        writer.write_all(b"a\nb\n").unwrap();
        writer.finish().unwrap();

        let mut contents = String::new();
        open_reader(&path).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "a\nb\n");
    }

    #[test]
    fn test_finish_table_completes_gzip_trailer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.tsv.gz");
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(create_writer(&path).unwrap());
        writer.write_record(["strain", "country"]).unwrap();
        writer.write_record(["a", "Brazil"]).unwrap();
        finish_table(writer).unwrap();

        // A truncated stream fails to decode to the end.
        let mut contents = String::new();
        open_reader(&path).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "strain\tcountry\na\tBrazil\n");
    }
}
