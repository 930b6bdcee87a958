use crate::bio::sequence::Sequence;
use crate::utils::io::{create_writer, open_reader};
use crate::{GistError, Result};
use nom::{
    bytes::complete::{tag, take_till1},
    character::complete::{not_line_ending, space1},
    combinator::opt,
    sequence::preceded,
    IResult,
};
use std::io::{BufRead, Write};
use std::path::Path;

/// Parse a FASTA header line (without its line terminator)
fn parse_header(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (input, _) = tag(">")(input)?;
    let (input, id) = take_till1(|c: char| c.is_whitespace())(input)?;
    let (input, description) = opt(preceded(space1, not_line_ending))(input)?;
    Ok((input, (id, description)))
}

fn header_to_record(line: &str, line_no: usize) -> Result<Sequence> {
    let (_, (id, description)) = parse_header(line).map_err(|_| {
        GistError::Parse(format!("Malformed FASTA header at line {}: {:?}", line_no, line))
    })?;

    let mut record = Sequence::new(id.to_string(), Vec::new());
    if let Some(desc) = description.map(str::trim).filter(|d| !d.is_empty()) {
        record = record.with_description(desc.to_string());
    }
    Ok(record)
}

/// Streaming FASTA reader. Holds at most one record in memory, so a corpus
/// of millions of genomes can be filtered in a single pass.
pub struct FastaReader<R: BufRead> {
    reader: R,
    line: String,
    line_no: usize,
    pending: Option<Sequence>,
    done: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            pending: None,
            done: false,
        }
    }

    fn next_record(&mut self) -> Result<Option<Sequence>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                self.done = true;
                return Ok(self.pending.take());
            }
            self.line_no += 1;

            let line = self.line.trim_end_matches(['\n', '\r']);
            if line.starts_with('>') {
                let record = header_to_record(line, self.line_no)?;
                if let Some(previous) = self.pending.replace(record) {
                    return Ok(Some(previous));
                }
            } else if let Some(record) = self.pending.as_mut() {
                record.sequence.extend(
                    line.bytes()
                        .filter(|c| !c.is_ascii_whitespace())
                        .map(|c| c.to_ascii_uppercase()),
                );
            } else if !line.trim().is_empty() {
                return Err(GistError::Parse(format!(
                    "Sequence data before first FASTA header at line {}",
                    self.line_no
                )));
            }
        }
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<Sequence>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Open a FASTA file (plain or `.gz`) for streaming.
pub fn open_fasta(path: &Path) -> Result<FastaReader<Box<dyn BufRead>>> {
    Ok(FastaReader::new(open_reader(path)?))
}

/// Parse FASTA from bytes
pub fn parse_fasta_from_bytes(data: &[u8]) -> Result<Vec<Sequence>> {
    FastaReader::new(data).collect()
}

/// Parse a FASTA file into sequences (supports .gz compression)
pub fn parse_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
    open_fasta(path.as_ref())?.collect()
}

/// Write a single record, wrapping the sequence at 80 columns
pub fn write_record<W: Write + ?Sized>(writer: &mut W, seq: &Sequence) -> Result<()> {
    writeln!(writer, "{}", seq.header())?;
    for chunk in seq.sequence.chunks(80) {
        writer.write_all(chunk)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Write sequences to a FASTA file (supports .gz compression)
pub fn write_fasta<P: AsRef<Path>>(path: P, sequences: &[Sequence]) -> Result<()> {
    let mut writer = create_writer(path.as_ref())?;
    for seq in sequences {
        write_record(&mut writer, seq)?;
    }
    writer.finish()?;
    Ok(())
}
