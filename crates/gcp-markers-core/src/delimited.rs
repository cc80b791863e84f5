//! Delimiter-configurable record reader.
//!
//! Both subsystems read line-oriented delimited text: the marker match list
//! and the ground-control coordinate table. The reader is lazy and never
//! fails on a malformed row; call sites classify each record explicitly and
//! decide whether to keep or skip it.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Errors raised when opening or reading a delimited input file.
#[derive(thiserror::Error, Debug)]
pub enum DelimitedError {
    #[error("input file not found: {0}")]
    MissingFile(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Field delimiter for the CSV inputs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delimiter {
    Space,
    Tab,
    Comma,
    Colon,
    Semicolon,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Space => ' ',
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
            Delimiter::Colon => ':',
            Delimiter::Semicolon => ';',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Delimiter::Space => "space",
            Delimiter::Tab => "tab",
            Delimiter::Comma => "comma",
            Delimiter::Colon => "colon",
            Delimiter::Semicolon => "semicolon",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown delimiter {0:?} (expected space, tab, comma, colon or semicolon)")]
pub struct ParseDelimiterError(String);

impl FromStr for Delimiter {
    type Err = ParseDelimiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "space" => Ok(Delimiter::Space),
            "tab" => Ok(Delimiter::Tab),
            "comma" => Ok(Delimiter::Comma),
            "colon" => Ok(Delimiter::Colon),
            "semicolon" => Ok(Delimiter::Semicolon),
            other => Err(ParseDelimiterError(other.to_string())),
        }
    }
}

/// One raw record: 1-based source line number and its split fields.
#[derive(Clone, Debug)]
pub struct Record {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Lazy reader over the records of a delimited text file.
///
/// Blank lines are skipped. Fields are split verbatim; numeric call sites
/// trim before parsing.
#[derive(Debug)]
pub struct DelimitedReader {
    lines: Lines<BufReader<File>>,
    delimiter: char,
    line: usize,
}

impl DelimitedReader {
    /// Open `path` for record iteration.
    pub fn open(path: impl AsRef<Path>, delimiter: Delimiter) -> Result<Self, DelimitedError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DelimitedError::MissingFile(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            delimiter: delimiter.as_char(),
            line: 0,
        })
    }
}

impl Iterator for DelimitedReader {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err)),
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields = line.split(self.delimiter).map(str::to_string).collect();
            return Some(Ok(Record {
                line: self.line,
                fields,
            }));
        }
    }
}

/// Parse one field as a float, naming the column in the failure reason.
pub fn parse_f64(field: &str, column: &str) -> Result<f64, String> {
    field
        .trim()
        .parse()
        .map_err(|_| format!("invalid {column} value {:?}", field.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn delimiter_names_round_trip() {
        for d in [
            Delimiter::Space,
            Delimiter::Tab,
            Delimiter::Comma,
            Delimiter::Colon,
            Delimiter::Semicolon,
        ] {
            assert_eq!(d.name().parse::<Delimiter>().expect("parse"), d);
        }
        assert!("pipe".parse::<Delimiter>().is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = DelimitedReader::open("/nonexistent/input.csv", Delimiter::Comma).unwrap_err();
        assert!(matches!(err, DelimitedError::MissingFile(_)));
    }

    #[test]
    fn reads_records_in_order_and_skips_blank_lines() {
        let file = temp_csv("1;2;3\n\n4;5\n");
        let records: Vec<Record> = DelimitedReader::open(file.path(), Delimiter::Semicolon)
            .expect("open")
            .map(|r| r.expect("record"))
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 1);
        assert_eq!(records[0].fields, ["1", "2", "3"]);
        assert_eq!(records[1].line, 3);
        assert_eq!(records[1].fields, ["4", "5"]);
    }

    #[test]
    fn tab_delimited_records_split_on_tabs_only() {
        let file = temp_csv("a b\tc\n");
        let records: Vec<Record> = DelimitedReader::open(file.path(), Delimiter::Tab)
            .expect("open")
            .map(|r| r.expect("record"))
            .collect();
        assert_eq!(records[0].fields, ["a b", "c"]);
    }

    #[test]
    fn parse_f64_trims_and_names_the_column() {
        assert_eq!(parse_f64(" 2.5 ", "markerX").expect("parse"), 2.5);
        let err = parse_f64("abc", "markerX").unwrap_err();
        assert!(err.contains("markerX"));
    }
}
