use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::models::RawRow;

const SAMPLE_SIZE: usize = 1024;
const CANDIDATE_DELIMITERS: &[u8] = b",;\t|";
const HEADER_CHECK_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub has_header: bool,
}

/// Guess delimiter and header presence from the start of a file.
pub fn sniff(sample: &str) -> Dialect {
    let lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    let delimiter = detect_delimiter(&lines);
    let has_header = detect_header(sample, delimiter);
    Dialect {
        delimiter,
        has_header,
    }
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// The candidate whose non-zero per-line count repeats on the most lines.
/// Ties go to the candidate with more fields per line, then to list order.
fn detect_delimiter(lines: &[&str]) -> u8 {
    let mut best = (b',', (0usize, 0usize));
    for &candidate in CANDIDATE_DELIMITERS {
        let mut frequency: HashMap<usize, usize> = HashMap::new();
        for line in lines {
            let n = count_unquoted(line, candidate);
            if n > 0 {
                *frequency.entry(n).or_default() += 1;
            }
        }
        let score = frequency
            .iter()
            .map(|(count, lines)| (*lines, *count))
            .max()
            .unwrap_or((0, 0));
        if score > best.1 {
            best = (candidate, score);
        }
    }
    best.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Numeric,
    Length(usize),
}

fn column_type(value: &str) -> ColumnType {
    if value.trim().parse::<f64>().is_ok() {
        ColumnType::Numeric
    } else {
        ColumnType::Length(value.chars().count())
    }
}

/// First row is a header when it disagrees with the column types that
/// the following rows agree on. Each consistent column casts one vote.
fn detect_header(sample: &str, delimiter: u8) -> bool {
    let rows = parse_records(sample.as_bytes(), delimiter);
    let Some((header, body)) = rows.split_first() else {
        return false;
    };

    let mut types: Vec<Option<Option<ColumnType>>> = vec![Some(None); header.len()];
    for row in body.iter().take(HEADER_CHECK_ROWS) {
        if row.len() != header.len() {
            continue;
        }
        for (col, value) in row.iter().enumerate() {
            let this = column_type(value);
            types[col] = match types[col] {
                Some(None) => Some(Some(this)),
                Some(Some(seen)) if seen == this => Some(Some(seen)),
                _ => None,
            };
        }
    }

    let mut votes = 0i32;
    for (col, ty) in types.iter().enumerate() {
        match ty {
            Some(Some(ColumnType::Length(len))) => {
                if header[col].chars().count() != *len {
                    votes += 1;
                } else {
                    votes -= 1;
                }
            }
            Some(Some(ColumnType::Numeric)) => {
                if column_type(&header[col]) == ColumnType::Numeric {
                    votes -= 1;
                } else {
                    votes += 1;
                }
            }
            _ => {}
        }
    }
    votes > 0
}

fn parse_records(data: &[u8], delimiter: u8) -> Vec<RawRow> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data);
    rdr.byte_records()
        .filter_map(|r| r.ok())
        .map(|record| {
            record
                .iter()
                .map(|f| String::from_utf8_lossy(f).trim_start_matches(' ').to_string())
                .collect::<RawRow>()
        })
        .filter(|row| row.iter().any(|f| !f.is_empty()))
        .collect()
}

fn sample_of(data: &[u8]) -> String {
    if data.len() <= SAMPLE_SIZE {
        return String::from_utf8_lossy(data).into_owned();
    }
    let mut sample = &data[..SAMPLE_SIZE];
    // A cut-off last line would skew both delimiter counts and header votes.
    if let Some(last_newline) = sample.iter().rposition(|b| *b == b'\n') {
        sample = &sample[..=last_newline];
    }
    String::from_utf8_lossy(sample).into_owned()
}

/// Read every data row of a CSV file, dropping the header when one is
/// detected. Leading spaces after a delimiter are skipped.
pub fn load_csv(path: &Path) -> Result<Vec<RawRow>> {
    let data = std::fs::read(path)?;
    let dialect = sniff(&sample_of(&data));
    tracing::debug!(
        "Dialect of {}: delimiter {:?}, header {}",
        path.display(),
        dialect.delimiter as char,
        dialect.has_header
    );

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(dialect.delimiter)
        .from_reader(data.as_slice());
    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        let row: RawRow = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).trim_start_matches(' ').to_string())
            .collect();
        if row.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    if dialect.has_header && !rows.is_empty() {
        rows.remove(0);
    }
    Ok(rows)
}
