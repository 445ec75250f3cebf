use std::{fs, num::ParseIntError, path::Path, str::FromStr};
use thiserror::Error;

use crate::sim::job::{IoProfile, Job};

const FIELDS: [&str; 7] = [
    "pid",
    "memory",
    "arrival",
    "burst",
    "io_period",
    "io_duration",
    "priority",
];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: expected 6 or 7 fields, found {found}")]
    FieldCount { line: usize, found: usize },
    #[error("line {line}: invalid {field} {value:?}: {source}")]
    Number {
        line: usize,
        field: &'static str,
        value: String,
        source: ParseIntError,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// One `pid, memory, arrival, burst, io_period, io_duration[, priority]`
/// per line. Blank lines and `#` comments are skipped.
pub fn parse_jobs(text: &str) -> Result<Vec<Job>, ParseError> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| parse_line(line_no, line))
        .collect()
}

pub fn read_jobs(path: &Path) -> Result<Vec<Job>, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_jobs(&text)
}

fn parse_line(line_no: usize, line: &str) -> Result<Job, ParseError> {
    let tokens: Vec<&str> = line.split(',').map(str::trim).collect();
    if !(6..=7).contains(&tokens.len()) {
        return Err(ParseError::FieldCount {
            line: line_no,
            found: tokens.len(),
        });
    }

    Ok(Job {
        pid: field(line_no, &tokens, 0)?,
        mem_size: field(line_no, &tokens, 1)?,
        arrival_time: field(line_no, &tokens, 2)?,
        burst: field(line_no, &tokens, 3)?,
        io: IoProfile {
            period: field(line_no, &tokens, 4)?,
            duration: field(line_no, &tokens, 5)?,
        },
        priority: match tokens.len() {
            7 => Some(field(line_no, &tokens, 6)?),
            _ => None,
        },
    })
}

fn field<T>(line: usize, tokens: &[&str], idx: usize) -> Result<T, ParseError>
where
    T: FromStr<Err = ParseIntError>,
{
    let value = tokens[idx];
    value.parse().map_err(|source| ParseError::Number {
        line,
        field: FIELDS[idx],
        value: value.to_string(),
        source,
    })
}
