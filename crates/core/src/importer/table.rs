//! Minimal header-plus-rows CSV reader for job artifacts.

use std::path::Path;

use super::error::ImportError;

/// A parsed CSV artifact: one header row and any number of value rows.
#[derive(Debug, Clone)]
pub(crate) struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// A single row with by-name field access.
pub(crate) struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl Table {
    /// Reads and parses the file at `path`.
    pub(crate) async fn read(path: &Path) -> Result<Self, ImportError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImportError::MissingFile {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(ImportError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self::parse(name, &text)
    }

    /// Parses CSV text. `name` is only used in error messages.
    pub(crate) fn parse(name: impl Into<String>, text: &str) -> Result<Self, ImportError> {
        let name = name.into();
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header_line = lines
            .next()
            .ok_or_else(|| ImportError::parse_failure(&name, "file is empty"))?;
        let headers: Vec<String> = parse_line(header_line.trim_start_matches('\u{feff}'))
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        let rows = lines.map(parse_line).collect();

        Ok(Self {
            name,
            headers,
            rows,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row { table: self, index })
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |index| Row { table: self, index })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

impl Row<'_> {
    /// Line number in the file (the header is line 1).
    pub(crate) fn line(&self) -> usize {
        self.index + 2
    }

    /// Raw value of a column. Absent columns and blank cells are `None`.
    pub(crate) fn get(&self, column: &str) -> Option<&str> {
        let idx = self.table.column(column)?;
        self.table.rows[self.index]
            .get(idx)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Float column, 0 when absent. A present but malformed value is an error.
    pub(crate) fn float_or_zero(&self, column: &str) -> Result<f64, ImportError> {
        Ok(self.float(column)?.unwrap_or(0.0))
    }

    /// Float column, `None` when absent. NaN and infinities are rejected.
    pub(crate) fn float(&self, column: &str) -> Result<Option<f64>, ImportError> {
        self.get(column)
            .map(|v| match v.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(x),
                _ => Err(self.invalid(column, format!("is not a finite number: {:?}", v))),
            })
            .transpose()
    }

    /// Integer column, `None` when absent. Accepts integral floats such as `100.0`.
    pub(crate) fn integer(&self, column: &str) -> Result<Option<i64>, ImportError> {
        let Some(raw) = self.get(column) else {
            return Ok(None);
        };
        if let Ok(v) = raw.parse::<i64>() {
            return Ok(Some(v));
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(Some(v as i64)),
            _ => Err(ImportError::parse_failure(
                self.table.name(),
                format!("line {}: {} is not an integer: {:?}", self.line(), column, raw),
            )),
        }
    }

    /// Integer column, 0 when absent.
    pub(crate) fn integer_or_zero(&self, column: &str) -> Result<i64, ImportError> {
        Ok(self.integer(column)?.unwrap_or(0))
    }

    /// Integer column that must be present.
    pub(crate) fn required_integer(&self, column: &str) -> Result<i64, ImportError> {
        self.integer(column)?.ok_or_else(|| self.missing(column))
    }

    /// Float column that must be present.
    pub(crate) fn required_float(&self, column: &str) -> Result<f64, ImportError> {
        self.float(column)?.ok_or_else(|| self.missing(column))
    }

    /// Parse failure for `column` on this row.
    pub(crate) fn invalid(&self, column: &str, reason: impl std::fmt::Display) -> ImportError {
        ImportError::parse_failure(
            self.table.name(),
            format!("line {}: {} {}", self.line(), column, reason),
        )
    }

    fn missing(&self, column: &str) -> ImportError {
        ImportError::parse_failure(
            self.table.name(),
            format!("line {}: missing {}", self.line(), column),
        )
    }
}

/// Splits one CSV line, honoring double-quoted fields and `""` escapes.
fn parse_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch == ',' {
            result.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    result.push(current);
    result
}
