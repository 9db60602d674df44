//! Create and manipulate the [Table].

use crate::utils;
use crate::InputError;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fmt::{Debug, Display};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A row-based table of generic data.
///
/// # Examples
///
/// ```
/// use strainer::Table;
///
/// let mut table = Table::new();
/// table.headers = vec!["genome", "snvs"];
/// table.add_row(vec!["MAG_1", "12"])?;
///
/// println!("{}", table.to_markdown()?);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
///
/// | genome | snvs |
/// |--------|------|
/// | MAG_1  |  12  |
///
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Table<T> {
    /// Names of the table columns.
    pub headers: Vec<T>,
    /// Rows of table values.
    pub rows: Vec<Vec<T>>,
    /// Optional file path for where the table was read from.
    pub path: Option<PathBuf>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Table<T> {
    /// Create a new table with empty headers and rows.
    pub fn new() -> Self {
        Table { headers: Vec::new(), rows: Vec::new(), path: None }
    }
}

impl<T> Table<T>
where
    T: Display,
{
    /// Add a new row to the table.
    ///
    /// The row must have one value per header.
    ///
    /// ```
    /// use strainer::Table;
    ///
    /// let mut table = Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(vec!["A", "B", "C"])?;
    /// assert!(table.add_row(vec!["D", "E"]).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn add_row(&mut self, row: Vec<T>) -> Result<(), Report> {
        let (new, ex) = (row.len(), self.headers.len());
        if new != ex {
            return Err(eyre!("New row size ({new}) does not match the table headers ({ex})."));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Get the column index (0-based) corresponding to the header.
    ///
    /// ```
    /// use strainer::Table;
    ///
    /// let mut table = Table::new();
    /// table.headers = vec!["scaffold", "position_coverage", "length"];
    ///
    /// assert_eq!(table.get_header_index("length")?, 2);
    /// assert!(table.get_header_index("coverage").is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_header_index(&self, header: &str) -> Result<usize, Report> {
        let pos = self.headers.iter().position(|h| h.to_string() == header).ok_or_else(|| {
            InputError::MissingColumn { column: header.to_string(), path: self.path.clone() }
        })?;
        Ok(pos)
    }

    /// Return a vector of table values in a column.
    pub fn get_column(&self, header: &str) -> Result<Vec<&T>, Report> {
        let header_i = self.get_header_index(header)?;
        let column = self.rows.iter().map(|row| &row[header_i]).collect();
        Ok(column)
    }

    /// Write table to file, the delimiter is identified from the file extension when not provided.
    pub fn write<P>(&self, path: &P, delim: Option<u8>) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let delim = match delim {
            Some(c) => c,
            None => utils::get_delimiter(path)?,
        };
        utils::create_parent_dir(path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delim)
            .from_path(path)
            .wrap_err_with(|| format!("Unable to create file: {path:?}"))?;

        writer
            .write_record(self.headers.iter().map(|h| h.to_string()))
            .wrap_err_with(|| format!("Unable to write table headers: {path:?}"))?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .wrap_err_with(|| format!("Unable to write table rows: {path:?}"))?;
        }
        writer.flush().wrap_err_with(|| format!("Unable to write file: {path:?}"))?;

        Ok(())
    }

    /// Convert table to markdown format.
    ///
    /// ```
    /// use strainer::Table;
    ///
    /// let mut table = Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(vec!["A", "B", "C"])?;
    ///
    /// let expected = "| 1 | 2 | 3 |\n|---|---|---|\n| A | B | C |\n";
    /// assert_eq!(table.to_markdown()?, expected);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn to_markdown(&self) -> Result<String, Report> {
        // widest cell per column, +2 to add space on either side
        let col_widths = self
            .headers
            .iter()
            .enumerate()
            .map(|(col_i, header)| {
                self.rows
                    .iter()
                    .map(|row| row[col_i].to_string().len())
                    .chain(std::iter::once(header.to_string().len()))
                    .max()
                    .unwrap_or_default()
                    + 2
            })
            .collect_vec();

        let mut markdown = String::from("|");
        // frame in between headers and rows
        let mut header_frame = String::from("|");

        for (header, col_width) in self.headers.iter().zip(col_widths.iter()) {
            markdown.push_str(&format!("{:^width$}|", header.to_string(), width = col_width));
            header_frame.push_str(&format!("{}|", "-".repeat(*col_width)));
        }
        markdown.push('\n');
        markdown.push_str(&header_frame);
        markdown.push('\n');

        for row in &self.rows {
            markdown.push('|');
            for (value, col_width) in row.iter().zip(col_widths.iter()) {
                markdown.push_str(&format!("{:^width$}|", value.to_string(), width = col_width));
            }
            markdown.push('\n');
        }

        Ok(markdown)
    }
}

/// Parse a table cell, failures name the column and the offending value.
///
/// ```
/// use strainer::table::parse_value;
///
/// let length: u64 = parse_value("5000", "length")?;
/// assert_eq!(length, 5000);
/// assert!(parse_value::<u64>("-1", "length").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn parse_value<T>(value: &str, column: &str) -> Result<T, Report>
where
    T: FromStr,
    T::Err: Display,
{
    let parsed = value.trim().parse().map_err(|e| InputError::invalid_field(column, value, e))?;
    Ok(parsed)
}

impl Table<String> {
    /// Read a delimited file with a header line into a Table.
    ///
    /// The delimiter is identified from the file extension (.tsv, .txt or .csv) when not provided.
    ///
    /// ```
    /// use strainer::Table;
    /// use std::io::Write;
    /// use tempfile::NamedTempFile;
    ///
    /// let mut file = NamedTempFile::new()?;
    /// writeln!(file, "scaffold\tlength\ns1\t5000")?;
    /// let table = Table::read(&file.path(), Some(b'\t'))?;
    /// assert_eq!(table.get_column("length")?, [&"5000"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read<P>(path: &P, delim: Option<u8>) -> Result<Table<String>, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let delim = match delim {
            Some(c) => c,
            None => utils::get_delimiter(path)?,
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delim)
            .from_path(path)
            .wrap_err_with(|| format!("Failed to read file: {path:?}"))?;

        let mut table = Table::new();
        table.headers = reader
            .headers()
            .wrap_err_with(|| format!("Failed to read table headers: {path:?}"))?
            .iter()
            .map(String::from)
            .collect();

        for (i, record) in reader.records().enumerate() {
            let record =
                record.wrap_err_with(|| format!("Failed to parse row {} of table: {path:?}", i + 1))?;
            table.rows.push(record.iter().map(String::from).collect());
        }
        table.path = Some(path.as_ref().to_path_buf());

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("summary").join("table.tsv");

        let mut table = Table::new();
        table.headers = vec!["genome".to_string(), "snvs".to_string()];
        table.add_row(vec!["MAG_1".to_string(), "3".to_string()])?;
        table.add_row(vec!["MAG 2".to_string(), "0".to_string()])?;
        table.write(&path, None)?;

        let observed = Table::read(&path, None)?;
        assert_eq!(observed.headers, table.headers);
        assert_eq!(observed.rows, table.rows);
        assert_eq!(observed.path, Some(path));
        Ok(())
    }

    #[test]
    fn missing_column_is_typed() {
        let mut table: Table<&str> = Table::new();
        table.headers = vec!["scaffold"];
        let report = table.get_header_index("genome").unwrap_err();
        assert!(matches!(report.downcast_ref::<InputError>(), Some(InputError::MissingColumn { .. })));
    }

    #[test]
    fn ragged_rows_are_rejected() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ragged.tsv");
        std::fs::write(&path, "a\tb\n1\t2\n3\n")?;
        assert!(Table::read(&path, None).is_err());
        Ok(())
    }
}
