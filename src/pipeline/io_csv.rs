// Primitives for reading and writing CSV tables.

use std::io;

use crate::pipeline::io_common::{format_f64, parse_f64, parse_response};
use crate::pipeline::*;

/// A CSV table held as text. Cells are only parsed when a column is read, so the
/// columns a stage does not know about are written back untouched.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Table {
    /// Where the table was read from, for the error messages.
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(source: &str, headers: Vec<String>) -> Table {
        Table {
            source: source.to_string(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn read(path: &str) -> PipelineResult<Table> {
        info!("Reading table {:?}", path);
        let rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .context(CsvOpenSnafu { path })?;
        Table::from_csv(path, rdr)
    }

    pub fn from_reader<R: io::Read>(source: &str, reader: R) -> PipelineResult<Table> {
        let rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        Table::from_csv(source, rdr)
    }

    fn from_csv<R: io::Read>(source: &str, mut rdr: csv::Reader<R>) -> PipelineResult<Table> {
        let headers: Vec<String> = rdr
            .headers()
            .context(CsvLineParseSnafu {
                path: source,
                lineno: 1_usize,
            })?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();
        let mut table = Table::new(source, headers);
        for (idx, record) in rdr.records().enumerate() {
            let record = record.context(CsvLineParseSnafu {
                path: source,
                lineno: idx + 2,
            })?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            let columns = table.headers.len();
            // Trailing empty cells are dropped, short rows are padded with missing values.
            while row.len() > columns && row.last().map_or(false, |c| c.trim().is_empty()) {
                row.pop();
            }
            ensure!(
                row.len() <= columns,
                RowTooLongSnafu {
                    path: source,
                    lineno: idx + 2,
                    cells: row.len(),
                    columns,
                }
            );
            row.resize(columns, String::new());
            table.rows.push(row);
        }
        debug!(
            "read table {:?}: {} columns, {} rows",
            source,
            table.headers.len(),
            table.rows.len()
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fails with all the missing columns at once.
    pub fn require(&self, columns: &[&str]) -> PipelineResult<()> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .map(|c| c.to_string())
            .collect();
        ensure!(
            missing.is_empty(),
            SchemaSnafu {
                path: self.source.clone(),
                missing
            }
        );
        Ok(())
    }

    pub fn require_all(&self, columns: &[String]) -> PipelineResult<()> {
        let cols: Vec<&str> = columns.iter().map(|s| s.as_str()).collect();
        self.require(&cols)
    }

    pub fn column(&self, name: &str) -> PipelineResult<Vec<&str>> {
        let idx = self.column_index(name).context(SchemaSnafu {
            path: self.source.clone(),
            missing: vec![name.to_string()],
        })?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Empty cells are read as NaN.
    pub fn f64_column(&self, name: &str) -> PipelineResult<Vec<f64>> {
        self.parsed_column(name, parse_f64)
    }

    /// Vote counts: non-negative integers, possibly with thousands separators.
    pub fn count_column(&self, name: &str) -> PipelineResult<Vec<u64>> {
        self.parsed_column(name, |cell| {
            clean_numeric(cell)
                .filter(|x| *x >= 0.0 && x.fract() == 0.0)
                .map(|x| x as u64)
        })
    }

    fn parsed_column<T, F>(&self, name: &str, parse: F) -> PipelineResult<Vec<T>>
    where
        F: Fn(&str) -> Option<T>,
    {
        let cells = self.column(name)?;
        let mut res: Vec<T> = Vec::with_capacity(cells.len());
        for (idx, cell) in cells.into_iter().enumerate() {
            let x = parse(cell).context(CellParseSnafu {
                path: self.source.clone(),
                column: name,
                lineno: idx + 2,
                value: cell,
            })?;
            res.push(x);
        }
        Ok(res)
    }

    /// Replaces the column if it exists, appends it otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        match self.column_index(name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values.into_iter()) {
                    row[idx] = v;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values.into_iter()) {
                    row.push(v);
                }
            }
        }
    }

    pub fn set_f64_column(&mut self, name: &str, values: &[f64]) {
        self.set_column(name, values.iter().map(|x| format_f64(*x)).collect());
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn to_csv_string(&self) -> PipelineResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&self.headers).context(CsvWriteSnafu {})?;
        for row in self.rows.iter() {
            wtr.write_record(row).context(CsvWriteSnafu {})?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
            .context(CsvWriteSnafu {})?;
        String::from_utf8(bytes).whatever_context("CSV output is not valid UTF-8")
    }
}

/// Streams the survey responses: the export has many more columns than the three
/// that are read.
pub fn read_csv_responses(path: &str, columns: &ResponseColumns) -> PipelineResult<Vec<Response>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let headers = rdr
        .headers()
        .context(CsvLineParseSnafu {
            path,
            lineno: 1_usize,
        })?
        .clone();
    let find = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (state_idx, pref_idx, likely_idx) = match (
        find(&columns.state),
        find(&columns.preference),
        find(&columns.likely),
    ) {
        (Some(s), Some(p), Some(l)) => (s, p, l),
        (s, p, l) => {
            let mut missing: Vec<String> = Vec::new();
            for (idx, name) in [
                (s, &columns.state),
                (p, &columns.preference),
                (l, &columns.likely),
            ] {
                if idx.is_none() {
                    missing.push(name.clone());
                }
            }
            return SchemaSnafu { path, missing }.fail();
        }
    };

    let mut res: Vec<Response> = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let lineno = idx + 2;
        let record = record.context(CsvLineParseSnafu { path, lineno })?;
        let cell = |i: usize| record.get(i).unwrap_or("");
        let r = parse_response(
            path,
            lineno,
            columns,
            cell(state_idx),
            cell(pref_idx),
            cell(likely_idx),
        )?;
        res.push(r);
    }
    Ok(res)
}
