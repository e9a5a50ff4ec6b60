//! Table - typed cells and bounded reads over CSV and Excel datasets
//!
//! CSV files are read in fixed-size chunks so that no pass has to hold the
//! whole file. Excel workbooks have no chunked mode and are read as a single
//! chunk from their first sheet.
//!
//! Column types are inferred per chunk, so one column may be typed
//! differently in two chunks of the same file.

use crate::error::{DatasetError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use csv::{ReaderBuilder, StringRecord};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::Path;

use crate::workspace::DatasetFormat;

/// Cell values read as missing
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Bytes charged per chunk for the row index
const INDEX_BYTES: u64 = 128;

/// A single value in a dataset
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Wrap raw CSV text. Missing-value tokens become `Null`; everything
    /// else stays text until the column is typed.
    pub fn from_raw(raw: &str) -> Cell {
        if NA_TOKENS.contains(&raw) {
            Cell::Null
        } else {
            Cell::Text(raw.to_string())
        }
    }

    fn from_excel(data: &Data) -> Cell {
        match data {
            Data::Empty | Data::Error(_) => Cell::Null,
            Data::Bool(b) => Cell::Bool(*b),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => {
                // Workbooks store integers as floats
                if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
                    Cell::Int(*f as i64)
                } else {
                    Cell::Float(*f)
                }
            }
            Data::String(s) => Cell::from_raw(s),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Best typed reading of this cell: text that parses as a boolean or a
    /// number becomes one.
    fn parsed(&self) -> Cell {
        let Cell::Text(raw) = self else {
            return self.clone();
        };

        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return Cell::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Cell::Bool(false);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Cell::Float(f);
        }
        self.clone()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(i) => Value::Number((*i).into()),
            Cell::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }

    /// Estimated bytes held by this value when boxed in an object column.
    fn boxed_size(&self) -> u64 {
        match self {
            Cell::Null | Cell::Float(_) => 24,
            Cell::Bool(_) | Cell::Int(_) => 28,
            Cell::Text(s) if s.is_ascii() => 49 + s.len() as u64,
            Cell::Text(s) => 74 + 2 * s.chars().count() as u64,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NaN"),
            Cell::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{:?}", v),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Inferred storage type of a column within one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Bool,
    Object,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Bool => "bool",
            ColumnType::Object => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int64 | ColumnType::Float64)
    }

    /// Type for a column given the typed readings of its cells.
    fn infer<'a>(cells: impl Iterator<Item = &'a Cell>) -> ColumnType {
        let (mut rows, mut nulls, mut bools, mut ints, mut floats) = (0usize, 0, 0, 0, 0);
        for cell in cells {
            rows += 1;
            match cell {
                Cell::Null => nulls += 1,
                Cell::Bool(_) => bools += 1,
                Cell::Int(_) => ints += 1,
                Cell::Float(_) => floats += 1,
                Cell::Text(_) => return ColumnType::Object,
            }
        }

        let present = rows - nulls;
        if rows == 0 {
            ColumnType::Object
        } else if present == 0 {
            ColumnType::Float64
        } else if bools == present {
            if nulls == 0 { ColumnType::Bool } else { ColumnType::Object }
        } else if ints == present && nulls == 0 {
            ColumnType::Int64
        } else if ints + floats == present {
            ColumnType::Float64
        } else {
            ColumnType::Object
        }
    }

    /// Convert a cell into this column's representation. Object columns keep
    /// the original cell.
    fn materialize(&self, original: Cell, parsed: Cell) -> Cell {
        match (self, parsed) {
            (ColumnType::Object, _) => original,
            (_, Cell::Null) => Cell::Null,
            (ColumnType::Float64, Cell::Int(i)) => Cell::Float(i as f64),
            (_, parsed) => parsed,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block of rows with per-column types
#[derive(Debug, Clone)]
pub struct Chunk {
    columns: Vec<String>,
    types: Vec<ColumnType>,
    rows: Vec<Vec<Cell>>,
}

impl Chunk {
    pub fn empty(columns: Vec<String>) -> Self {
        let types = vec![ColumnType::Object; columns.len()];
        Self { columns, types, rows: Vec::new() }
    }

    /// Type every column from its cells and convert cells to match.
    pub fn from_rows(columns: Vec<String>, raw_rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let parsed: Vec<Vec<Cell>> = raw_rows
            .iter()
            .map(|row| row.iter().map(Cell::parsed).collect())
            .collect();

        let types: Vec<ColumnType> = (0..width)
            .map(|idx| ColumnType::infer(parsed.iter().map(|row| &row[idx])))
            .collect();

        let rows = raw_rows
            .into_iter()
            .zip(parsed)
            .map(|(raw, typed)| {
                raw.into_iter()
                    .zip(typed)
                    .zip(types.iter())
                    .map(|((original, parsed), ty)| ty.materialize(original, parsed))
                    .collect()
            })
            .collect();

        Self { columns, types, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn types(&self) -> &[ColumnType] {
        &self.types
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Estimated in-memory footprint in bytes.
    pub fn memory_usage(&self) -> u64 {
        let n = self.rows.len() as u64;
        let columns: u64 = self
            .types
            .iter()
            .enumerate()
            .map(|(idx, ty)| match ty {
                ColumnType::Int64 | ColumnType::Float64 => 8 * n,
                ColumnType::Bool => n,
                ColumnType::Object => self.column(idx).map(|c| 8 + c.boxed_size()).sum(),
            })
            .sum();
        INDEX_BYTES + columns
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(name, cell)| (name.clone(), cell.to_json()))
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}

/// Rename empty and repeated header names: an empty name at position `i`
/// becomes `Unnamed: i`, repeats become `name.1`, `name.2`, ... A suffixed
/// name that is already taken gets suffixed again (`a.1` -> `a.1.1`), so the
/// result never repeats.
pub fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(raw.len());

    for (idx, name) in raw.into_iter().enumerate() {
        let mut name = if name.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            name
        };

        let mut seen = counts.get(&name).copied().unwrap_or(0);
        while seen > 0 {
            counts.insert(name.clone(), seen + 1);
            name = format!("{}.{}", name, seen);
            seen = counts.get(&name).copied().unwrap_or(0);
        }
        counts.insert(name.clone(), 1);
        out.push(name);
    }

    out
}

/// Streams a CSV file in chunks of at most `chunk_rows` rows.
pub struct CsvChunkReader {
    reader: csv::Reader<File>,
    columns: Vec<String>,
    chunk_rows: usize,
    line: usize,
    done: bool,
}

impl CsvChunkReader {
    pub fn open(path: &Path, chunk_rows: usize) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        if header.is_empty() {
            return Err(DatasetError::Parse("No columns to parse from file".to_string()));
        }
        let columns = dedupe_headers(header.iter().map(|h| h.to_string()).collect());

        Ok(Self {
            reader,
            columns,
            chunk_rows: chunk_rows.max(1),
            line: 1,
            done: false,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.done {
            return Ok(None);
        }

        let width = self.columns.len();
        let mut record = StringRecord::new();
        let mut rows = Vec::with_capacity(self.chunk_rows.min(1024));

        while rows.len() < self.chunk_rows {
            if !self.reader.read_record(&mut record)? {
                self.done = true;
                break;
            }
            self.line += 1;

            if record.len() > width {
                return Err(DatasetError::Parse(format!(
                    "Expected {} fields in line {}, saw {}",
                    width,
                    self.line,
                    record.len()
                )));
            }

            let mut row: Vec<Cell> = record.iter().map(Cell::from_raw).collect();
            row.resize(width, Cell::Null);
            rows.push(row);
        }

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(Chunk::from_rows(self.columns.clone(), rows)))
    }
}

impl Iterator for CsvChunkReader {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn first_sheet(path: &Path) -> Result<calamine::Range<Data>> {
    let mut workbook = open_workbook_auto(path)?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DatasetError::Parse("Workbook has no worksheets".to_string()))?
        .map_err(DatasetError::from)
}

fn excel_header(row: &[Data]) -> Vec<String> {
    let names = row
        .iter()
        .map(|cell| match cell {
            Data::Empty => String::new(),
            Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            other => other.to_string(),
        })
        .collect();
    dedupe_headers(names)
}

/// Read the first sheet of a workbook as one chunk, optionally keeping only
/// the first `limit` data rows.
pub fn read_excel(path: &Path, limit: Option<usize>) -> Result<Chunk> {
    let range = first_sheet(path)?;
    let mut rows = range.rows();

    let columns = match rows.next() {
        Some(header) => excel_header(header),
        None => return Err(DatasetError::Parse("No columns to parse from file".to_string())),
    };
    let width = columns.len();

    let raw_rows: Vec<Vec<Cell>> = rows
        .take(limit.unwrap_or(usize::MAX))
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().take(width).map(Cell::from_excel).collect();
            cells.resize(width, Cell::Null);
            cells
        })
        .collect();

    Ok(Chunk::from_rows(columns, raw_rows))
}

/// Column names from the header row only; no data rows are read.
pub fn read_header(path: &Path, format: DatasetFormat) -> Result<Vec<String>> {
    match format {
        DatasetFormat::Csv => Ok(CsvChunkReader::open(path, 1)?.columns().to_vec()),
        DatasetFormat::Excel => {
            let range = first_sheet(path)?;
            let header = range
                .rows()
                .next()
                .ok_or_else(|| DatasetError::Parse("No columns to parse from file".to_string()))?;
            Ok(excel_header(header))
        }
    }
}

/// The first `n_rows` data rows as a single typed chunk.
pub fn read_head(path: &Path, format: DatasetFormat, n_rows: usize) -> Result<Chunk> {
    match format {
        DatasetFormat::Csv => {
            let mut reader = CsvChunkReader::open(path, n_rows.max(1))?;
            if n_rows == 0 {
                return Ok(Chunk::empty(reader.columns().to_vec()));
            }
            let columns = reader.columns().to_vec();
            Ok(reader.next_chunk()?.unwrap_or_else(|| Chunk::empty(columns)))
        }
        DatasetFormat::Excel => read_excel(path, Some(n_rows)),
    }
}
