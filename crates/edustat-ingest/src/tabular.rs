//! Spreadsheet input: `.xlsx`, `.xls`, `.ods` through calamine and `.csv`
//! through the csv crate.
//!
//! Both are flattened into a [`Sheet`] of optional cell texts. The first row
//! is the header row; every later non-empty row is a record.

use std::{io, path::Path};

use calamine::{Data, Reader, open_workbook_auto};

use crate::{
  IngestError, Result,
  extract::{RawRecord, RecordSource},
  headers::ColumnMap,
};

/// One sheet row with its 1-based row number in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
  pub number: usize,
  pub cells:  Vec<Option<String>>,
}

impl Row {
  fn cell(&self, index: usize) -> Option<String> { self.cells.get(index).cloned().flatten() }

  fn is_empty(&self) -> bool { self.cells.iter().all(Option::is_none) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
  rows: Vec<Row>,
}

impl Sheet {
  /// Build a sheet from rows numbered from 1.
  pub fn from_rows<I, R>(rows: I) -> Self
  where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = Option<String>>,
  {
    let rows = rows
      .into_iter()
      .enumerate()
      .map(|(i, cells)| Row { number: i + 1, cells: cells.into_iter().collect() })
      .collect();
    Self { rows }
  }

  pub fn headers(&self) -> &[Option<String>] {
    self.rows.first().map(|r| r.cells.as_slice()).unwrap_or_default()
  }

  /// Rows after the header row, skipping rows with no content.
  pub fn data_rows(&self) -> impl Iterator<Item = &Row> {
    self.rows.iter().skip(1).filter(|r| !r.is_empty())
  }
}

impl RecordSource for Sheet {
  fn raw_records(&self) -> Result<Vec<RawRecord>> {
    let columns = ColumnMap::resolve(self.headers())?;
    Ok(
      self
        .data_rows()
        .map(|row| RawRecord {
          label:           format!("Row {}", row.number),
          school:          row.cell(columns.school),
          subject:         row.cell(columns.subject),
          average_score:   row.cell(columns.average_score),
          pass_rate:       row.cell(columns.pass_rate),
          attendance_rate: columns.attendance_rate.and_then(|i| row.cell(i)),
        })
        .collect(),
    )
  }
}

// ─── Workbooks ───────────────────────────────────────────────────────────────

/// Read the first worksheet of an Excel or OpenDocument workbook.
pub fn read_workbook(path: &Path) -> Result<Sheet> {
  let mut workbook = open_workbook_auto(path).map_err(|e| IngestError::Spreadsheet(e.to_string()))?;
  let name = workbook
    .sheet_names()
    .first()
    .cloned()
    .ok_or(IngestError::NoWorksheet)?;
  let range = workbook
    .worksheet_range(&name)
    .map_err(|e| IngestError::Spreadsheet(e.to_string()))?;

  // Ranges start at the first used cell, not at A1.
  let (first_row, first_col) = range
    .start()
    .map_or((0, 0), |(row, col)| (row as usize, col as usize));

  let rows = range
    .rows()
    .enumerate()
    .map(|(i, cells)| Row {
      number: first_row + i + 1,
      cells:  std::iter::repeat_n(None, first_col)
        .chain(cells.iter().map(cell_text))
        .collect(),
    })
    .collect();
  Ok(Sheet { rows })
}

/// Text of a workbook cell. Whole floats print without a fraction.
fn cell_text(cell: &Data) -> Option<String> {
  match cell {
    Data::Empty | Data::Error(_) => None,
    other => non_blank(&other.to_string()),
  }
}

// ─── CSV ─────────────────────────────────────────────────────────────────────

pub fn read_csv(path: &Path) -> Result<Sheet> {
  let file = std::fs::File::open(path)?;
  read_csv_from(io::BufReader::new(file))
}

/// Read CSV without header inference. Rows may differ in length, and the
/// delimiter is `;` when the header line uses it more than `,`.
pub fn read_csv_from<R: io::Read>(mut input: R) -> Result<Sheet> {
  let mut data = Vec::new();
  input.read_to_end(&mut data)?;

  let mut reader = csv::ReaderBuilder::new()
    .has_headers(false)
    .flexible(true)
    .delimiter(sniff_delimiter(&data))
    .from_reader(data.as_slice());

  let mut rows = Vec::new();
  for (i, record) in reader.records().enumerate() {
    let record = record?;
    let number = record
      .position()
      .map_or(i + 1, |p| line_number_at(&data, p.byte() as usize));
    rows.push(Row { number, cells: record.iter().map(non_blank).collect() });
  }
  Ok(Sheet { rows })
}

/// `;` or `,`, whichever the first non-blank line contains more of.
fn sniff_delimiter(data: &[u8]) -> u8 {
  let header = data
    .split(|&b| b == b'\n')
    .find(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
    .unwrap_or_default();
  let count = |delimiter: u8| header.iter().filter(|&&b| b == delimiter).count();
  if count(b';') > count(b',') { b';' } else { b',' }
}

/// 1-based line of the record starting at `offset`. The reader may report
/// the start of the blank lines it skipped, so those are stepped over first.
fn line_number_at(data: &[u8], offset: usize) -> usize {
  let offset = offset.min(data.len());
  let start = offset
    + data[offset..]
      .iter()
      .take_while(|&&b| b == b'\n' || b == b'\r')
      .count();
  data[..start].iter().filter(|&&b| b == b'\n').count() + 1
}

fn non_blank(s: &str) -> Option<String> {
  let s = s.trim_start_matches('\u{feff}').trim();
  (!s.is_empty()).then(|| s.to_owned())
}
