//! Small `.xlsx` workbooks built in memory for tests.

use std::io::{Cursor, Write};

use zip::{CompressionMethod, ZipWriter, write::FileOptions};

#[derive(Debug, Clone, Copy)]
pub enum Cell {
  Text(&'static str),
  Number(f64),
  Blank,
}

/// One worksheet whose first row starts at the zero-based `origin`.
pub struct Worksheet {
  pub name:   &'static str,
  pub origin: (usize, usize),
  pub rows:   Vec<Vec<Cell>>,
}

impl Worksheet {
  pub fn at_a1(name: &'static str, rows: Vec<Vec<Cell>>) -> Self { Self { name, origin: (0, 0), rows } }
}

/// Header row plus one row per school, in the layout the ingest tests share.
pub fn results_rows(rows: &[(&'static str, &'static str, f64, f64)]) -> Vec<Vec<Cell>> {
  let header = ["School", "Subject", "Average Score", "Pass Rate"].map(Cell::Text).to_vec();
  std::iter::once(header)
    .chain(rows.iter().map(|&(school, subject, average, pass)| {
      vec![Cell::Text(school), Cell::Text(subject), Cell::Number(average), Cell::Number(pass)]
    }))
    .collect()
}

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Zip up a workbook holding `sheets` in order.
pub fn xlsx(sheets: &[Worksheet]) -> Vec<u8> {
  let mut strings = Vec::new();
  let sheet_xml: Vec<String> = sheets.iter().map(|s| worksheet_xml(s, &mut strings)).collect();

  let mut parts = vec![
    ("[Content_Types].xml".to_string(), content_types(sheets.len())),
    ("_rels/.rels".to_string(), format!(
      r#"<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    )),
    ("xl/workbook.xml".to_string(), workbook_xml(sheets)),
    ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels(sheets.len())),
    ("xl/sharedStrings.xml".to_string(), shared_strings(&strings)),
  ];
  for (i, xml) in sheet_xml.into_iter().enumerate() {
    parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), xml));
  }

  let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
  let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
  for (name, body) in parts {
    zip.start_file(name, opts).unwrap();
    zip.write_all(body.as_bytes()).unwrap();
  }
  zip.finish().unwrap().into_inner()
}

fn content_types(sheets: usize) -> String {
  let overrides: String = (1..=sheets)
    .map(|i| {
      format!(
        r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
      )
    })
    .collect();
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>{overrides}</Types>"#
  )
}

fn workbook_xml(sheets: &[Worksheet]) -> String {
  let entries: String = sheets
    .iter()
    .enumerate()
    .map(|(i, s)| format!(r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, escape(s.name), i + 1, i + 1))
    .collect();
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>{entries}</sheets></workbook>"#
  )
}

fn workbook_rels(sheets: usize) -> String {
  let mut rels: String = (1..=sheets)
    .map(|i| {
      format!(r#"<Relationship Id="rId{i}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{i}.xml"/>"#)
    })
    .collect();
  rels.push_str(&format!(
    r#"<Relationship Id="rId{}" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/>"#,
    sheets + 1
  ));
  format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#)
}

fn shared_strings(strings: &[&str]) -> String {
  let items: String = strings.iter().map(|s| format!("<si><t>{}</t></si>", escape(s))).collect();
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="{MAIN_NS}" count="{n}" uniqueCount="{n}">{items}</sst>"#,
    n = strings.len()
  )
}

fn worksheet_xml(sheet: &Worksheet, strings: &mut Vec<&'static str>) -> String {
  let (top, left) = sheet.origin;
  let mut rows = String::new();
  for (i, cells) in sheet.rows.iter().enumerate() {
    let row = top + i + 1;
    rows.push_str(&format!(r#"<row r="{row}">"#));
    for (j, cell) in cells.iter().enumerate() {
      let at = format!("{}{row}", column_name(left + j));
      match *cell {
        Cell::Text(text) => {
          let index = strings.iter().position(|s| *s == text).unwrap_or_else(|| {
            strings.push(text);
            strings.len() - 1
          });
          rows.push_str(&format!(r#"<c r="{at}" t="s"><v>{index}</v></c>"#));
        }
        Cell::Number(n) => rows.push_str(&format!(r#"<c r="{at}"><v>{n}</v></c>"#)),
        Cell::Blank => {}
      }
    }
    rows.push_str("</row>");
  }
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NS}"><sheetData>{rows}</sheetData></worksheet>"#
  )
}

/// Spreadsheet column letters for a zero-based index: 0 is `A`, 26 is `AA`.
fn column_name(mut index: usize) -> String {
  let mut name = Vec::new();
  loop {
    name.push(b'A' + (index % 26) as u8);
    if index < 26 {
      break;
    }
    index = index / 26 - 1;
  }
  name.reverse();
  String::from_utf8_lossy(&name).into_owned()
}

fn escape(s: &str) -> String {
  s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

#[test]
fn column_names_carry_past_z() {
  assert_eq!(column_name(0), "A");
  assert_eq!(column_name(1), "B");
  assert_eq!(column_name(25), "Z");
  assert_eq!(column_name(26), "AA");
  assert_eq!(column_name(27), "AB");
}
