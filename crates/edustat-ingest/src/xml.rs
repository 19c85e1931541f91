//! XML input.
//!
//! Documents are read into a small [`Element`] tree with `quick-xml`. There is
//! no fixed schema, so the record collection is located by trying a list of
//! [`SHAPES`] in order; each record then reads its fields from child elements
//! or attributes by alias.

use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};
use tracing::debug;

use crate::{
  IngestError, Result,
  extract::{RawRecord, RecordSource},
  headers::Field,
};

// ─── Element tree ────────────────────────────────────────────────────────────

/// An XML element with namespace prefixes stripped from every name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
  pub name:       String,
  pub attributes: Vec<(String, String)>,
  pub text:       String,
  pub children:   Vec<Element>,
}

impl Element {
  pub fn children_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Element> {
    self.children.iter().filter(move |c| same_name(&c.name, name))
  }

  pub fn child(&self, name: &str) -> Option<&Element> {
    self.children.iter().find(|c| same_name(&c.name, name))
  }

  /// The non-blank value of `key`, from a child element's text or else an
  /// attribute. Names compare case-insensitively, accented letters included.
  pub fn field(&self, key: &str) -> Option<String> {
    let from_child = self.child(key).map(|c| c.text.as_str());
    let from_attr = || {
      self
        .attributes
        .iter()
        .find(|(k, _)| same_name(k, key))
        .map(|(_, v)| v.as_str())
    };
    [from_child, from_attr()]
      .into_iter()
      .flatten()
      .map(str::trim)
      .find(|v| !v.is_empty())
      .map(str::to_owned)
  }

  /// The value of the first alias that is present.
  pub fn first_field(&self, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| self.field(alias))
  }
}

fn same_name(a: &str, b: &str) -> bool {
  a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Parse a whole document into its root element.
pub fn parse_document(xml: &[u8]) -> Result<Element> {
  let mut reader = Reader::from_reader(xml);
  reader.config_mut().trim_text(true);

  let mut stack: Vec<Element> = Vec::new();
  let mut root: Option<Element> = None;
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) => stack.push(open_element(e)?),
      Ok(Event::Empty(ref e)) => {
        let element = open_element(e)?;
        attach(&mut stack, &mut root, element);
      }
      Ok(Event::End(_)) => {
        if let Some(element) = stack.pop() {
          attach(&mut stack, &mut root, element);
        }
      }
      Ok(Event::Text(ref t)) => {
        if let Some(top) = stack.last_mut() {
          top.text.push_str(&t.unescape().map_err(xml_error)?);
        }
      }
      Ok(Event::CData(ref c)) => {
        if let Some(top) = stack.last_mut() {
          top.text.push_str(&String::from_utf8_lossy(c));
        }
      }
      Ok(Event::Eof) => break,
      Err(e) => return Err(xml_error(e)),
      _ => {}
    }
    buf.clear();
  }

  if !stack.is_empty() {
    return Err(IngestError::Xml("unexpected end of document".into()));
  }
  root.ok_or_else(|| IngestError::Xml("document has no root element".into()))
}

fn open_element(start: &BytesStart<'_>) -> Result<Element> {
  let name = start.name();
  let mut element = Element {
    name: String::from_utf8_lossy(local_name(name.as_ref())).into_owned(),
    ..Element::default()
  };
  for attr in start.attributes() {
    let attr = attr.map_err(xml_error)?;
    let key = attr.key.as_ref();
    if key.starts_with(b"xmlns") {
      continue;
    }
    let value = attr.unescape_value().map_err(xml_error)?;
    element
      .attributes
      .push((String::from_utf8_lossy(local_name(key)).into_owned(), value.into_owned()));
  }
  Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
  match stack.last_mut() {
    Some(parent) => parent.children.push(element),
    None => {
      if root.is_none() {
        *root = Some(element);
      }
    }
  }
}

fn local_name(name: &[u8]) -> &[u8] {
  // strip "prefix:" if present
  match name.iter().rposition(|&b| b == b':') {
    Some(pos) => &name[pos + 1..],
    None => name,
  }
}

fn xml_error(err: impl std::fmt::Display) -> IngestError { IngestError::Xml(err.to_string()) }

// ─── Record shapes ───────────────────────────────────────────────────────────

/// Locates the repeating record elements of a document, if it has this shape.
pub type ShapeMatcher = fn(&Element) -> Option<Vec<&Element>>;

/// Known document shapes, most specific first.
pub const SHAPES: &[(&str, ShapeMatcher)] = &[
  ("performances/performance", performances),
  ("records/record", records),
  ("repeated children", repeated_children),
  ("nested repeated children", nested_repeated_children),
];

/// `<performances><performance/>…</performances>`, at the root or one level
/// below it. A single `<performance>` counts.
pub fn performances(doc: &Element) -> Option<Vec<&Element>> {
  named_collection(doc, "performances", "performance")
}

/// `<records><record/>…</records>`, at the root or one level below it.
pub fn records(doc: &Element) -> Option<Vec<&Element>> { named_collection(doc, "records", "record") }

/// Two or more root children sharing one tag, each carrying data.
pub fn repeated_children(doc: &Element) -> Option<Vec<&Element>> {
  let first = doc.children.first()?;
  let uniform = doc.children.len() >= 2
    && doc
      .children
      .iter()
      .all(|c| c.name == first.name && (!c.children.is_empty() || !c.attributes.is_empty()));
  uniform.then(|| doc.children.iter().collect())
}

/// [`repeated_children`] applied to each child of the root in turn.
pub fn nested_repeated_children(doc: &Element) -> Option<Vec<&Element>> {
  doc.children.iter().find_map(repeated_children)
}

fn named_collection<'a>(doc: &'a Element, container: &str, item: &str) -> Option<Vec<&'a Element>> {
  let container = if same_name(&doc.name, container) {
    doc
  } else {
    doc.child(container)?
  };
  let items: Vec<_> = container.children_named(item).collect();
  (!items.is_empty()).then_some(items)
}

/// The record elements of `doc`, from the first shape that matches.
pub fn find_records(doc: &Element) -> Option<Vec<&Element>> {
  SHAPES.iter().find_map(|(shape, matcher)| {
    let found = matcher(doc)?;
    debug!(shape, count = found.len(), "matched xml record shape");
    Some(found)
  })
}

// ─── Field aliases ───────────────────────────────────────────────────────────

const SCHOOL: &[&str] = &["school", "schoolName", "school_name", "etablissement", "NOM_ETABA", "ecole"];
const SUBJECT: &[&str] = &["subject", "subjectName", "subject_name", "matiere"];
const AVERAGE_SCORE: &[&str] = &["averageScore", "average_score", "score", "moyenne", "MoyenneSession"];
const PASS_RATE: &[&str] = &["passRate", "pass_rate", "successRate", "taux_reussite", "Note"];
const ATTENDANCE_RATE: &[&str] = &["attendanceRate", "attendance_rate", "attendance"];

fn xml_aliases(field: Field) -> &'static [&'static str] {
  match field {
    Field::School => SCHOOL,
    Field::Subject => SUBJECT,
    Field::AverageScore => AVERAGE_SCORE,
    Field::PassRate => PASS_RATE,
    Field::AttendanceRate => ATTENDANCE_RATE,
  }
}

impl Element {
  /// The value of `field`: XML-style names first, then the spreadsheet
  /// header names with spaces written as `_`.
  pub fn field_value(&self, field: Field) -> Option<String> {
    self.first_field(xml_aliases(field)).or_else(|| {
      field
        .aliases()
        .iter()
        .find_map(|alias| self.field(&alias.replace(' ', "_")))
    })
  }
}

impl RecordSource for Element {
  /// Elements carrying none of the known fields are skipped; labels keep the
  /// element's position in the collection.
  fn raw_records(&self) -> Result<Vec<RawRecord>> {
    let found = find_records(self).ok_or(IngestError::NoPerformanceData)?;
    let records: Vec<RawRecord> = found
      .into_iter()
      .enumerate()
      .map(|(i, el)| RawRecord {
        label:           format!("XML record {}", i + 1),
        school:          el.field_value(Field::School),
        subject:         el.field_value(Field::Subject),
        average_score:   el.field_value(Field::AverageScore),
        pass_rate:       el.field_value(Field::PassRate),
        attendance_rate: el.field_value(Field::AttendanceRate),
      })
      .filter(has_any_field)
      .collect();

    if records.is_empty() {
      return Err(IngestError::NoPerformanceData);
    }
    Ok(records)
  }
}

fn has_any_field(raw: &RawRecord) -> bool {
  [&raw.school, &raw.subject, &raw.average_score, &raw.pass_rate, &raw.attendance_rate]
    .iter()
    .any(|v| v.is_some())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(xml: &str) -> Element { parse_document(xml.as_bytes()).unwrap() }

  #[test]
  fn builds_a_tree_without_prefixes() {
    let doc = parse(r#"<?xml version="1.0"?><ns:root xmlns:ns="urn:x"><ns:a k="v &amp; w">hi</ns:a><b/></ns:root>"#);
    assert_eq!(doc.name, "root");
    assert_eq!(doc.children.len(), 2);
    assert_eq!(doc.children[0].name, "a");
    assert_eq!(doc.children[0].text, "hi");
    assert_eq!(doc.children[0].attributes, vec![("k".to_string(), "v & w".to_string())]);
  }

  #[test]
  fn malformed_documents_are_xml_errors() {
    assert!(matches!(parse_document(b"<a><b></a>"), Err(IngestError::Xml(_))));
    assert!(matches!(parse_document(b"<a><b>"), Err(IngestError::Xml(_))));
    assert!(matches!(parse_document(b""), Err(IngestError::Xml(_))));
  }

  #[test]
  fn performances_shape_with_a_single_record() {
    let doc = parse(
      "<performances><performance><school>A</school><subject>M</subject>\
       <averageScore>80</averageScore><passRate>70</passRate></performance></performances>",
    );
    assert_eq!(performances(&doc).map(|r| r.len()), Some(1));
    assert_eq!(find_records(&doc).unwrap()[0].field("school").as_deref(), Some("A"));
  }

  #[test]
  fn records_shape_below_the_root() {
    let doc = parse("<export><records><record/><record/></records></export>");
    assert!(performances(&doc).is_none());
    assert_eq!(records(&doc).map(|r| r.len()), Some(2));
  }

  #[test]
  fn repeated_children_need_data() {
    let doc = parse("<data><row school=\"A\"/><row school=\"B\"/></data>");
    assert_eq!(repeated_children(&doc).map(|r| r.len()), Some(2));

    let bare = parse("<data><row/><row/></data>");
    assert!(repeated_children(&bare).is_none());

    let mixed = parse("<data><row a=\"1\"/><other a=\"2\"/></data>");
    assert!(repeated_children(&mixed).is_none());
  }

  #[test]
  fn nested_repeated_children_one_level_down() {
    let doc = parse("<root><meta/><items><item a=\"1\"/><item a=\"2\"/><item a=\"3\"/></items></root>");
    assert!(repeated_children(&doc).is_none());
    assert_eq!(find_records(&doc).map(|r| r.len()), Some(3));
  }

  #[test]
  fn unknown_shape_has_no_records() {
    let doc = parse("<report><title>Results</title></report>");
    assert!(find_records(&doc).is_none());
    assert!(matches!(doc.raw_records(), Err(IngestError::NoPerformanceData)));
  }

  #[test]
  fn fields_come_from_children_or_attributes_by_alias() {
    let doc = parse(
      r#"<records>
           <record NOM_ETABA="Lycée X" matiere="Maths">
             <MoyenneSession>12,5</MoyenneSession>
             <Note> 0.8 </Note>
             <attendance></attendance>
           </record>
         </records>"#,
    );
    let raw = doc.raw_records().unwrap();
    assert_eq!(
      raw,
      vec![RawRecord {
        label:           "XML record 1".into(),
        school:          Some("Lycée X".into()),
        subject:         Some("Maths".into()),
        average_score:   Some("12,5".into()),
        pass_rate:       Some("0.8".into()),
        attendance_rate: None,
      }]
    );
  }

  #[test]
  fn empty_elements_are_not_records() {
    let doc = parse("<performances><performance/></performances>");
    assert!(matches!(doc.raw_records(), Err(IngestError::NoPerformanceData)));

    let doc = parse("<records><record/><record><school>A</school></record></records>");
    let raw = doc.raw_records().unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].label, "XML record 2");
  }

  #[test]
  fn header_names_work_as_tags() {
    let doc = parse(
      "<records><record>\
         <École>Lycée X</École><المادة>رياضيات</المادة>\
         <Average_Score>80</Average_Score><نسبة_النجاح>70</نسبة_النجاح>\
       </record></records>",
    );
    let raw = doc.raw_records().unwrap();
    assert_eq!(raw[0].school.as_deref(), Some("Lycée X"));
    assert_eq!(raw[0].subject.as_deref(), Some("رياضيات"));
    assert_eq!(raw[0].average_score.as_deref(), Some("80"));
    assert_eq!(raw[0].pass_rate.as_deref(), Some("70"));
  }

  #[test]
  fn accented_names_ignore_case() {
    let doc = parse("<r><MATIÈRE>Maths</MATIÈRE></r>");
    assert_eq!(doc.field("matière").as_deref(), Some("Maths"));
  }

  #[test]
  fn earlier_alias_wins() {
    let doc = parse("<r><school>First</school><schoolName>Second</schoolName></r>");
    assert_eq!(doc.first_field(SCHOOL).as_deref(), Some("First"));
  }
}
