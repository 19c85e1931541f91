//! Mapping spreadsheet header rows onto the fields a performance record needs.
//!
//! Uploaded sheets come from many sources and name their columns in English,
//! French or Arabic, with or without accents, sometimes with export codes such
//! as `NOM_ETABA`. Each [`Field`] carries an ordered alias list; the first
//! alias that matches any header wins.

use tracing::debug;

use crate::{IngestError, Result};

/// A logical column of a performance sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  School,
  Subject,
  AverageScore,
  PassRate,
  AttendanceRate,
}

impl Field {
  /// Fields without which no row can be read.
  pub const REQUIRED: [Field; 4] =
    [Field::School, Field::Subject, Field::AverageScore, Field::PassRate];

  /// Name used in error messages.
  pub fn label(self) -> &'static str {
    match self {
      Field::School         => "School",
      Field::Subject        => "Subject",
      Field::AverageScore   => "Average Score",
      Field::PassRate       => "Pass Rate",
      Field::AttendanceRate => "Attendance Rate",
    }
  }

  /// Header aliases in priority order.
  pub fn aliases(self) -> &'static [&'static str] {
    match self {
      Field::School => &[
        "School",
        "École",
        "Ecole",
        "Etablissement",
        "NOM_ETABA",
        "NOM_ETAB",
        "اسم المؤسسة",
        "المؤسسة",
        "المدرسة",
      ],
      Field::Subject => &["Subject", "Matière", "Matiere", "المادة"],
      Field::AverageScore => &["Average Score", "Moyenne", "MoyenneSession", "Score", "المعدل"],
      Field::PassRate => &[
        "Pass Rate",
        "Taux de réussite",
        "Réussite",
        "Reussite",
        "Note",
        "نسبة النجاح",
      ],
      Field::AttendanceRate => &[
        "Attendance Rate",
        "Taux de présence",
        "Taux d'assiduité",
        "نسبة الحضور",
      ],
    }
  }
}

/// Find the column for the first candidate that matches any header.
///
/// A header matches a candidate when, ignoring case, they are equal or one
/// contains the other. Blank headers never match.
pub fn resolve_header_index(headers: &[Option<String>], candidates: &[&str]) -> Option<usize> {
  let headers = lowered(headers);
  candidates.iter().find_map(|candidate| {
    let candidate = candidate.to_lowercase();
    headers.iter().position(|header| {
      header.as_deref().is_some_and(|h| {
        h == candidate || h.contains(candidate.as_str()) || candidate.contains(h)
      })
    })
  })
}

/// Like [`resolve_header_index`], but only case-insensitive equality counts.
pub fn resolve_exact_header_index(
  headers: &[Option<String>],
  candidates: &[&str],
) -> Option<usize> {
  let headers = lowered(headers);
  candidates.iter().find_map(|candidate| {
    let candidate = candidate.to_lowercase();
    headers.iter().position(|header| header.as_deref() == Some(candidate.as_str()))
  })
}

fn lowered(headers: &[Option<String>]) -> Vec<Option<String>> {
  headers
    .iter()
    .map(|h| {
      h.as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
    })
    .collect()
}

// ─── Column map ──────────────────────────────────────────────────────────────

/// Column indices of a sheet's header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
  pub school:          usize,
  pub subject:         usize,
  pub average_score:   usize,
  pub pass_rate:       usize,
  pub attendance_rate: Option<usize>,
}

impl ColumnMap {
  /// Resolve every field against `headers`, failing with all missing
  /// required fields at once.
  ///
  /// Each column serves one field at most: a column claimed by an earlier
  /// field is invisible to later ones.
  pub fn resolve(headers: &[Option<String>]) -> Result<Self> {
    let mut open = headers.to_vec();

    let mut missing = Vec::new();
    let mut required = [0usize; 4];
    for (slot, field) in required.iter_mut().zip(Field::REQUIRED) {
      match resolve_header_index(&open, field.aliases()) {
        Some(index) => {
          *slot = index;
          open[index] = None;
        }
        None => missing.push(field.label()),
      }
    }
    if !missing.is_empty() {
      return Err(IngestError::MissingHeaders(missing));
    }

    let [school, subject, average_score, pass_rate] = required;
    let map = Self {
      school,
      subject,
      average_score,
      pass_rate,
      attendance_rate: resolve_exact_header_index(&open, Field::AttendanceRate.aliases()),
    };
    debug!(?map, "resolved header columns");
    Ok(map)
  }
}
