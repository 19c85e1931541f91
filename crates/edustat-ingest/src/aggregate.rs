//! Per-school summaries and rankings.
//!
//! [`compute_summaries`] is pure: scores in, unsaved summaries out.
//! [`recompute_summaries`] gathers the scores of a scope from storage, plus
//! any records about to be written alongside the summaries.

use edustat_core::{
  performance::{NewPerformanceRecord, NewSummary, PerformanceRecord, Scope},
  store::PerformanceStore,
};
use tracing::debug;

/// The values of one record that feed a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scores {
  pub average_score:   i64,
  pub pass_rate:       i64,
  pub attendance_rate: Option<i64>,
}

impl From<&PerformanceRecord> for Scores {
  fn from(r: &PerformanceRecord) -> Self {
    Self { average_score: r.average_score, pass_rate: r.pass_rate, attendance_rate: r.attendance_rate }
  }
}

impl From<&NewPerformanceRecord> for Scores {
  fn from(r: &NewPerformanceRecord) -> Self {
    Self { average_score: r.average_score, pass_rate: r.pass_rate, attendance_rate: r.attendance_rate }
  }
}

/// Summaries for every school with at least one score, ranked by
/// `overall_average` (highest first, ties keep input order).
pub fn compute_summaries<I>(scope: Scope, groups: I) -> Vec<NewSummary>
where
  I: IntoIterator<Item = (i64, Vec<Scores>)>,
{
  let mut summaries: Vec<NewSummary> = groups
    .into_iter()
    .filter_map(|(school_id, scores)| summarize(scope, school_id, &scores))
    .collect();

  // sort_by is stable
  summaries.sort_by(|a, b| b.overall_average.cmp(&a.overall_average));
  for (position, summary) in summaries.iter_mut().enumerate() {
    summary.ranking = position as i64 + 1;
  }
  summaries
}

fn summarize(scope: Scope, school_id: i64, scores: &[Scores]) -> Option<NewSummary> {
  Some(NewSummary {
    school_id,
    academic_year_id: scope.academic_year_id,
    term_id: scope.term_id,
    overall_average: rounded_mean(scores.iter().map(|s| s.average_score))?,
    success_rate: rounded_mean(scores.iter().map(|s| s.pass_rate))?,
    attendance_rate: rounded_mean(scores.iter().filter_map(|s| s.attendance_rate)),
    improvement_rate: None,
    ranking: 0,
  })
}

/// Mean rounded half up, or `None` for no values.
pub fn rounded_mean(values: impl IntoIterator<Item = i64>) -> Option<i64> {
  let (sum, count) = values
    .into_iter()
    .fold((0i64, 0i64), |(sum, count), v| (sum + v, count + 1));
  (count > 0).then(|| (2 * sum + count).div_euclid(2 * count))
}

/// Compute summaries for `scope` from every stored record and from
/// `pending`, records of the same scope not yet written. Schools are visited
/// in ascending id order.
pub async fn recompute_summaries<S: PerformanceStore>(
  store: &S,
  scope: Scope,
  pending: &[NewPerformanceRecord],
) -> Result<Vec<NewSummary>, S::Error> {
  let schools = store.list_schools().await?;
  let mut groups = Vec::with_capacity(schools.len());
  for school in &schools {
    let stored = store.list_performance_records(school.id, scope).await?;
    let scores: Vec<Scores> = stored
      .iter()
      .map(Scores::from)
      .chain(pending.iter().filter(|r| r.school_id == school.id).map(Scores::from))
      .collect();
    groups.push((school.id, scores));
  }

  let summaries = compute_summaries(scope, groups);
  debug!(%scope, schools = summaries.len(), pending = pending.len(), "recomputed summaries");
  Ok(summaries)
}
