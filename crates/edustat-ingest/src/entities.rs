//! Resolve-or-create for schools and subjects.

use edustat_core::{
  entity::{NewSchool, NewSubject, School, Subject, names_match},
  store::PerformanceStore,
};
use tracing::info;

/// The schools and subjects known while one file is being ingested.
///
/// Seeded from storage once per upload; entities created for earlier rows
/// are appended so later rows naming them resolve to the same id.
#[derive(Debug, Clone, Default)]
pub struct EntityCache {
  schools:  Vec<School>,
  subjects: Vec<Subject>,
}

impl EntityCache {
  pub fn new(schools: Vec<School>, subjects: Vec<Subject>) -> Self { Self { schools, subjects } }

  /// Seed the cache with every school and subject in `store`.
  pub async fn load<S: PerformanceStore>(store: &S) -> Result<Self, S::Error> {
    let schools = store.list_schools().await?;
    let subjects = store.list_subjects().await?;
    Ok(Self::new(schools, subjects))
  }

  pub fn schools(&self) -> &[School] { &self.schools }

  pub fn subjects(&self) -> &[Subject] { &self.subjects }

  /// The school named `name` (ignoring case), created if unknown.
  pub async fn resolve_school<S: PerformanceStore>(
    &mut self,
    store: &S,
    name: &str,
  ) -> Result<&School, S::Error> {
    if let Some(index) = self.schools.iter().position(|s| names_match(&s.name, name)) {
      return Ok(&self.schools[index]);
    }

    let school = store.create_school(NewSchool::discovered(name)).await?;
    info!(id = school.id, name = %school.name, "created school");
    let index = self.schools.len();
    self.schools.push(school);
    Ok(&self.schools[index])
  }

  /// The subject named `name` (ignoring case), created with a derived code
  /// if unknown.
  pub async fn resolve_subject<S: PerformanceStore>(
    &mut self,
    store: &S,
    name: &str,
  ) -> Result<&Subject, S::Error> {
    if let Some(index) = self.subjects.iter().position(|s| names_match(&s.name, name)) {
      return Ok(&self.subjects[index]);
    }

    let subject = store.create_subject(NewSubject::discovered(name)).await?;
    info!(id = subject.id, name = %subject.name, code = ?subject.code, "created subject");
    let index = self.subjects.len();
    self.subjects.push(subject);
    Ok(&self.subjects[index])
  }
}
