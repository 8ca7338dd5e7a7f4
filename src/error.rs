use thiserror::Error;

use crate::data::{CourseId, OfferingId, SectionId, TeacherId};

/// Errors surfaced by the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store lock poisoned: {0}")]
    Lock(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised inside a solve, before or beside the solver itself.
///
/// These never escape the engine: `generate_timetable` converts them to the
/// structured failed result.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("offering {offering} references a missing or inactive {entity} (id {id})")]
    DataIntegrity {
        offering: OfferingId,
        entity: &'static str,
        id: u32,
    },

    #[error("duplicate offering for teacher {teacher}, course {course}, section {section}")]
    DuplicateOffering {
        teacher: TeacherId,
        course: CourseId,
        section: SectionId,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
