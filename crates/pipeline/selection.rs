use crate::error::PipelineError;
use crate::table::StudentTable;
use log::debug;
use serde::Serialize;

/// The modality and course currently picked by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub modality: String,
    pub course: String,
}

impl Selection {
    /// Validates a requested selection. A missing modality falls back to the
    /// first one in the file, a missing course to the first course of the
    /// modality.
    pub fn resolve(
        table: &StudentTable,
        modality: Option<&str>,
        course: Option<&str>,
    ) -> Result<Selection, PipelineError> {
        let modalities = table.modalities();
        let modality = match modality {
            Some(m) if modalities.contains(&m) => m,
            Some(m) => return Err(PipelineError::UnknownModality(m.to_string())),
            None => *modalities
                .first()
                .ok_or_else(|| PipelineError::EmptyDataset("the loaded dataset".to_string()))?,
        };

        let courses = table.courses(modality);
        let course = match course {
            Some(c) if courses.contains(&c) => c,
            Some(c) => {
                return Err(PipelineError::UnknownCourse {
                    modality: modality.to_string(),
                    course: c.to_string(),
                })
            }
            // a listed modality always has at least one course
            None => *courses
                .first()
                .ok_or_else(|| PipelineError::EmptyDataset(format!("modality {}", modality)))?,
        };

        Ok(Selection {
            modality: modality.to_string(),
            course: course.to_string(),
        })
    }

    /// Switches modality. The course is kept when the new modality also
    /// offers it, otherwise it resets to the modality's first course.
    pub fn with_modality(
        &self,
        table: &StudentTable,
        modality: &str,
    ) -> Result<Selection, PipelineError> {
        let keep = table.courses(modality).contains(&self.course.as_str());
        let course = keep.then_some(self.course.as_str());
        debug!(
            "modality changed {} -> {}, keep course {}: {}",
            self.modality, modality, self.course, keep
        );
        Selection::resolve(table, Some(modality), course)
    }

    pub fn with_course(&self, table: &StudentTable, course: &str) -> Result<Selection, PipelineError> {
        Selection::resolve(table, Some(&self.modality), Some(course))
    }
}
