use crate::aggregate::{
    academic_index_mean, categorical_breakdown, extremal_courses,
    failure_and_attendance_distributions, income_average_by_course, institution_rate, per_course,
    per_course_academic_index, Breakdown, Category, CourseAcademicIndex, CourseDropout,
    CourseIncome, Distributions, DropoutRate, ExtremalCourses,
};
use crate::error::PipelineError;
use crate::selection::Selection;
use crate::table::StudentTable;
use log::debug;
use serde::Serialize;

/// Names of the metric families handed to a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    InstitutionRate,
    ModalityRate,
    CourseRate,
    CourseRates,
    ExtremalCourses,
    AcademicIndex,
    Breakdown(Category),
    Failures,
    Attendance,
    Income,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::InstitutionRate => "institution_rate",
            Metric::ModalityRate => "modality_rate",
            Metric::CourseRate => "course_rate",
            Metric::CourseRates => "course_rates",
            Metric::ExtremalCourses => "extremal_courses",
            Metric::AcademicIndex => "academic_index",
            Metric::Breakdown(Category::Gender) => "gender",
            Metric::Breakdown(Category::Race) => "race",
            Metric::Breakdown(Category::SelectiveAccess) => "selective_access",
            Metric::Failures => "failures",
            Metric::Attendance => "attendance",
            Metric::Income => "income",
        }
    }
}

/// Everything the dashboard shows for one selection.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedMetrics {
    pub selection: Selection,
    /// course row the renderer should set apart
    pub highlight: String,
    pub institution: DropoutRate,
    pub modality: DropoutRate,
    pub course: DropoutRate,
    /// per course of the selected modality
    pub courses: Vec<CourseDropout>,
    pub extremes: ExtremalCourses,
    pub academic_index: Vec<CourseAcademicIndex>,
    /// reference line, over every loaded student
    pub institution_academic_index: Option<f64>,
    /// gender, race and access method of the selected course's dropouts
    pub breakdowns: Vec<Breakdown>,
    pub distributions: Distributions,
    /// mean gross income of dropouts, per course of the selected modality
    pub income: Vec<CourseIncome>,
}

impl DerivedMetrics {
    pub fn breakdown(&self, category: Category) -> Option<&Breakdown> {
        self.breakdowns.iter().find(|b| b.category == category)
    }
}

/// Recomputes every metric from the immutable table for `selection`.
pub fn recompute(
    table: &StudentTable,
    selection: &Selection,
) -> Result<DerivedMetrics, PipelineError> {
    debug!(
        "recompute for modality {}, course {}",
        selection.modality, selection.course
    );
    let institution = institution_rate(table)?;

    let modality_rows = table.all().filter_by_modality(&selection.modality);
    let modality = DropoutRate::require(
        &modality_rows,
        &format!("modality {}", selection.modality),
    )?;
    let course_rows = modality_rows.filter_by_course(&selection.course);
    let course = DropoutRate::of(&course_rows);
    let course_dropouts = course_rows.dropouts();

    let courses = per_course(&modality_rows);
    let extremes = extremal_courses(&courses)?;

    let breakdowns = Category::ALL
        .iter()
        .map(|c| categorical_breakdown(&course_dropouts, *c))
        .collect();

    Ok(DerivedMetrics {
        selection: selection.clone(),
        highlight: selection.course.clone(),
        institution,
        modality,
        course,
        academic_index: per_course_academic_index(&modality_rows),
        institution_academic_index: academic_index_mean(&table.all()),
        courses,
        extremes,
        breakdowns,
        distributions: failure_and_attendance_distributions(&course_dropouts),
        income: income_average_by_course(&modality_rows.dropouts()),
    })
}
