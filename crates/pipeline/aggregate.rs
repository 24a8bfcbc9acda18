//! Named aggregators and the per-metric tables built from them.
//!
//! Null policy, shared by everything here:
//! - a rate over zero students is `None`;
//! - a mean over zero non-null values is `None`;
//! - nulls never become a category, bucket or zero.

use crate::error::PipelineError;
use crate::record::StudentRecord;
use crate::table::{StudentTable, Subset};
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;

/// Number of students in the subset.
pub fn count(subset: &Subset) -> usize {
    subset.len()
}

pub fn dropout_count(subset: &Subset) -> usize {
    subset.dropout_count()
}

/// `dropouts / students * 100`, undefined for an empty denominator.
pub fn rate(dropouts: usize, students: usize) -> Option<f64> {
    if students == 0 {
        None
    } else {
        Some(dropouts as f64 / students as f64 * 100.0)
    }
}

/// Mean of the non-null values; `None` when there are none.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Mean of `value` over the rows matching `predicate`.
pub fn conditional_mean<V, P>(subset: &Subset, value: V, predicate: P) -> Option<f64>
where
    V: Fn(&StudentRecord) -> Option<f64>,
    P: Fn(&StudentRecord) -> bool,
{
    mean(subset.iter().filter(|r| predicate(*r)).map(|r| value(r)))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DropoutRate {
    pub students: usize,
    pub dropouts: usize,
    pub rate: Option<f64>,
}

impl DropoutRate {
    pub fn of(subset: &Subset) -> Self {
        let students = count(subset);
        let dropouts = dropout_count(subset);
        DropoutRate {
            students,
            dropouts,
            rate: rate(dropouts, students),
        }
    }

    /// Like [`DropoutRate::of`] but refuses an empty subset.
    pub fn require(subset: &Subset, scope: &str) -> Result<Self, PipelineError> {
        if subset.is_empty() {
            return Err(PipelineError::EmptyDataset(scope.to_string()));
        }
        Ok(Self::of(subset))
    }
}

/// Rate over the whole loaded table.
pub fn institution_rate(table: &StudentTable) -> Result<DropoutRate, PipelineError> {
    DropoutRate::require(&table.all(), "the loaded dataset")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseDropout {
    pub course: String,
    pub students: usize,
    pub dropouts: usize,
    pub rate: Option<f64>,
}

/// One row per course of a modality-filtered subset, sorted by course.
pub fn per_course(subset: &Subset) -> Vec<CourseDropout> {
    subset
        .group_by(|r| r.course.as_str())
        .into_iter()
        .map(|(course, group)| {
            let DropoutRate {
                students,
                dropouts,
                rate,
            } = DropoutRate::of(&group);
            CourseDropout {
                course: course.to_string(),
                students,
                dropouts,
                rate,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseAcademicIndex {
    pub course: String,
    pub dropout_mean: Option<f64>,
    pub non_dropout_mean: Option<f64>,
}

pub fn per_course_academic_index(subset: &Subset) -> Vec<CourseAcademicIndex> {
    subset
        .group_by(|r| r.course.as_str())
        .into_iter()
        .map(|(course, group)| CourseAcademicIndex {
            course: course.to_string(),
            dropout_mean: conditional_mean(&group, |r| r.ira, StudentRecord::is_dropout),
            non_dropout_mean: conditional_mean(&group, |r| r.ira, |r| !r.is_dropout()),
        })
        .collect()
}

/// Mean `ira` of every student in `subset`.
pub fn academic_index_mean(subset: &Subset) -> Option<f64> {
    mean(subset.iter().map(|r| r.ira))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtremalCourses {
    pub max: CourseDropout,
    pub min: CourseDropout,
}

/// Highest and lowest dropout rate. Ties go to the alphabetically first
/// course on both ends; courses with an undefined rate are not ranked.
pub fn extremal_courses(courses: &[CourseDropout]) -> Result<ExtremalCourses, PipelineError> {
    let ranked: Vec<(&CourseDropout, f64)> = courses
        .iter()
        .filter_map(|c| c.rate.map(|rate| (c, rate)))
        .collect();

    let by_name = |a: &CourseDropout, b: &CourseDropout| a.course.cmp(&b.course);
    let max = ranked
        .iter()
        .min_by(|(a, ra), (b, rb)| rb.total_cmp(ra).then_with(|| by_name(*a, *b)));
    let min = ranked
        .iter()
        .min_by(|(a, ra), (b, rb)| ra.total_cmp(rb).then_with(|| by_name(*a, *b)));

    match (max, min) {
        (Some(&(max, _)), Some(&(min, _))) => {
            debug!("max dropout course: {}, min: {}", max.course, min.course);
            Ok(ExtremalCourses {
                max: max.clone(),
                min: min.clone(),
            })
        }
        _ => Err(PipelineError::EmptyAggregate(format!(
            "{} courses",
            courses.len()
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Gender,
    Race,
    SelectiveAccess,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Gender, Category::Race, Category::SelectiveAccess];

    pub fn value<'r>(&self, record: &'r StudentRecord) -> Option<&'r str> {
        match self {
            Category::Gender => record.gender.as_deref(),
            Category::Race => record.race.as_deref(),
            Category::SelectiveAccess => record.selective_access.as_deref(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Gender => "gender",
            Category::Race => "race",
            Category::SelectiveAccess => "selective_access",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub category: Category,
    /// largest slice first, ties by value
    pub counts: Vec<CategoryCount>,
    /// rows whose value was missing
    pub excluded: usize,
}

impl Breakdown {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| c.count).sum()
    }
}

pub fn categorical_breakdown(subset: &Subset, category: Category) -> Breakdown {
    let excluded = subset
        .iter()
        .filter(|r| category.value(r).is_none())
        .count();
    let mut counts: Vec<CategoryCount> = subset
        .filter(|r| category.value(r).is_some())
        .group_by(|r| category.value(r).unwrap_or_default())
        .into_iter()
        .map(|(value, group)| CategoryCount {
            value: value.to_string(),
            count: group.len(),
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    Breakdown {
        category,
        counts,
        excluded,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket<T> {
    pub value: T,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Distributions {
    /// one bucket per distinct failure count, ascending
    pub failures: Vec<Bucket<i64>>,
    /// one bucket per distinct attendance value, ascending
    pub attendance: Vec<Bucket<f64>>,
}

/// Point-mass counts over the dropouts of one course. An empty subset gives
/// empty tables.
pub fn failure_and_attendance_distributions(subset: &Subset) -> Distributions {
    let mut failures: Vec<i64> = subset.iter().filter_map(|r| r.failures).collect();
    failures.sort_unstable();
    let mut attendance: Vec<f64> = subset.iter().filter_map(|r| r.attendance).collect();
    attendance.sort_by(f64::total_cmp);

    Distributions {
        failures: point_masses(&failures, |a, b| a.cmp(b)),
        attendance: point_masses(&attendance, f64::total_cmp),
    }
}

fn point_masses<T, C>(sorted: &[T], cmp: C) -> Vec<Bucket<T>>
where
    T: Copy,
    C: Fn(&T, &T) -> Ordering,
{
    let mut buckets: Vec<Bucket<T>> = vec![];
    for v in sorted {
        match buckets.last_mut() {
            Some(last) if cmp(&last.value, v) == Ordering::Equal => last.count += 1,
            _ => buckets.push(Bucket {
                value: *v,
                count: 1,
            }),
        }
    }
    buckets
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseIncome {
    pub course: String,
    pub mean_income: Option<f64>,
}

/// Mean gross income per course over a dropout subset. Only courses with at
/// least one row in `dropouts` appear.
pub fn income_average_by_course(dropouts: &Subset) -> Vec<CourseIncome> {
    dropouts
        .group_by(|r| r.course.as_str())
        .into_iter()
        .map(|(course, group)| CourseIncome {
            course: course.to_string(),
            mean_income: mean(group.iter().map(|r| r.gross_income)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::student;

    fn four_students() -> StudentTable {
        StudentTable::new(vec![
            student("1", "Presencial", "A", true),
            student("2", "Presencial", "A", false),
            student("3", "Presencial", "B", false),
            student("4", "Presencial", "B", false),
        ])
    }

    fn course(name: &str, students: usize, dropouts: usize) -> CourseDropout {
        CourseDropout {
            course: name.to_string(),
            students,
            dropouts,
            rate: rate(dropouts, students),
        }
    }

    #[test]
    fn rate_and_mean_null_policy() {
        assert_eq!(rate(0, 0), None);
        assert_eq!(rate(1, 4), Some(25.0));
        assert_eq!(mean(Vec::<Option<f64>>::new()), None);
        assert_eq!(mean(vec![None, None]), None);
        assert_eq!(mean(vec![Some(2.0), None, Some(4.0)]), Some(3.0));
    }

    #[test]
    fn four_student_example() {
        let table = four_students();
        let institution = institution_rate(&table).unwrap();
        assert_eq!(institution.students, 4);
        assert_eq!(institution.dropouts, 1);
        assert_eq!(institution.rate, Some(25.0));

        let modality = table.all().filter_by_modality("Presencial");
        assert_eq!(DropoutRate::of(&modality).rate, Some(25.0));

        let courses = per_course(&modality);
        assert_eq!(courses, vec![course("A", 2, 1), course("B", 2, 0)]);
        assert_eq!(courses[0].rate, Some(50.0));
        assert_eq!(courses[1].rate, Some(0.0));

        let extremes = extremal_courses(&courses).unwrap();
        assert_eq!(extremes.max.course, "A");
        assert_eq!(extremes.min.course, "B");
    }

    #[test]
    fn empty_table_has_no_institution_rate() {
        let table = StudentTable::default();
        assert!(matches!(
            institution_rate(&table),
            Err(PipelineError::EmptyDataset(_))
        ));
    }

    #[test]
    fn rates_stay_within_bounds() {
        let table = four_students();
        for c in per_course(&table.all()) {
            let r = c.rate.unwrap();
            assert!((0.0..=100.0).contains(&r));
            assert_eq!(r, c.dropouts as f64 / c.students as f64 * 100.0);
        }
    }

    #[test]
    fn extremal_single_course_is_both_ends() {
        let courses = vec![course("A", 3, 1)];
        let extremes = extremal_courses(&courses).unwrap();
        assert_eq!(extremes.max, extremes.min);
        assert_eq!(extremes.max.course, "A");
    }

    #[test]
    fn extremal_ties_pick_first_by_name() {
        let courses = vec![
            course("C", 2, 1),
            course("B", 4, 2),
            course("D", 1, 0),
            course("A", 3, 0),
        ];
        let extremes = extremal_courses(&courses).unwrap();
        assert_eq!(extremes.max.course, "B");
        assert_eq!(extremes.min.course, "A");
    }

    #[test]
    fn extremal_empty_aggregate_fails() {
        assert!(matches!(
            extremal_courses(&[]),
            Err(PipelineError::EmptyAggregate(_))
        ));
    }

    #[test]
    fn academic_index_of_course_without_dropouts_is_none() {
        let table = StudentTable::new(vec![
            student("1", "Presencial", "A", true).with_ira(Some(4.0)),
            student("2", "Presencial", "A", false).with_ira(Some(8.0)),
            student("3", "Presencial", "A", false).with_ira(Some(6.0)),
            student("4", "Presencial", "B", false).with_ira(Some(7.0)),
        ]);
        let rows = per_course_academic_index(&table.all());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].dropout_mean, Some(4.0));
        assert_eq!(rows[0].non_dropout_mean, Some(7.0));
        assert_eq!(rows[1].course, "B");
        assert_eq!(rows[1].dropout_mean, None);
        assert_eq!(rows[1].non_dropout_mean, Some(7.0));
        assert_eq!(academic_index_mean(&table.all()), Some(6.25));
    }

    #[test]
    fn selective_access_breakdown_excludes_nulls() {
        let table = StudentTable::new(vec![
            student("1", "P", "A", true).with_selective_access(Some("Cotas".into())),
            student("2", "P", "A", true).with_selective_access(Some("Cotas".into())),
            student("3", "P", "A", true),
            student("4", "P", "A", true).with_selective_access(Some("Ampla".into())),
        ]);
        let dropouts = table.all().dropouts();
        let b = categorical_breakdown(&dropouts, Category::SelectiveAccess);
        assert_eq!(
            b.counts,
            vec![
                CategoryCount {
                    value: "Cotas".into(),
                    count: 2
                },
                CategoryCount {
                    value: "Ampla".into(),
                    count: 1
                },
            ]
        );
        assert_eq!(b.excluded, 1);
        assert_eq!(b.total(), dropouts.len() - b.excluded);
    }

    #[test]
    fn gender_breakdown_orders_ties_by_value() {
        let table = StudentTable::new(vec![
            student("1", "P", "A", true).with_gender(Some("M".into())),
            student("2", "P", "A", true).with_gender(Some("F".into())),
        ]);
        let b = categorical_breakdown(&table.all(), Category::Gender);
        let values: Vec<&str> = b.counts.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["F", "M"]);
        assert_eq!(b.excluded, 0);
    }

    #[test]
    fn distributions_are_point_masses() {
        let table = StudentTable::new(vec![
            student("1", "P", "A", true)
                .with_failures(Some(2))
                .with_attendance(Some(75.0)),
            student("2", "P", "A", true)
                .with_failures(Some(0))
                .with_attendance(Some(75.0)),
            student("3", "P", "A", true)
                .with_failures(Some(2))
                .with_attendance(Some(40.5)),
            student("4", "P", "A", true),
        ]);
        let d = failure_and_attendance_distributions(&table.all());
        assert_eq!(
            d.failures,
            vec![Bucket { value: 0, count: 1 }, Bucket { value: 2, count: 2 }]
        );
        assert_eq!(
            d.attendance,
            vec![
                Bucket {
                    value: 40.5,
                    count: 1
                },
                Bucket {
                    value: 75.0,
                    count: 2
                }
            ]
        );
    }

    #[test]
    fn distributions_of_empty_subset_are_empty() {
        let table = four_students();
        let none = table.all().filter_by_course("B").dropouts();
        assert_eq!(
            failure_and_attendance_distributions(&none),
            Distributions::default()
        );
    }

    #[test]
    fn income_mean_ignores_nulls_and_courses_without_dropouts() {
        let table = StudentTable::new(vec![
            student("1", "P", "A", true).with_gross_income(Some(1000.0)),
            student("2", "P", "A", true),
            student("3", "P", "A", true).with_gross_income(Some(2000.0)),
            student("4", "P", "B", false).with_gross_income(Some(500.0)),
            student("5", "P", "C", true),
        ]);
        let incomes = income_average_by_course(&table.all().dropouts());
        assert_eq!(
            incomes,
            vec![
                CourseIncome {
                    course: "A".into(),
                    mean_income: Some(1500.0)
                },
                CourseIncome {
                    course: "C".into(),
                    mean_income: None
                },
            ]
        );
    }
}
