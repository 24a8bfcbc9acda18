use pipeline::aggregate::{Breakdown, Bucket};
use pipeline::DerivedMetrics;

/// 缺失值显示为 "-"，不显示为 0
pub fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

pub fn fmt_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.2}%", r),
        None => "-".to_string(),
    }
}

/// One line of the per-course table, already formatted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseRow {
    pub course: String,
    pub students: String,
    pub dropouts: String,
    pub rate: String,
    pub ira_dropouts: String,
    pub ira_others: String,
    pub income: String,
}

impl CourseRow {
    pub const HEADER: [&'static str; 7] = [
        "curso",
        "alunos",
        "evadidos",
        "taxa de evasão",
        "IRA evadidos",
        "IRA não evadidos",
        "renda bruta média",
    ];

    pub const fn ref_array(&self) -> [&String; 7] {
        [
            &self.course,
            &self.students,
            &self.dropouts,
            &self.rate,
            &self.ira_dropouts,
            &self.ira_others,
            &self.income,
        ]
    }

    pub fn course(&self) -> &str {
        &self.course
    }
}

/// Joins the per-course tables of `metrics` on the course name.
pub fn course_rows(metrics: &DerivedMetrics) -> Vec<CourseRow> {
    metrics
        .courses
        .iter()
        .map(|c| {
            let ira = metrics
                .academic_index
                .iter()
                .find(|a| a.course == c.course);
            let income = metrics
                .income
                .iter()
                .find(|i| i.course == c.course)
                .and_then(|i| i.mean_income);
            CourseRow {
                course: c.course.clone(),
                students: c.students.to_string(),
                dropouts: c.dropouts.to_string(),
                rate: fmt_rate(c.rate),
                ira_dropouts: fmt_opt(ira.and_then(|a| a.dropout_mean)),
                ira_others: fmt_opt(ira.and_then(|a| a.non_dropout_mean)),
                income: fmt_opt(income),
            }
        })
        .collect()
}

pub fn breakdown_lines(breakdown: &Breakdown) -> Vec<String> {
    let total = breakdown.total();
    let mut lines: Vec<String> = breakdown
        .counts
        .iter()
        .map(|c| {
            let share = c.count as f64 / total as f64 * 100.0;
            format!("{}: {} ({:.1}%)", c.value, c.count, share)
        })
        .collect();
    if breakdown.excluded > 0 {
        lines.push(format!("sem informação: {}", breakdown.excluded));
    }
    lines
}

pub fn bucket_lines<T: std::fmt::Display>(buckets: &[Bucket<T>]) -> Vec<String> {
    buckets
        .iter()
        .map(|b| format!("{}: {}", b.value, b.count))
        .collect()
}
