//! Turns [`DerivedMetrics`] into polars frames, one per metric family.

use pipeline::aggregate::{Breakdown, Bucket, Category, DropoutRate};
use pipeline::metrics::{DerivedMetrics, Metric};
use polars::prelude::*;

fn counts(values: &[usize]) -> Vec<u64> {
    values.iter().map(|v| *v as u64).collect()
}

/// Institution, modality and course rates in one frame.
pub fn kpi_frame(m: &DerivedMetrics) -> PolarsResult<DataFrame> {
    let rows: [(Metric, &str, &DropoutRate); 3] = [
        (Metric::InstitutionRate, "instituição", &m.institution),
        (Metric::ModalityRate, m.selection.modality.as_str(), &m.modality),
        (Metric::CourseRate, m.selection.course.as_str(), &m.course),
    ];
    let students: Vec<usize> = rows.iter().map(|r| r.2.students).collect();
    let dropouts: Vec<usize> = rows.iter().map(|r| r.2.dropouts).collect();
    DataFrame::new(vec![
        Series::new(
            "metrica",
            rows.iter().map(|r| r.0.name()).collect::<Vec<_>>(),
        ),
        Series::new("escopo", rows.iter().map(|r| r.1).collect::<Vec<_>>()),
        Series::new("total_alunos", counts(&students)),
        Series::new("total_evadidos", counts(&dropouts)),
        Series::new(
            "taxa_evasao",
            rows.iter().map(|r| r.2.rate).collect::<Vec<_>>(),
        ),
    ])
}

fn course_rates(m: &DerivedMetrics) -> PolarsResult<DataFrame> {
    let c = &m.courses;
    let students: Vec<usize> = c.iter().map(|r| r.students).collect();
    let dropouts: Vec<usize> = c.iter().map(|r| r.dropouts).collect();
    DataFrame::new(vec![
        Series::new("curso", c.iter().map(|r| r.course.as_str()).collect::<Vec<_>>()),
        Series::new("total_alunos_curso", counts(&students)),
        Series::new("total_evadidos_curso", counts(&dropouts)),
        Series::new("taxa_evasao", c.iter().map(|r| r.rate).collect::<Vec<_>>()),
        Series::new(
            "destaque",
            c.iter().map(|r| r.course == m.highlight).collect::<Vec<_>>(),
        ),
    ])
}

fn extremal_courses(m: &DerivedMetrics) -> PolarsResult<DataFrame> {
    let e = &m.extremes;
    DataFrame::new(vec![
        Series::new("posicao", vec!["maior", "menor"]),
        Series::new("curso", vec![e.max.course.as_str(), e.min.course.as_str()]),
        Series::new("taxa_evasao", vec![e.max.rate, e.min.rate]),
    ])
}

fn academic_index(m: &DerivedMetrics) -> PolarsResult<DataFrame> {
    let a = &m.academic_index;
    DataFrame::new(vec![
        Series::new("curso", a.iter().map(|r| r.course.as_str()).collect::<Vec<_>>()),
        Series::new(
            "ira_medio_evadidos",
            a.iter().map(|r| r.dropout_mean).collect::<Vec<_>>(),
        ),
        Series::new(
            "ira_medio_nao_evadidos",
            a.iter().map(|r| r.non_dropout_mean).collect::<Vec<_>>(),
        ),
        Series::new(
            "ira_medio_instituicao",
            vec![m.institution_academic_index; a.len()],
        ),
        Series::new(
            "destaque",
            a.iter().map(|r| r.course == m.highlight).collect::<Vec<_>>(),
        ),
    ])
}

/// Value column of a breakdown frame, named like the source column.
fn category_column(category: Category) -> &'static str {
    match category {
        Category::Gender => "genero",
        Category::Race => "raca",
        Category::SelectiveAccess => "forma_acesso_seletivo",
    }
}

fn breakdown(b: &Breakdown) -> PolarsResult<DataFrame> {
    let quantities: Vec<usize> = b.counts.iter().map(|c| c.count).collect();
    DataFrame::new(vec![
        Series::new(
            category_column(b.category),
            b.counts.iter().map(|c| c.value.as_str()).collect::<Vec<_>>(),
        ),
        Series::new("quantidade_alunos", counts(&quantities)),
    ])
}

fn failures(buckets: &[Bucket<i64>]) -> PolarsResult<DataFrame> {
    let quantities: Vec<usize> = buckets.iter().map(|b| b.count).collect();
    DataFrame::new(vec![
        Series::new(
            "reprovacoes",
            buckets.iter().map(|b| b.value).collect::<Vec<i64>>(),
        ),
        Series::new("quantidade_alunos", counts(&quantities)),
    ])
}

fn attendance(buckets: &[Bucket<f64>]) -> PolarsResult<DataFrame> {
    let quantities: Vec<usize> = buckets.iter().map(|b| b.count).collect();
    DataFrame::new(vec![
        Series::new(
            "frequencia",
            buckets.iter().map(|b| b.value).collect::<Vec<f64>>(),
        ),
        Series::new("quantidade_alunos", counts(&quantities)),
    ])
}

fn income(m: &DerivedMetrics) -> PolarsResult<DataFrame> {
    let i = &m.income;
    DataFrame::new(vec![
        Series::new("curso", i.iter().map(|r| r.course.as_str()).collect::<Vec<_>>()),
        Series::new(
            "renda_bruta_media",
            i.iter().map(|r| r.mean_income).collect::<Vec<_>>(),
        ),
        Series::new(
            "destaque",
            i.iter().map(|r| r.course == m.highlight).collect::<Vec<_>>(),
        ),
    ])
}

/// Every table-shaped metric, tagged with the metric it holds.
pub fn frames(m: &DerivedMetrics) -> PolarsResult<Vec<(Metric, DataFrame)>> {
    let mut out = vec![
        (Metric::CourseRates, course_rates(m)?),
        (Metric::ExtremalCourses, extremal_courses(m)?),
        (Metric::AcademicIndex, academic_index(m)?),
    ];
    for category in Category::ALL {
        if let Some(b) = m.breakdown(category) {
            out.push((Metric::Breakdown(category), breakdown(b)?));
        }
    }
    out.push((Metric::Failures, failures(&m.distributions.failures)?));
    out.push((Metric::Attendance, attendance(&m.distributions.attendance)?));
    out.push((Metric::Income, income(m)?));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::record::StudentRecord;
    use pipeline::{recompute, Selection, StudentTable};

    fn student(id: &str, course: &str, status: &str, ira: f64) -> StudentRecord {
        StudentRecord::new(
            id.to_string(),
            "Presencial".to_string(),
            course.to_string(),
            status.to_string(),
            "Evasão",
        )
        .with_ira(Some(ira))
        .with_failures(Some(1))
        .with_attendance(Some(50.0))
    }

    fn metrics() -> DerivedMetrics {
        let table = StudentTable::new(vec![
            student("1", "A", "Evasão", 4.0),
            student("2", "A", "Matriculado", 8.0),
            student("3", "B", "Matriculado", 6.0),
            student("4", "B", "Matriculado", 7.0),
        ]);
        let selection = Selection::resolve(&table, None, Some("A")).unwrap();
        recompute(&table, &selection).unwrap()
    }

    #[test]
    fn kpi_frame_has_three_scopes() {
        let df = kpi_frame(&metrics()).unwrap();
        assert_eq!(df.shape(), (3, 5));
        let rates: Vec<Option<f64>> = df
            .column("taxa_evasao")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(rates, vec![Some(25.0), Some(25.0), Some(50.0)]);
    }

    #[test]
    fn every_metric_has_a_frame() {
        let frames = frames(&metrics()).unwrap();
        let names: Vec<&str> = frames.iter().map(|(m, _)| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "course_rates",
                "extremal_courses",
                "academic_index",
                "gender",
                "race",
                "selective_access",
                "failures",
                "attendance",
                "income",
            ]
        );
        let (_, academic) = &frames[2];
        assert_eq!(academic.height(), 2);
        // course B has no dropouts, so its mean stays null
        assert_eq!(academic.column("ira_medio_evadidos").unwrap().null_count(), 1);
        let (_, gender) = &frames[3];
        assert_eq!(gender.height(), 0);
        assert_eq!(gender.get_column_names(), vec!["genero", "quantidade_alunos"]);
        let (_, race) = &frames[4];
        assert_eq!(race.get_column_names()[0], "raca");
        let (_, access) = &frames[5];
        assert_eq!(access.get_column_names()[0], "forma_acesso_seletivo");
    }
}
