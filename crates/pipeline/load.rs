//! Reads the student file with polars and turns it into an immutable
//! [`StudentTable`].
//!
//! Column names come from [`config::Columns`]. The identifying columns
//! (student id, modality, course, status) must be complete; every other
//! attribute is nullable and a null stays `None` on the record.

use crate::error::LoadError;
use crate::record::StudentRecord;
use crate::table::StudentTable;
use config::Columns;
use log::{debug, info};
use polars::prelude::*;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub columns: Columns,
    pub separator: u8,
    pub dropout_status: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            columns: Columns::default(),
            separator: b',',
            dropout_status: "Evasão".to_string(),
        }
    }
}

/// Loads the csv at `path` and derives the dropout flag for every row.
pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<StudentTable, LoadError> {
    let path = path.as_ref();
    // fail with a plain IO error instead of a polars one when the file is absent
    std::fs::metadata(path)?;
    info!("loading students from {:?}", path);

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_separator(options.separator)
        .with_infer_schema_length(Some(10_000))
        .finish()?
        .collect()?;
    info!("read {} rows from {:?}", df.height(), path);

    from_dataframe(&df, options)
}

/// Builds the table from an already materialised frame.
pub fn from_dataframe(df: &DataFrame, options: &LoadOptions) -> Result<StudentTable, LoadError> {
    let columns = &options.columns;
    for name in columns.required() {
        if df.column(name).is_err() {
            return Err(LoadError::ColumnNotFound(name.to_string()));
        }
    }
    debug!("all required columns found: {:?}", columns.required());

    let ids = required_strings(df, &columns.student_id)?;
    let modalities = required_strings(df, &columns.modality)?;
    let courses = required_strings(df, &columns.course)?;
    let statuses = required_strings(df, &columns.status)?;
    let ira = floats(df, &columns.ira)?;
    let failures = integers(df, &columns.failures)?;
    let attendance = floats(df, &columns.attendance)?;
    let gender = string_column(df, &columns.gender)?;
    let race = string_column(df, &columns.race)?;
    let access = string_column(df, &columns.selective_access)?;
    let income = floats(df, &columns.gross_income)?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let record = StudentRecord::new(
            ids[i].clone(),
            modalities[i].clone(),
            courses[i].clone(),
            statuses[i].clone(),
            &options.dropout_status,
        )
        .with_ira(ira[i])
        .with_failures(failures[i])
        .with_attendance(attendance[i])
        .with_gender(gender[i].clone())
        .with_race(race[i].clone())
        .with_selective_access(access[i].clone())
        .with_gross_income(income[i]);
        records.push(record);
    }

    let table = StudentTable::new(records);
    info!(
        "loaded {} students, {} dropouts",
        table.len(),
        table.all().dropout_count()
    );
    Ok(table)
}

/// Blank cells count as missing. Other values are kept as read, padding
/// included.
fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, LoadError> {
    let series = df
        .column(name)
        .map_err(|_| LoadError::ColumnNotFound(name.to_string()))?;
    let casted = series.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| v.filter(|s| !s.trim().is_empty()).map(str::to_string))
        .collect();
    Ok(values)
}

fn required_strings(df: &DataFrame, name: &str) -> Result<Vec<String>, LoadError> {
    string_column(df, name)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| LoadError::MissingValues {
                column: name.to_string(),
                row: row + 1,
            })
        })
        .collect()
}

fn numeric_column(
    df: &DataFrame,
    name: &str,
    dtype: DataType,
    expected: &'static str,
) -> Result<Series, LoadError> {
    let series = df
        .column(name)
        .map_err(|_| LoadError::ColumnNotFound(name.to_string()))?;
    let wrong_type = || LoadError::ColumnWrongType {
        column: name.to_string(),
        expected,
        found: format!("{:?}", series.dtype()),
    };
    let casted = series.cast(&dtype).map_err(|_| wrong_type())?;
    // a lossy cast turns unparsable text into extra nulls
    if casted.null_count() > series.null_count() {
        return Err(wrong_type());
    }
    Ok(casted)
}

fn floats(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, LoadError> {
    let casted = numeric_column(df, name, DataType::Float64, "f64 (decimal point)")?;
    let values = casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}

fn integers(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, LoadError> {
    let series = df
        .column(name)
        .map_err(|_| LoadError::ColumnNotFound(name.to_string()))?;
    // float -> int truncates without adding nulls
    if series.dtype().is_float() {
        let original = series.cast(&DataType::Float64)?;
        if original.f64()?.into_iter().flatten().any(|v| v.fract() != 0.0) {
            return Err(LoadError::ColumnWrongType {
                column: name.to_string(),
                expected: "integer",
                found: format!("{:?}", series.dtype()),
            });
        }
    }
    let casted = numeric_column(df, name, DataType::Int64, "integer")?;
    let values = casted.i64()?.into_iter().collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    const HEADER: &str = "alunoid,modalidade,curso,situacao,ira,reprovacoes,frequencia,genero,raca,forma_acesso_seletivo,rendabruta";

    fn create_test_csv(content: &str) -> io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        write!(file, "{}", content)?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_success() {
        let content = format!(
            "{HEADER}\n\
             1,Presencial,Informática,Evasão,5.5,2,75.0,M,Parda,Cotas,1200.50\n\
             2,Presencial,Informática,Matriculado,8.1,0,98.5,F,Branca,,\n\
             3,EaD,Letras,Evasão,,1,40.0,,Preta,Ampla,800\n"
        );
        let file = create_test_csv(&content).unwrap();
        let table = load(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(table.len(), 3);
        let records = table.records();
        assert_eq!(records[0].student_id, "1");
        assert_eq!(records[0].course, "Informática");
        assert!(records[0].is_dropout());
        assert!(!records[1].is_dropout());
        assert_eq!(records[0].ira, Some(5.5));
        assert_eq!(records[0].failures, Some(2));
        assert_eq!(records[0].gross_income, Some(1200.5));
        assert_eq!(records[1].selective_access, None);
        assert_eq!(records[1].gross_income, None);
        assert_eq!(records[2].ira, None);
        assert_eq!(records[2].gender, None);
        assert_eq!(records[2].gross_income, Some(800.0));
    }

    #[test]
    fn test_missing_column_rejected() {
        let content = "alunoid,modalidade,curso,situacao\n1,Presencial,A,Evasão\n";
        let file = create_test_csv(content).unwrap();
        let err = load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::ColumnNotFound(ref c) if c == "ira"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load("/nonexistent/alunos.csv", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_non_numeric_ira_rejected() {
        let content = format!("{HEADER}\n1,Presencial,A,Evasão,abc,0,90,M,Parda,Cotas,100\n");
        let file = create_test_csv(&content).unwrap();
        let err = load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::ColumnWrongType { ref column, .. } if column == "ira"));
    }

    #[test]
    fn test_missing_course_rejected() {
        let content = format!(
            "{HEADER}\n1,Presencial,A,Evasão,5,0,90,M,Parda,Cotas,100\n2,Presencial,,Evasão,5,0,90,M,Parda,Cotas,100\n"
        );
        let file = create_test_csv(&content).unwrap();
        let err = load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(
            matches!(err, LoadError::MissingValues { ref column, row } if column == "curso" && row == 2)
        );
    }

    #[test]
    fn test_fractional_failures_rejected() {
        let content = format!(
            "{HEADER}\n\
             1,Presencial,A,Evasão,5,2.5,90,M,Parda,Cotas,100\n\
             2,Presencial,A,Evasão,5,2,90,M,Parda,Cotas,100\n"
        );
        let file = create_test_csv(&content).unwrap();
        let err = load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(
            matches!(err, LoadError::ColumnWrongType { ref column, .. } if column == "reprovacoes")
        );
    }

    #[test]
    fn test_whole_float_failures_accepted() {
        let content = format!("{HEADER}\n1,Presencial,A,Evasão,5,3.0,90,M,Parda,Cotas,100\n");
        let file = create_test_csv(&content).unwrap();
        let table = load(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.records()[0].failures, Some(3));
    }

    #[test]
    fn test_padded_status_is_not_dropout() {
        let content = format!(
            "{HEADER}\n\
             1,Presencial,A, Evasão,5,0,90,M,Parda,Cotas,100\n\
             2,Presencial,A,Evasão ,5,0,90,M,Parda,Cotas,100\n\
             3,Presencial,A,Evasão,5,0,90,M,Parda,Cotas,100\n"
        );
        let file = create_test_csv(&content).unwrap();
        let table = load(file.path(), &LoadOptions::default()).unwrap();
        let records = table.records();
        assert_eq!(records[0].status, " Evasão");
        assert!(!records[0].is_dropout());
        assert_eq!(records[1].status, "Evasão ");
        assert!(!records[1].is_dropout());
        assert!(records[2].is_dropout());
        assert_eq!(table.all().dropout_count(), 1);
    }

    #[test]
    fn test_blank_course_is_missing() {
        let content = format!("{HEADER}\n1,Presencial,   ,Evasão,5,0,90,M,Parda,Cotas,100\n");
        let file = create_test_csv(&content).unwrap();
        let err = load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(
            matches!(err, LoadError::MissingValues { ref column, row } if column == "curso" && row == 1)
        );
    }

    #[test]
    fn test_custom_separator_and_columns() {
        let content = "id;modalidade;curso;situacao;ira;reprovacoes;frequencia;genero;raca;forma_acesso_seletivo;renda\n\
                       7;EaD;Letras;Evadido;6.0;1;50.0;F;Parda;Ampla;900.0\n";
        let file = create_test_csv(content).unwrap();
        let mut options = LoadOptions {
            separator: b';',
            dropout_status: "Evadido".to_string(),
            ..LoadOptions::default()
        };
        options.columns.student_id = "id".to_string();
        options.columns.gross_income = "renda".to_string();

        let table = load(file.path(), &options).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.records()[0].is_dropout());
        assert_eq!(table.records()[0].gross_income, Some(900.0));
    }
}
