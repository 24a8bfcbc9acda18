use serde::Serialize;

/// One row of the student file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub modality: String,
    pub course: String,
    pub status: String,
    pub ira: Option<f64>,
    pub failures: Option<i64>,
    pub attendance: Option<f64>,
    pub gender: Option<String>,
    pub race: Option<String>,
    pub selective_access: Option<String>,
    pub gross_income: Option<f64>,
    /// set once from `status` when the record is built
    dropout: bool,
}

impl StudentRecord {
    pub fn new(
        student_id: String,
        modality: String,
        course: String,
        status: String,
        dropout_status: &str,
    ) -> Self {
        let dropout = status == dropout_status;
        StudentRecord {
            student_id,
            modality,
            course,
            status,
            ira: None,
            failures: None,
            attendance: None,
            gender: None,
            race: None,
            selective_access: None,
            gross_income: None,
            dropout,
        }
    }

    pub fn is_dropout(&self) -> bool {
        self.dropout
    }

    pub fn with_ira(mut self, ira: Option<f64>) -> Self {
        self.ira = ira;
        self
    }

    pub fn with_failures(mut self, failures: Option<i64>) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_attendance(mut self, attendance: Option<f64>) -> Self {
        self.attendance = attendance;
        self
    }

    pub fn with_gender(mut self, gender: Option<String>) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_race(mut self, race: Option<String>) -> Self {
        self.race = race;
        self
    }

    pub fn with_selective_access(mut self, selective_access: Option<String>) -> Self {
        self.selective_access = selective_access;
        self
    }

    pub fn with_gross_income(mut self, gross_income: Option<f64>) -> Self {
        self.gross_income = gross_income;
        self
    }
}
