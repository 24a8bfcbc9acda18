use log::info;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".evasao-stat.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("separator must be a single ASCII character, got {0:?}")]
    Separator(char),
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// csv with one row per student
    pub source: String,
    /// value of the status column that marks a dropout
    pub dropout_status: String,
    pub separator: char,
    /// where `--format csv` writes its tables
    pub output_dir: String,
    pub columns: Columns,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: "dados_alunos_md.csv".to_string(),
            dropout_status: "Evasão".to_string(),
            separator: ',',
            output_dir: "report".to_string(),
            columns: Columns::default(),
        }
    }
}

/// Column names in the source file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Columns {
    pub student_id: String,
    pub modality: String,
    pub course: String,
    pub status: String,
    pub ira: String,
    pub failures: String,
    pub attendance: String,
    pub gender: String,
    pub race: String,
    pub selective_access: String,
    pub gross_income: String,
}

impl Default for Columns {
    fn default() -> Self {
        Columns {
            student_id: "alunoid".to_string(),
            modality: "modalidade".to_string(),
            course: "curso".to_string(),
            status: "situacao".to_string(),
            ira: "ira".to_string(),
            failures: "reprovacoes".to_string(),
            attendance: "frequencia".to_string(),
            gender: "genero".to_string(),
            race: "raca".to_string(),
            selective_access: "forma_acesso_seletivo".to_string(),
            gross_income: "rendabruta".to_string(),
        }
    }
}

impl Config {
    /// 读取配置文件，文件不存在时使用默认配置
    pub fn new(filename: &str) -> Result<Config, ConfigError> {
        if !Path::new(filename).exists() {
            info!("config file {} not found, using defaults", filename);
            return Ok(Config::default());
        }
        let reader = File::open(filename)?;
        let config: Config = serde_yaml::from_reader(reader)?;
        info!("config loaded from {}", filename);
        Ok(config)
    }

    pub fn separator_byte(&self) -> Result<u8, ConfigError> {
        if self.separator.is_ascii() {
            Ok(self.separator as u8)
        } else {
            Err(ConfigError::Separator(self.separator))
        }
    }
}

impl Columns {
    /// All columns the loader requires, in file order.
    pub fn required(&self) -> [&str; 11] {
        [
            self.student_id.as_str(),
            self.modality.as_str(),
            self.course.as_str(),
            self.status.as_str(),
            self.ira.as_str(),
            self.failures.as_str(),
            self.attendance.as_str(),
            self.gender.as_str(),
            self.race.as_str(),
            self.selective_access.as_str(),
            self.gross_income.as_str(),
        ]
    }
}
