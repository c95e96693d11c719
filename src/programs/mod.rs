//! Academic program records
//!
//! Admin forms arrive as flat `application/x-www-form-urlencoded` fields. They
//! are turned into a [`ProgramDraft`] by one typed conversion driven by the
//! field table in [`ProgramDetails::COLUMNS`], then persisted by
//! [`TursoClient`](crate::db::TursoClient).
//!
//! Create and update differ only in how absent values are read:
//!
//! | mode   | field absent/empty            | `Not Specified`   |
//! |--------|-------------------------------|-------------------|
//! | create | `""` (fee/deposit: NULL)      | stored literally  |
//! | update | `""`                          | NULL              |

use crate::db::vectorstore::VectorStore;
use crate::db::TursoClient;
use crate::rag::embeddings::EmbeddingProvider;
use crate::types::{AppError, FieldError, IndexRecord, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Form value that an update treats as "unset".
pub const NOT_SPECIFIED: &str = "Not Specified";

/// Raw form submission.
pub type FormFields = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    Create,
    Update,
}

/// Optional fields stored as NULL instead of `""` when a create leaves them empty.
const NULL_WHEN_EMPTY: &[&str] = &["applicationFee", "deposit"];

macro_rules! program_text_fields {
    ($($field:ident => $key:literal),* $(,)?) => {
        /// Optional descriptive attributes of a program.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "camelCase")]
        pub struct ProgramDetails {
            $(pub $field: Option<String>,)*
        }

        impl ProgramDetails {
            /// `(form key, column)` for every optional text field, in storage order.
            pub const COLUMNS: &'static [(&'static str, &'static str)] =
                &[$(($key, stringify!($field)),)*];

            fn read_with(mut read: impl FnMut(&str) -> Option<String>) -> Self {
                Self {
                    $($field: read($key),)*
                }
            }

            /// Column values in `COLUMNS` order.
            pub fn values(&self) -> Vec<Option<&str>> {
                vec![$(self.$field.as_deref(),)*]
            }

            /// Rebuild from column values in `COLUMNS` order.
            pub fn from_values(values: Vec<Option<String>>) -> Self {
                let mut values = values.into_iter();
                Self {
                    $($field: values.next().flatten(),)*
                }
            }
        }
    };
}

program_text_fields! {
    description => "description",
    mode => "mode",
    duration => "duration",
    category => "category",
    fees => "fees",
    ranking => "ranking",
    college => "college",
    location => "location",
    public_private => "publicPrivate",
    special_location_features => "specialLocationFeatures",
    special_university_features => "specialUniversityFeatures",
    specialization => "specialization",
    usp => "usp",
    curriculum => "curriculum",
    co_op_internship => "coOpInternship",
    transcript_evaluation => "transcriptEvaluation",
    lor => "lor",
    sop => "sop",
    interviews => "interviews",
    application_fee => "applicationFee",
    deposit => "deposit",
    deposit_refundable_visa => "depositRefundableVisa",
    key_companies_hiring => "keyCompaniesHiring",
    key_job_roles => "keyJobRoles",
    quant_qualitative => "quantQualitative",
}

/// Eligibility rules, stored as an embedded JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Eligibility {
    pub ug_background: Option<String>,
    pub minimum_gpa: Option<String>,
    pub backlogs: u32,
    pub work_experience: Option<String>,
    pub allow_3_year_degree: Option<String>,
    pub decision_factor: Option<String>,
}

impl Eligibility {
    pub fn to_blob(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Internal(format!("Failed to encode eligibility: {}", e)))
    }

    /// Parse a stored blob; anything unreadable becomes an empty eligibility.
    pub fn from_blob(blob: Option<&str>) -> Self {
        match blob {
            Some(text) if !text.trim().is_empty() => serde_json::from_str(text)
                .unwrap_or_else(|e| {
                    tracing::warn!("Unreadable eligibility blob, ignoring it: {}", e);
                    Self::default()
                }),
            _ => Self::default(),
        }
    }
}

/// Validated program fields ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramDraft {
    pub name: String,
    pub university: String,
    pub eligibility: Eligibility,
    pub details: ProgramDetails,
}

impl ProgramDraft {
    pub fn from_form(fields: &FormFields, mode: UpsertMode) -> std::result::Result<Self, Vec<FieldError>> {
        let name = required(fields, "name");
        let university = required(fields, "university");

        let mut errors = Vec::new();
        if name.is_none() {
            errors.push(FieldError::new("name", "Program name is required"));
        }
        if university.is_none() {
            errors.push(FieldError::new("university", "University is required"));
        }
        let (Some(name), Some(university)) = (name, university) else {
            return Err(errors);
        };

        let read = |key: &str| read_optional(fields, key, mode);

        let eligibility = Eligibility {
            ug_background: read("ugBackground"),
            minimum_gpa: read("minimumGpa"),
            backlogs: parse_backlogs(fields.get("backlogs")),
            work_experience: read("workExperience"),
            allow_3_year_degree: read("allow3YearDegree"),
            decision_factor: read("decisionFactor"),
        };

        Ok(Self {
            name,
            university,
            eligibility,
            details: ProgramDetails::read_with(read),
        })
    }
}

fn required(fields: &FormFields, key: &str) -> Option<String> {
    fields
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn read_optional(fields: &FormFields, key: &str, mode: UpsertMode) -> Option<String> {
    let value = fields.get(key).map(String::as_str);
    match mode {
        UpsertMode::Create => match value.filter(|v| !v.is_empty()) {
            Some(v) => Some(v.to_string()),
            None if NULL_WHEN_EMPTY.contains(&key) => None,
            None => Some(String::new()),
        },
        UpsertMode::Update => match value {
            Some(NOT_SPECIFIED) => None,
            Some(v) => Some(v.to_string()),
            None => Some(String::new()),
        },
    }
}

fn parse_backlogs(value: Option<&String>) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// A stored program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub university: String,
    pub eligibility: Eligibility,
    #[serde(flatten)]
    pub details: ProgramDetails,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Program {
    /// Metadata in the keys the context formatter reads back.
    pub fn index_metadata(&self) -> Map<String, Value> {
        let d = &self.details;
        let e = &self.eligibility;
        let mut meta = Map::new();

        meta.insert("ProgramId".to_string(), Value::from(self.id));
        meta.insert("Program".to_string(), Value::from(self.name.clone()));
        meta.insert("University".to_string(), Value::from(self.university.clone()));

        let texts = [
            ("Location", &d.location),
            ("Specialization", &d.specialization),
            ("Curriculum", &d.curriculum),
            ("SpecialLocationFeatures", &d.special_location_features),
            ("CoOpInternship", &d.co_op_internship),
            ("KeyJobRoles", &d.key_job_roles),
            ("EligibilityMinimumGPA", &e.minimum_gpa),
            ("EligibilityWorkExperience", &e.work_experience),
            ("EligibilityUGBackground", &e.ug_background),
            ("LOR", &d.lor),
            ("SOP", &d.sop),
            ("ApplicationFee", &d.application_fee),
            ("Deposit", &d.deposit),
        ];
        for (key, value) in texts {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                meta.insert(key.to_string(), Value::from(v));
            }
        }
        if e.backlogs > 0 {
            meta.insert("EligibilityBacklogs".to_string(), Value::from(e.backlogs));
        }

        meta
    }

    /// Plain-text rendering used to embed the program.
    pub fn index_text(&self) -> String {
        let mut parts = vec![format!("{} at {}", self.name, self.university)];
        for ((key, _), value) in ProgramDetails::COLUMNS.iter().zip(self.details.values()) {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                parts.push(format!("{}: {}", key, v));
            }
        }
        if let Some(gpa) = self.eligibility.minimum_gpa.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("minimumGpa: {}", gpa));
        }
        if let Some(bg) = self.eligibility.ug_background.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("ugBackground: {}", bg));
        }
        parts.join("\n")
    }
}

/// Result body of a create/update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgramResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<Program>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub enum UpsertOutcome {
    Saved(Program),
    Invalid(Vec<FieldError>),
    /// Persistence failed; the cause has already been logged.
    Failed { not_found: bool },
}

pub async fn create_program(db: &TursoClient, fields: &FormFields) -> UpsertOutcome {
    let draft = match ProgramDraft::from_form(fields, UpsertMode::Create) {
        Ok(draft) => draft,
        Err(errors) => return UpsertOutcome::Invalid(errors),
    };

    match db.create_program(&draft).await {
        Ok(program) => {
            tracing::info!(program_id = program.id, "Program created");
            UpsertOutcome::Saved(program)
        }
        Err(e) => {
            tracing::error!("Error creating program: {}", e);
            UpsertOutcome::Failed { not_found: false }
        }
    }
}

pub async fn update_program(db: &TursoClient, id: i64, fields: &FormFields) -> UpsertOutcome {
    tracing::debug!(program_id = id, "Starting program update");
    let draft = match ProgramDraft::from_form(fields, UpsertMode::Update) {
        Ok(draft) => draft,
        Err(errors) => return UpsertOutcome::Invalid(errors),
    };

    match db.update_program(id, &draft).await {
        Ok(program) => {
            tracing::info!(program_id = id, "Program updated");
            UpsertOutcome::Saved(program)
        }
        Err(e) => {
            tracing::error!(program_id = id, "Error updating program: {}", e);
            UpsertOutcome::Failed {
                not_found: matches!(e, AppError::NotFound(_)),
            }
        }
    }
}

/// Embed every stored program and upsert it into the vector index.
///
/// Returns the number of programs written.
pub async fn sync_index(
    db: &TursoClient,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> Result<usize> {
    let programs = db.list_programs().await?;
    let mut records = Vec::with_capacity(programs.len());

    for program in &programs {
        let values = embedder.embed(&program.index_text()).await?;
        records.push(IndexRecord {
            id: format!("program-{}", program.id),
            values,
            metadata: program.index_metadata(),
        });
    }

    if !records.is_empty() {
        store.upsert(&records).await?;
    }
    tracing::info!(count = records.len(), "Program index synchronised");
    Ok(records.len())
}
