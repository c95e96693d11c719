//! Student application profiles
//!
//! The intake form is validated as a whole before anything else happens, so a
//! caller without a session still learns which fields are wrong.

use crate::db::TursoClient;
use crate::types::{AppError, Claims, FieldError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Separator used when preferred countries are stored as one column.
pub const COUNTRY_SEPARATOR: &str = ", ";

const PHONE_MIN: usize = 10;
const PHONE_MAX: usize = 15;
const AGE_MIN: f64 = 18.0;
const AGE_MAX: f64 = 100.0;

/// Body of `POST /api/students`.
///
/// Missing fields deserialize to empty values and are reported by
/// [`StudentProfileForm::validate`] rather than rejected by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentProfileForm {
    pub name: String,
    pub phone: String,
    /// Numbers and numeric strings are accepted; anything else fails validation.
    #[serde(deserialize_with = "lenient_age")]
    pub age: f64,
    pub nationality: String,
    pub previous_degree: String,
    pub grades: String,
    pub current_education_level: String,
    pub preferred_countries: Vec<String>,
    pub preferred_programs: String,
    pub career_aspirations: String,
    pub visa_questions: String,
}

impl StudentProfileForm {
    /// Check every rule and collect all failures.
    pub fn validate(&self) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }

        let phone_len = self.phone.chars().count();
        if phone_len < PHONE_MIN {
            errors.push(FieldError::new(
                "phone",
                "Phone number must be at least 10 characters",
            ));
        } else if phone_len > PHONE_MAX {
            errors.push(FieldError::new(
                "phone",
                "Phone number must be less than 15 characters",
            ));
        }

        if !self.age.is_finite() || self.age.fract() != 0.0 {
            errors.push(FieldError::new("age", "Age must be a whole number"));
        } else if self.age < AGE_MIN {
            errors.push(FieldError::new("age", "Age must be at least 18"));
        } else if self.age > AGE_MAX {
            errors.push(FieldError::new("age", "Age must be less than 100"));
        }

        let required = [
            ("nationality", &self.nationality, "Nationality is required"),
            ("previousDegree", &self.previous_degree, "Previous degree is required"),
            ("grades", &self.grades, "Grades are required"),
            (
                "currentEducationLevel",
                &self.current_education_level,
                "Current education level is required",
            ),
        ];
        for (field, value, message) in required {
            if value.is_empty() {
                errors.push(FieldError::new(field, message));
            }
        }

        if self.preferred_countries.is_empty() {
            errors.push(FieldError::new(
                "preferredCountries",
                "At least one preferred country is required",
            ));
        } else if self
            .preferred_countries
            .iter()
            .any(|c| c.trim().is_empty() || c.contains(','))
        {
            errors.push(FieldError::new(
                "preferredCountries",
                "Country names must be non-empty and must not contain commas",
            ));
        }

        if self.preferred_programs.is_empty() {
            errors.push(FieldError::new(
                "preferredPrograms",
                "Preferred programs are required",
            ));
        }
        if self.career_aspirations.is_empty() {
            errors.push(FieldError::new(
                "careerAspirations",
                "Career aspirations are required",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn lenient_age<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

/// Flatten countries for storage.
pub fn join_countries(countries: &[String]) -> String {
    countries
        .iter()
        .map(|c| c.trim())
        .collect::<Vec<_>>()
        .join(COUNTRY_SEPARATOR)
}

/// Inverse of [`join_countries`]; blank segments are dropped.
pub fn split_countries(stored: &str) -> Vec<String> {
    stored
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// A stored student record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i64>,
    pub nationality: Option<String>,
    pub previous_degree: Option<String>,
    pub grades: Option<String>,
    pub current_education_level: Option<String>,
    pub preferred_countries: Vec<String>,
    pub preferred_programs: Option<String>,
    pub career_aspirations: Option<String>,
    pub visa_questions: Option<String>,
    pub filled_application: bool,
}

/// Why a profile upload did not go through.
#[derive(Debug)]
pub enum UploadError {
    Invalid(Vec<FieldError>),
    NoSession,
    Storage,
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Invalid(fields) => AppError::Validation(fields),
            UploadError::NoSession => AppError::Auth(
                "You must be logged in to submit student information.".to_string(),
            ),
            UploadError::Storage => AppError::Database(
                "There was an error updating the student information.".to_string(),
            ),
        }
    }
}

/// Validate, then require a session with an email, then persist.
pub async fn upload_profile(
    db: &TursoClient,
    claims: Option<&Claims>,
    form: &StudentProfileForm,
) -> std::result::Result<StudentProfile, UploadError> {
    form.validate().map_err(UploadError::Invalid)?;

    let claims = claims.ok_or(UploadError::NoSession)?;
    if claims.email.trim().is_empty() {
        tracing::warn!(user_id = %claims.sub, "Session has no email claim");
        return Err(UploadError::NoSession);
    }

    let stored = async {
        db.upsert_student_profile(&claims.sub, &claims.email, form)
            .await?;
        db.get_user_by_email(&claims.email).await
    }
    .await;

    match stored {
        Ok(Some(profile)) => {
            tracing::info!(user_id = %profile.id, "Student information updated");
            Ok(profile)
        }
        Ok(None) => {
            tracing::error!("Student row missing right after upsert");
            Err(UploadError::Storage)
        }
        Err(e) => {
            tracing::error!("Error updating student information: {}", e);
            Err(UploadError::Storage)
        }
    }
}

/// Stored profile for the caller, if any.
pub async fn load_profile(db: &TursoClient, claims: &Claims) -> Result<StudentProfile> {
    db.get_user_by_email(&claims.email)
        .await?
        .ok_or_else(|| AppError::NotFound("No student profile on record".to_string()))
}
