use crate::programs::{Eligibility, Program, ProgramDetails, ProgramDraft};
use crate::students::{join_countries, split_countries, StudentProfile, StudentProfileForm};
use crate::types::{AppError, Result};
use chrono::Utc;
use libsql::{params_from_iter, Builder, Connection, Database, Row, Value};

/// libsql-backed store for students and programs.
///
/// One connection is opened at construction and shared by every call, so an
/// in-memory database keeps its tables for the lifetime of the client.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
}

const PROFILE_UPDATE: &str = "name = excluded.name,
    phone = excluded.phone,
    age = excluded.age,
    nationality = excluded.nationality,
    previous_degree = excluded.previous_degree,
    grades = excluded.grades,
    current_education_level = excluded.current_education_level,
    preferred_countries = excluded.preferred_countries,
    preferred_programs = excluded.preferred_programs,
    career_aspirations = excluded.career_aspirations,
    visa_questions = excluded.visa_questions,
    filled_application = 1,
    updated_at = excluded.updated_at";

impl TursoClient {
    /// Ephemeral in-memory database, used by tests and `database.url = ":memory:"`.
    pub async fn new_memory() -> Result<Self> {
        Self::new_local(":memory:").await
    }

    /// File-backed SQLite database. Parent directories are created as needed.
    pub async fn new_local(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::Database(format!("Failed to create database directory: {}", e))
                    })?;
                }
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        Self::from_database(db).await
    }

    /// Remote Turso database.
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;

        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self { _db: db, conn };
        client.initialize_schema().await?;

        Ok(client)
    }

    fn connection(&self) -> Connection {
        self.conn.clone()
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection();

        // Users table, one row per student identity
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                name TEXT,
                phone TEXT,
                age INTEGER,
                nationality TEXT,
                previous_degree TEXT,
                grades TEXT,
                current_education_level TEXT,
                preferred_countries TEXT,
                preferred_programs TEXT,
                career_aspirations TEXT,
                visa_questions TEXT,
                filled_application INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create users table: {}", e)))?;

        // Programs table
        let detail_columns: Vec<String> = ProgramDetails::COLUMNS
            .iter()
            .map(|(_, column)| format!("{} TEXT", column))
            .collect();
        let programs_ddl = format!(
            "CREATE TABLE IF NOT EXISTS programs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                university TEXT NOT NULL,
                eligibility TEXT,
                {},
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            detail_columns.join(",\n                ")
        );
        conn.execute(&programs_ddl, ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to create programs table: {}", e)))?;

        Ok(())
    }

    // User operations

    /// Create a bare user row. Profile fields stay empty until the student
    /// submits the application form.
    pub async fn create_user(&self, id: &str, email: &str, name: Option<&str>) -> Result<()> {
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO users (id, email, name, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)",
                params_from_iter(vec![
                    Value::from(id),
                    Value::from(email),
                    Value::from(name.map(str::to_string)),
                    Value::from(now),
                    Value::from(now),
                ]),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create user: {}", e)))?;

        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<StudentProfile>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, email, name, phone, age, nationality, previous_degree, grades,
                        current_education_level, preferred_countries, preferred_programs,
                        career_aspirations, visa_questions, filled_application
                 FROM users WHERE email = ?",
                [email],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(student_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Write the submitted profile onto the user identified by `email`,
    /// creating the row with `id` if it does not exist yet, and mark the
    /// application as filled. A row already holding `id` under another
    /// email takes the new email.
    pub async fn upsert_student_profile(
        &self,
        id: &str,
        email: &str,
        form: &StudentProfileForm,
    ) -> Result<()> {
        let now = Utc::now().timestamp();

        let params = vec![
            Value::from(id),
            Value::from(email),
            Value::from(form.name.trim()),
            Value::from(form.phone.as_str()),
            Value::from(form.age as i64),
            Value::from(form.nationality.as_str()),
            Value::from(form.previous_degree.as_str()),
            Value::from(form.grades.as_str()),
            Value::from(form.current_education_level.as_str()),
            Value::from(join_countries(&form.preferred_countries)),
            Value::from(form.preferred_programs.as_str()),
            Value::from(form.career_aspirations.as_str()),
            Value::from(form.visa_questions.as_str()),
            Value::from(now),
            Value::from(now),
        ];

        self.conn
            .execute(
                &format!(
                    "INSERT INTO users (id, email, name, phone, age, nationality, previous_degree,
                                        grades, current_education_level, preferred_countries,
                                        preferred_programs, career_aspirations, visa_questions,
                                        filled_application, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
                     ON CONFLICT(email) DO UPDATE SET {profile}
                     ON CONFLICT(id) DO UPDATE SET email = excluded.email, {profile}",
                    profile = PROFILE_UPDATE
                ),
                params_from_iter(params),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update student profile: {}", e)))?;

        Ok(())
    }

    // Program operations

    pub async fn create_program(&self, draft: &ProgramDraft) -> Result<Program> {
        let now = Utc::now().timestamp();
        let columns: Vec<&str> = ProgramDetails::COLUMNS.iter().map(|(_, c)| *c).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");

        let sql = format!(
            "INSERT INTO programs (name, university, eligibility, {}, created_at, updated_at)
             VALUES (?, ?, ?, {}, ?, ?) RETURNING id",
            columns.join(", "),
            placeholders
        );

        let mut params = draft_params(draft)?;
        params.push(Value::from(now));
        params.push(Value::from(now));

        let mut rows = self
            .conn
            .query(&sql, params_from_iter(params))
            .await
            .map_err(|e| AppError::Database(format!("Failed to create program: {}", e)))?;

        let row = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::Database("Insert returned no id".to_string()))?;
        let id: i64 = row.get(0).map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Program {
            id,
            name: draft.name.clone(),
            university: draft.university.clone(),
            eligibility: draft.eligibility.clone(),
            details: draft.details.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace every field of program `id`. Fails with `NotFound` when no row matches.
    pub async fn update_program(&self, id: i64, draft: &ProgramDraft) -> Result<Program> {
        let now = Utc::now().timestamp();
        let assignments: Vec<String> = ProgramDetails::COLUMNS
            .iter()
            .map(|(_, column)| format!("{} = ?", column))
            .collect();

        let sql = format!(
            "UPDATE programs SET name = ?, university = ?, eligibility = ?, {}, updated_at = ?
             WHERE id = ?",
            assignments.join(", ")
        );

        let mut params = draft_params(draft)?;
        params.push(Value::from(now));
        params.push(Value::from(id));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(params))
            .await
            .map_err(|e| AppError::Database(format!("Failed to update program: {}", e)))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("Program {} not found", id)));
        }

        self.get_program(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Program {} not found", id)))
    }

    pub async fn get_program(&self, id: i64) -> Result<Option<Program>> {
        let sql = format!("SELECT {} FROM programs WHERE id = ?", program_select_list());

        let mut rows = self
            .conn
            .query(&sql, [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query program: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(program_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_programs(&self) -> Result<Vec<Program>> {
        let sql = format!(
            "SELECT {} FROM programs ORDER BY id ASC",
            program_select_list()
        );

        let mut rows = self
            .conn
            .query(&sql, ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to query programs: {}", e)))?;

        let mut programs = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            programs.push(program_from_row(&row)?);
        }

        Ok(programs)
    }
}

fn draft_params(draft: &ProgramDraft) -> Result<Vec<Value>> {
    let mut params = vec![
        Value::from(draft.name.as_str()),
        Value::from(draft.university.as_str()),
        Value::from(draft.eligibility.to_blob()?),
    ];
    params.extend(
        draft
            .details
            .values()
            .into_iter()
            .map(|v| Value::from(v.map(str::to_string))),
    );
    Ok(params)
}

fn program_select_list() -> String {
    let columns: Vec<&str> = ProgramDetails::COLUMNS.iter().map(|(_, c)| *c).collect();
    format!(
        "id, name, university, eligibility, {}, created_at, updated_at",
        columns.join(", ")
    )
}

fn db_err(e: libsql::Error) -> AppError {
    AppError::Database(e.to_string())
}

fn program_from_row(row: &Row) -> Result<Program> {
    let count = ProgramDetails::COLUMNS.len() as i32;
    let mut values = Vec::with_capacity(count as usize);
    for idx in 4..4 + count {
        values.push(row.get::<Option<String>>(idx).map_err(db_err)?);
    }
    let eligibility: Option<String> = row.get(3).map_err(db_err)?;

    Ok(Program {
        id: row.get(0).map_err(db_err)?,
        name: row.get(1).map_err(db_err)?,
        university: row.get(2).map_err(db_err)?,
        eligibility: Eligibility::from_blob(eligibility.as_deref()),
        details: ProgramDetails::from_values(values),
        created_at: row.get(4 + count).map_err(db_err)?,
        updated_at: row.get(5 + count).map_err(db_err)?,
    })
}

fn student_from_row(row: &Row) -> Result<StudentProfile> {
    let countries: Option<String> = row.get(9).map_err(db_err)?;
    let filled: i64 = row.get(13).map_err(db_err)?;

    Ok(StudentProfile {
        id: row.get(0).map_err(db_err)?,
        email: row.get(1).map_err(db_err)?,
        name: row.get(2).map_err(db_err)?,
        phone: row.get(3).map_err(db_err)?,
        age: row.get(4).map_err(db_err)?,
        nationality: row.get(5).map_err(db_err)?,
        previous_degree: row.get(6).map_err(db_err)?,
        grades: row.get(7).map_err(db_err)?,
        current_education_level: row.get(8).map_err(db_err)?,
        preferred_countries: countries.as_deref().map(split_countries).unwrap_or_default(),
        preferred_programs: row.get(10).map_err(db_err)?,
        career_aspirations: row.get(11).map_err(db_err)?,
        visa_questions: row.get(12).map_err(db_err)?,
        filled_application: filled != 0,
    })
}
