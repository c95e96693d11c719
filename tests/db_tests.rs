//! Store behaviour against in-memory and file-backed libsql databases.

use elytra::db::TursoClient;
use elytra::programs::{
    self, sync_index, FormFields, ProgramDraft, UpsertMode, UpsertOutcome,
};
use elytra::students::{self, StudentProfileForm};
use elytra::types::{AppError, Claims};
use tempfile::TempDir;

mod common;
use common::mocks::{MockEmbedder, MockVectorStore};

fn fields(pairs: &[(&str, &str)]) -> FormFields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn claims(email: &str) -> Claims {
    Claims {
        sub: "user-1".to_string(),
        email: email.to_string(),
        role: "student".to_string(),
        exp: 0,
        iat: 0,
    }
}

fn profile_form() -> StudentProfileForm {
    StudentProfileForm {
        name: "Asha Rao".to_string(),
        phone: "9876543210".to_string(),
        age: 23.0,
        nationality: "Indian".to_string(),
        previous_degree: "BSc Physics".to_string(),
        grades: "3.4 GPA".to_string(),
        current_education_level: "Graduate".to_string(),
        preferred_countries: vec!["Germany".to_string(), "Canada".to_string()],
        preferred_programs: "MSc Physics".to_string(),
        career_aspirations: "Research".to_string(),
        visa_questions: String::new(),
    }
}

#[tokio::test]
async fn test_profile_upsert_merges_into_existing_user() {
    let db = TursoClient::new_memory().await.unwrap();
    db.create_user("existing-id", "asha@example.com", Some("Asha"))
        .await
        .unwrap();

    let before = db.get_user_by_email("asha@example.com").await.unwrap().unwrap();
    assert!(!before.filled_application);

    let stored = students::upload_profile(&db, Some(&claims("asha@example.com")), &profile_form())
        .await
        .unwrap();

    assert_eq!(stored.id, "existing-id");
    assert!(stored.filled_application);
    assert_eq!(stored.age, Some(23));
    assert_eq!(stored.preferred_countries, vec!["Germany", "Canada"]);
    assert_eq!(stored.visa_questions.as_deref(), Some(""));
}

#[tokio::test]
async fn test_profile_upsert_inserts_unknown_user() {
    let db = TursoClient::new_memory().await.unwrap();

    students::upload_profile(&db, Some(&claims("new@example.com")), &profile_form())
        .await
        .unwrap();
    let mut form = profile_form();
    form.grades = "3.6 GPA".to_string();
    let updated = students::upload_profile(&db, Some(&claims("new@example.com")), &form)
        .await
        .unwrap();

    assert_eq!(updated.id, "user-1");
    assert_eq!(updated.grades.as_deref(), Some("3.6 GPA"));
}

#[tokio::test]
async fn test_profile_upsert_moves_known_id_to_new_email() {
    let db = TursoClient::new_memory().await.unwrap();
    db.create_user("user-1", "old@example.com", Some("Asha"))
        .await
        .unwrap();

    let stored = students::upload_profile(&db, Some(&claims("new@example.com")), &profile_form())
        .await
        .unwrap();

    assert_eq!(stored.id, "user-1");
    assert_eq!(stored.email, "new@example.com");
    assert!(stored.filled_application);
    assert!(db.get_user_by_email("old@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_profile_writes_nothing() {
    let db = TursoClient::new_memory().await.unwrap();
    let mut form = profile_form();
    form.age = 101.0;

    let result = students::upload_profile(&db, Some(&claims("old@example.com")), &form).await;

    assert!(matches!(
        result.map_err(AppError::from),
        Err(AppError::Validation(_))
    ));
    assert!(db.get_user_by_email("old@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_program_roundtrip_in_file_database() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("nested").join("elytra.db");
    let path = path.to_str().expect("utf-8 path");

    let id = {
        let db = TursoClient::new_local(path).await.unwrap();
        let draft = ProgramDraft::from_form(
            &fields(&[
                ("name", "MEng Robotics"),
                ("university", "University of Toronto"),
                ("coOpInternship", "Yes"),
                ("ugBackground", "Engineering"),
            ]),
            UpsertMode::Create,
        )
        .unwrap();
        db.create_program(&draft).await.unwrap().id
    };

    let db = TursoClient::new_local(path).await.unwrap();
    let program = db.get_program(id).await.unwrap().expect("persisted");

    assert_eq!(program.name, "MEng Robotics");
    assert_eq!(program.details.co_op_internship.as_deref(), Some("Yes"));
    assert_eq!(program.eligibility.ug_background.as_deref(), Some("Engineering"));
    assert_eq!(program.details.application_fee, None);
}

#[tokio::test]
async fn test_update_unknown_program_is_not_found() {
    let db = TursoClient::new_memory().await.unwrap();

    let outcome = programs::update_program(
        &db,
        7,
        &fields(&[("name", "X"), ("university", "Y")]),
    )
    .await;

    assert!(matches!(outcome, UpsertOutcome::Failed { not_found: true }));
}

#[tokio::test]
async fn test_sync_index_writes_every_program() {
    let db = TursoClient::new_memory().await.unwrap();
    for name in ["MSc AI", "MSc Robotics"] {
        let outcome = programs::create_program(
            &db,
            &fields(&[("name", name), ("university", "ETH Zurich"), ("location", "Zurich")]),
        )
        .await;
        assert!(matches!(outcome, UpsertOutcome::Saved(_)));
    }

    let store = MockVectorStore::empty();
    let count = sync_index(&db, &MockEmbedder::new(), &store).await.unwrap();

    assert_eq!(count, 2);
    let upserted = store.upserted.lock();
    assert!(upserted.iter().all(|r| r.id.starts_with("program-")));
    assert_eq!(upserted[0].metadata["University"], "ETH Zurich");
    assert_eq!(upserted[1].metadata["Location"], "Zurich");
}

#[tokio::test]
async fn test_sync_index_surfaces_embedding_failure() {
    let db = TursoClient::new_memory().await.unwrap();
    programs::create_program(&db, &fields(&[("name", "A"), ("university", "B")])).await;

    let result = sync_index(&db, &MockEmbedder::failing(), &MockVectorStore::empty()).await;

    assert!(matches!(result, Err(AppError::Embedding(_))));
}
