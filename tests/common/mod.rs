//! Shared setup for the integration suites.

#![allow(dead_code)]

pub mod mocks;

use axum_test::TestServer;
use elytra::{
    api::routes::build_app,
    auth::jwt::AuthService,
    counselor::Mailer,
    db::{TursoClient, VectorStore},
    llm::LLMClient,
    rag::embeddings::EmbeddingProvider,
    types::{ROLE_ADMIN, ROLE_STUDENT},
    utils::toml_config::{DatabaseConfig, ElytraConfig},
    AppState, ElytraConfigManager,
};
use mocks::{MockEmbedder, MockLLMClient, MockMailer, MockVectorStore};
use std::sync::Arc;

pub const TEST_SECRET: &str = "test-secret-at-least-32-characters-long";

/// Providers wired into a test app; defaults are all healthy.
pub struct TestProviders {
    pub llm: Arc<dyn LLMClient>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<MockVectorStore>,
    pub mailer: Arc<MockMailer>,
}

impl Default for TestProviders {
    fn default() -> Self {
        Self {
            llm: Arc::new(MockLLMClient::new("Consider TU Munich.")),
            embedder: Arc::new(MockEmbedder::new()),
            vector_store: Arc::new(MockVectorStore::empty()),
            mailer: Arc::new(MockMailer::new()),
        }
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub vector_store: Arc<MockVectorStore>,
    pub mailer: Arc<MockMailer>,
}

impl TestApp {
    pub fn token(&self, sub: &str, email: &str, role: &str) -> String {
        self.state
            .auth_service
            .issue_token(sub, email, role)
            .expect("token")
    }

    pub fn student_token(&self) -> String {
        self.token("student-1", "student@example.com", ROLE_STUDENT)
    }

    pub fn admin_token(&self) -> String {
        self.token("admin-1", "admin@example.com", ROLE_ADMIN)
    }
}

pub fn test_config() -> ElytraConfig {
    ElytraConfig {
        database: DatabaseConfig {
            url: ":memory:".to_string(),
            turso_url_env: None,
            turso_token_env: None,
        },
        ..ElytraConfig::default()
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(TestProviders::default()).await
}

pub async fn create_test_app_with(providers: TestProviders) -> TestApp {
    let db = TursoClient::new_memory().await.expect("in-memory database");
    let auth_service = Arc::new(AuthService::new(TEST_SECRET.to_string(), 3600));
    let vector_store: Arc<dyn VectorStore> = providers.vector_store.clone();
    let mailer: Arc<dyn Mailer> = providers.mailer.clone();

    let state = AppState {
        config_manager: Arc::new(ElytraConfigManager::from_config(test_config())),
        db: Arc::new(db),
        llm: providers.llm,
        embedder: providers.embedder,
        vector_store,
        mailer,
        auth_service,
    };

    let server = TestServer::new(build_app(state.clone())).expect("test server");

    TestApp {
        server,
        state,
        vector_store: providers.vector_store,
        mailer: providers.mailer,
    }
}
