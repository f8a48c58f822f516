// tests/common/mod.rs

#![allow(dead_code)]

use quizboard::{config::Config, db, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::SqlitePool;

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port against a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let config = Config::for_tests();

    let pool = db::connect(&config.database_url)
        .await
        .expect("Failed to open in-memory database");
    db::migrate(&pool).await.expect("Failed to migrate database");

    let state = AppState::new(pool.clone(), config.clone());
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn signup(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/signup"))
            .json(&json!({
                "email": format!("{}@example.com", username),
                "username": username,
                "password": password,
                "password_repeat": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers a fresh user and returns (user id, bearer token).
    pub async fn register_and_login(&self, prefix: &str) -> (i64, String) {
        let username = unique_name(prefix);
        let signup: Value = self.signup(&username, "password123").await.json().await.unwrap();
        let login: Value = self
            .login(&format!("{}@example.com", username), "password123")
            .await
            .json()
            .await
            .unwrap();
        (
            signup["id"].as_i64().expect("signup id"),
            login["token"].as_str().expect("token").to_string(),
        )
    }

    pub async fn create_quiz(&self, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/quizzes"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Answer ids of a quiz in question order, as served by the quiz-taking view.
    pub async fn answer_ids(&self, token: &str, quiz_id: i64) -> Vec<Vec<i64>> {
        let view: Value = self
            .client
            .get(self.url(&format!("/api/quizzes/{}", quiz_id)))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        view["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|task| {
                task["answers"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|a| a["id"].as_i64().unwrap())
                    .collect()
            })
            .collect()
    }

    pub async fn submit(&self, token: &str, quiz_id: i64, answers: &[i64]) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/api/quizzes/{}/submit", quiz_id)))
            .bearer_auth(token)
            .json(&json!({ "answers": answers }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}
