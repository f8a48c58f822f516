// tests/profile_tests.rs

mod common;

use common::{spawn_app, unique_name};
use serde_json::{Value, json};

#[tokio::test]
async fn own_profile_requires_session_and_hides_password() {
    let app = spawn_app().await;
    let (user_id, token) = app.register_and_login("me").await;

    let anonymous = app.client.get(app.url("/api/profile")).send().await.unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let me: Value = app
        .client
        .get(app.url("/api/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["id"].as_i64().unwrap(), user_id);
    assert_eq!(me["rate"].as_f64().unwrap(), 0.0);
    assert!(me.get("password").is_none());
}

#[tokio::test]
async fn public_profile_lists_records_newest_first() {
    // Arrange
    let app = spawn_app().await;
    let (user_id, token) = app.register_and_login("pub").await;
    let created: Value = app
        .create_quiz(
            &token,
            json!({
                "name": "One",
                "questions": [{ "value": "Q", "answers": [{ "value": "A", "correct": true }] }]
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let quiz_id = created["id"].as_i64().unwrap();
    let a = app.answer_ids(&token, quiz_id).await[0][0];
    app.submit(&token, quiz_id, &[]).await;
    app.submit(&token, quiz_id, &[a]).await;

    // Act: viewed anonymously
    let profile: Value = app
        .client
        .get(app.url(&format!("/api/profile/{}", user_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert!(profile["user"].get("email").is_none());
    let points: Vec<f64> = profile["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["points"].as_f64().unwrap())
        .collect();
    assert_eq!(points, vec![0.0, -1.0]);

    let missing = app
        .client
        .get(app.url("/api/profile/9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn info_change_updates_user_and_rejects_taken_username() {
    // Arrange
    let app = spawn_app().await;
    let (_, token) = app.register_and_login("info").await;
    let taken = unique_name("taken");
    app.signup(&taken, "password123").await;
    let new_name = unique_name("renamed");

    // Act
    let conflict = app
        .client
        .put(app.url("/api/profile/info"))
        .bearer_auth(&token)
        .json(&json!({
            "email": format!("{}@example.com", new_name),
            "username": taken,
        }))
        .send()
        .await
        .unwrap();
    let ok = app
        .client
        .put(app.url("/api/profile/info"))
        .bearer_auth(&token)
        .json(&json!({
            "email": format!("{}@example.com", new_name),
            "username": new_name,
            "first_name": "Ada",
            "last_name": "Lovelace"
        }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(conflict.status().as_u16(), 409);
    assert_eq!(ok.status().as_u16(), 200);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["user"]["username"], new_name.as_str());
    assert_eq!(body["user"]["first_name"], "Ada");

    // The new email is the login name now.
    let login = app
        .login(&format!("{}@example.com", new_name), "password123")
        .await;
    assert_eq!(login.status().as_u16(), 200);
}

#[tokio::test]
async fn password_change_ends_session() {
    // Arrange
    let app = spawn_app().await;
    let username = unique_name("pw");
    app.signup(&username, "password123").await;
    let email = format!("{}@example.com", username);
    let login: Value = app.login(&email, "password123").await.json().await.unwrap();
    let token = login["token"].as_str().unwrap().to_string();

    // Act: wrong old password
    let wrong = app
        .client
        .put(app.url("/api/profile/password"))
        .bearer_auth(&token)
        .json(&json!({
            "old_password": "nope",
            "password": "newpass456",
            "password_repeat": "newpass456"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 400);
    let body: Value = wrong.json().await.unwrap();
    assert_eq!(body["error"], "You messed up something.");

    // Act: correct change
    let ok = app
        .client
        .put(app.url("/api/profile/password"))
        .bearer_auth(&token)
        .json(&json!({
            "old_password": "password123",
            "password": "newpass456",
            "password_repeat": "newpass456"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status().as_u16(), 200);

    // Assert: old session is gone, new password works, old one does not
    let me = app
        .client
        .get(app.url("/api/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status().as_u16(), 401);
    assert_eq!(app.login(&email, "newpass456").await.status().as_u16(), 200);
    assert_eq!(app.login(&email, "password123").await.status().as_u16(), 401);
}
