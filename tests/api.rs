use std::fs;
use std::time::Duration;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use tempfile::TempDir;

use twitter_api::config::MIN_BCRYPT_COST;
use twitter_api::handlers;
use twitter_api::services::Services;
use twitter_api::store::JsonFileStore;

const USER_A: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const USER_B: &str = "9b2f7a1e-0c4d-4e8a-a3f1-5d6c7b8e9f00";
const TWEET: &str = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";

fn services(dir: &TempDir) -> web::Data<Services> {
    let store = JsonFileStore::new(dir.path(), Duration::from_secs(5));
    web::Data::new(Services::open(&store, MIN_BCRYPT_COST).unwrap())
}

async fn app(
    dir: &TempDir,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(services(dir))
            .configure(handlers::configure),
    )
    .await
}

fn signup_body(id: &str, email: &str) -> Value {
    json!({
        "user_id": id,
        "email": email,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "birth_date": "1815-12-10",
        "password": "password1",
    })
}

async fn send(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    req: test::TestRequest,
) -> (StatusCode, Value) {
    let response = test::call_service(app, req.to_request()).await;
    let status = response.status();
    let body = test::read_body(response).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json body")
    };
    (status, value)
}

#[actix_web::test]
async fn home_says_hello() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;
    let (status, body) = send(&app, test::TestRequest::get().uri("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Hello World" }));
}

#[actix_web::test]
async fn signup_login_and_public_shape() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, user) = send(
        &app,
        test::TestRequest::post()
            .uri("/signup")
            .set_json(signup_body(USER_A, "a@b.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["user_id"], USER_A);
    assert_eq!(user["birth_date"], "1815-12-10");
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());

    let (status, logged_in) = send(
        &app,
        test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "a@b.com", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logged_in, user);

    for (email, password) in [("a@b.com", "wrong"), ("who@b.com", "password1")] {
        let (status, body) = send(
            &app,
            test::TestRequest::post()
                .uri("/login")
                .set_json(json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");
    }

    let stored = fs::read_to_string(dir.path().join("users.json")).unwrap();
    assert!(!stored.contains("password1"));
    assert!(stored.contains("password_hash"));
}

#[actix_web::test]
async fn invalid_signup_lists_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, body) = send(
        &app,
        test::TestRequest::post().uri("/signup").set_json(json!({
            "user_id": "nope",
            "email": "not-an-email",
            "first_name": "",
            "last_name": "Lovelace",
            "password": "short",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_request");
    let details = body["details"].as_object().unwrap();
    for field in ["user_id", "email", "first_name", "password"] {
        assert!(details.contains_key(field), "missing {field}: {body}");
    }
    assert!(!details.contains_key("last_name"));
}

#[actix_web::test]
async fn malformed_json_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;
    let (status, body) = send(
        &app,
        test::TestRequest::post()
            .uri("/tweets/")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"]["body"].is_array());
}

#[actix_web::test]
async fn duplicate_signup_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;
    let signup = |id: &str, email: &str| {
        test::TestRequest::post()
            .uri("/signup")
            .set_json(signup_body(id, email))
    };

    let (status, _) = send(&app, signup(USER_A, "a@b.com")).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, signup(USER_B, "a@b.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, signup(USER_A, "b@b.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, users) = send(&app, test::TestRequest::get().uri("/users/")).await;
    assert_eq!(users.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, signup(USER_B, "b@b.com")).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(
        &app,
        test::TestRequest::put()
            .uri(&format!("/users/{USER_B}"))
            .set_json(signup_body(USER_B, "a@b.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[actix_web::test]
async fn user_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    for (id, email) in [(USER_A, "a@b.com"), (USER_B, "b@b.com")] {
        let (status, _) = send(
            &app,
            test::TestRequest::post()
                .uri("/signup")
                .set_json(signup_body(id, email)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, updated) = send(
        &app,
        test::TestRequest::put()
            .uri(&format!("/users/{USER_A}"))
            .set_json(json!({
                "user_id": USER_B,
                "email": "a@b.com",
                "first_name": "Augusta",
                "last_name": "King",
                "birth_date": null,
            })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["user_id"], USER_A);
    assert_eq!(updated["first_name"], "Augusta");
    assert_eq!(updated["birth_date"], Value::Null);

    let (status, fetched) = send(
        &app,
        test::TestRequest::get().uri(&format!("/users/{USER_A}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, updated);

    let (status, deleted) = send(
        &app,
        test::TestRequest::delete().uri(&format!("/users/{USER_A}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, updated);

    let (status, body) = send(
        &app,
        test::TestRequest::get().uri(&format!("/users/{USER_A}")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (_, users) = send(&app, test::TestRequest::get().uri("/users/")).await;
    let ids: Vec<_> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["user_id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(USER_B)]);
}

#[actix_web::test]
async fn missing_and_malformed_ids() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, _) = send(
        &app,
        test::TestRequest::get().uri(&format!("/tweets/{TWEET}")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        test::TestRequest::put()
            .uri(&format!("/users/{USER_A}"))
            .set_json(signup_body(USER_A, "a@b.com")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, test::TestRequest::delete().uri("/tweets/42")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"]["id"].is_array());
}

#[actix_web::test]
async fn tweet_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    let (status, created) = send(
        &app,
        test::TestRequest::post().uri("/tweets/").set_json(json!({
            "tweet_id": TWEET,
            "user_id": USER_A,
            "content": "hello world",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["tweet_id"], TWEET);
    assert!(created["created_at"].as_str().unwrap().ends_with('Z'));
    assert_eq!(created["updated_at"], Value::Null);

    let (status, updated) = send(
        &app,
        test::TestRequest::put()
            .uri(&format!("/tweets/{TWEET}"))
            .set_json(json!({
                "tweet_id": USER_B,
                "user_id": USER_A,
                "content": "hello again",
                "updated_at": "2030-01-01T00:00:00Z",
            })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["tweet_id"], TWEET);
    assert_eq!(updated["created_at"], created["created_at"]);
    assert_eq!(updated["updated_at"], "2030-01-01T00:00:00Z");

    let (_, all) = send(&app, test::TestRequest::get().uri("/tweets/")).await;
    assert_eq!(all, json!([updated.clone()]));

    let (status, deleted) = send(
        &app,
        test::TestRequest::delete().uri(&format!("/tweets/{TWEET}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, updated);

    let (_, all) = send(&app, test::TestRequest::get().uri("/tweets/")).await;
    assert_eq!(all, json!([]));
}

#[actix_web::test]
async fn tweet_content_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir).await;

    for (len, expected) in [
        (0, StatusCode::UNPROCESSABLE_ENTITY),
        (1, StatusCode::CREATED),
        (256, StatusCode::CREATED),
        (257, StatusCode::UNPROCESSABLE_ENTITY),
    ] {
        let (status, _) = send(
            &app,
            test::TestRequest::post().uri("/tweets/").set_json(json!({
                "tweet_id": uuid::Uuid::new_v4(),
                "user_id": USER_A,
                "content": "x".repeat(len),
            })),
        )
        .await;
        assert_eq!(status, expected, "content length {len}");
    }
}

#[actix_web::test]
async fn data_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let app = app(&dir).await;
        let (status, _) = send(
            &app,
            test::TestRequest::post()
                .uri("/signup")
                .set_json(signup_body(USER_A, "a@b.com")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let app = app(&dir).await;
    let (status, _) = send(
        &app,
        test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "a@b.com", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
