use chrono::{Duration as ChronoDuration, Utc};
use hrdesk_api::config::AppConfig;
use hrdesk_auth::HashingConfig;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

const JWT_SECRET: &str = "test-secret";
const PASSWORD: &str = "Secret1!";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, fast hashing, ephemeral port.
        let mut config = AppConfig::new(JWT_SECRET);
        config.hashing = HashingConfig::insecure_fast();
        let app = hrdesk_api::app::build_app(&config)
            .await
            .expect("failed to build app");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, name: &str, role: Option<&str>) -> reqwest::Response {
        let mut body = json!({
            "name": name,
            "email": format!("{name}@example.com"),
            "password": PASSWORD,
        });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        self.client
            .post(self.url("/api/auth/register"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// Register and return the issued token.
    async fn token_for(&self, name: &str, role: Option<&str>) -> String {
        let res = self.register(name, role).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_employee(&self, token: &str, name: &str, mobile: &str, salary: f64) -> Value {
        let res = self
            .client
            .post(self.url("/api/employees"))
            .bearer_auth(token)
            .json(&json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                "mobile": mobile,
                "position": "Software Engineer",
                "salary": salary,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, exp_offset: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = json!({
        "sub": "0190a5b2-7c1e-7d3a-9f4b-2a6c8e1d0f35",
        "role": "ADMIN",
        "name": "mallory",
        "iat": now.timestamp(),
        "exp": (now + exp_offset).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_profile() {
    let srv = TestServer::spawn().await;

    let res = srv.register("alice", None).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["role"], "EMPLOYEE");
    assert_eq!(body["user"]["status"], "ACTIVE");
    assert!(body["user"].get("password").is_none());

    let res = srv
        .client
        .post(srv.url("/api/auth/login"))
        .json(&json!({ "email": "ALICE@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let login: Value = res.json().await.unwrap();
    let token = login["token"].as_str().unwrap();

    let res = srv
        .client
        .get(srv.url("/api/auth/profile"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let profile: Value = res.json().await.unwrap();
    assert_eq!(profile["email"], "alice@example.com");
    assert_eq!(profile["id"], body["user"]["id"]);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let srv = TestServer::spawn().await;
    srv.token_for("alice", None).await;

    let mut bodies = Vec::new();
    for (email, password) in [("alice@example.com", "Wrong1!x"), ("nobody@example.com", PASSWORD)] {
        let res = srv
            .client
            .post(srv.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        bodies.push(res.json::<Value>().await.unwrap());
    }
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[0]["kind"], "invalid_credential");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/api/auth/profile")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "invalid_token");

    let res = srv
        .client
        .get(srv.url("/api/employees"))
        .header("Authorization", "Basic abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_and_forged_tokens_are_rejected() {
    let srv = TestServer::spawn().await;

    let expired = mint_jwt(JWT_SECRET, ChronoDuration::minutes(-5));
    let res = srv
        .client
        .get(srv.url("/api/auth/profile"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "expired_token");

    let forged = mint_jwt("some-other-secret", ChronoDuration::minutes(10));
    let res = srv
        .client
        .get(srv.url("/api/users"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "invalid_token");
}

#[tokio::test]
async fn registration_errors_map_to_status_codes() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/auth/register"))
        .json(&json!({ "name": "x", "email": "nope", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "validation");
    for field in ["name", "email", "password"] {
        assert!(body["fields"].get(field).is_some(), "missing {field}");
    }

    assert_eq!(srv.register("alice", None).await.status(), StatusCode::CREATED);
    let res = srv.register("alice", None).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "conflict");
    assert!(body["fields"].get("email").is_some());

    let res = srv
        .client
        .post(srv.url("/api/auth/register"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_one_admin_may_exist() {
    let srv = TestServer::spawn().await;

    assert_eq!(srv.register("root", Some("ADMIN")).await.status(), StatusCode::CREATED);

    let res = srv.register("root2", Some("ADMIN")).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert!(body["fields"].get("role").is_some());
}

#[tokio::test]
async fn user_management_requires_manage_users() {
    let srv = TestServer::spawn().await;
    let employee = srv.token_for("erin", None).await;
    let admin = srv.token_for("root", Some("ADMIN")).await;

    let res = srv
        .client
        .get(srv.url("/api/users"))
        .bearer_auth(&employee)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "forbidden");

    let res = srv
        .client
        .get(srv.url("/api/users"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let users: Value = res.json().await.unwrap();
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn users_update_themselves_but_not_their_role() {
    let srv = TestServer::spawn().await;
    let res = srv.register("erin", None).await;
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap();
    let id = body["user"]["id"].as_str().unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/api/users/{id}")))
        .bearer_auth(token)
        .json(&json!({ "name": "erin_b" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "erin_b");

    let res = srv
        .client
        .put(srv.url(&format!("/api/users/{id}")))
        .bearer_auth(token)
        .json(&json!({ "role": "MANAGER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_manages_users() {
    let srv = TestServer::spawn().await;
    let admin = srv.token_for("root", Some("ADMIN")).await;

    let res = srv
        .client
        .post(srv.url("/api/users"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "mona",
            "email": "mona@example.com",
            "password": PASSWORD,
            "role": "MANAGER",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["permissions"]["can_create_employee"], true);
    assert_eq!(created["permissions"]["can_manage_users"], false);
    let id = created["id"].as_str().unwrap().to_string();

    let res = srv
        .client
        .put(srv.url(&format!("/api/users/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "role": "EMPLOYEE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let demoted: Value = res.json().await.unwrap();
    assert_eq!(demoted["role"], "EMPLOYEE");
    assert_eq!(demoted["permissions"]["can_create_employee"], false);

    let res = srv
        .client
        .delete(srv.url(&format!("/api/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User deleted successfully");

    let res = srv
        .client
        .get(srv.url(&format!("/api/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(srv.url("/api/users/not-a-uuid"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn employee_lifecycle() {
    let srv = TestServer::spawn().await;
    let admin = srv.token_for("root", Some("ADMIN")).await;

    let ada = srv.create_employee(&admin, "Ada Lovelace", "0123456789", 9000.0).await;
    srv.create_employee(&admin, "Grace Hopper", "0123456780", 8000.0).await;
    assert_eq!(ada["kind"], "employee");
    assert_eq!(ada["position"], "Software Engineer");
    let id = ada["id"].as_str().unwrap().to_string();

    let res = srv
        .client
        .get(srv.url("/api/employees?search=ADA&sort_by=salary&sort_order=asc"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["current_page"], 1);
    assert_eq!(page["employees"][0]["name"], "Ada Lovelace");

    let res = srv
        .client
        .get(srv.url("/api/employees/stats"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let stats: Value = res.json().await.unwrap();
    assert_eq!(stats["total_employees"], 2);
    assert_eq!(stats["departments"][0]["name"], "Software Engineer");
    assert_eq!(stats["departments"][0]["average_salary"], 8500.0);

    let res = srv
        .client
        .put(srv.url(&format!("/api/employees/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "salary": 9500 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Employee updated successfully");
    assert_eq!(body["employee"]["salary"], 9500.0);

    let res = srv
        .client
        .delete(srv.url(&format!("/api/employees/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(srv.url(&format!("/api/employees/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn employee_writes_follow_role_permissions() {
    let srv = TestServer::spawn().await;
    let manager = srv.token_for("mona", Some("MANAGER")).await;
    let employee = srv.token_for("erin", None).await;

    let res = srv
        .client
        .post(srv.url("/api/employees"))
        .bearer_auth(&employee)
        .json(&json!({ "name": "Tom Sales" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let tom = srv.create_employee(&manager, "Tom Sales", "0987654321", 3000.0).await;
    let id = tom["id"].as_str().unwrap();

    let res = srv
        .client
        .delete(srv.url(&format!("/api/employees/{id}")))
        .bearer_auth(&manager)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .get(srv.url("/api/employees?limit=0"))
        .bearer_auth(&employee)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
