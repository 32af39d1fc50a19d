//! Integration tests for the shell, against a fake REST API and auth service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::{build_state, create_router};

const PASSWORD: &str = "lac-2026";

/// The fake upstream: one place, one article, one member and a session flag.
#[derive(Clone)]
struct Upstream {
    signed_in: Arc<AtomicBool>,
    role: &'static str,
}

impl Upstream {
    fn router(self) -> Router {
        Router::new()
            .route("/api/profiles/me", get(profile_me))
            .route("/api/{collection}", get(collection))
            .route("/api/auth/get-session", get(get_session))
            .route("/api/auth/sign-in/email", post(sign_in))
            .route("/api/auth/sign-out", post(sign_out))
            .route("/api/auth/admin/list-users", get(list_users))
            .with_state(self)
    }
}

async fn collection(Path(name): Path<String>) -> Json<Value> {
    Json(match name.as_str() {
        "places" => json!([{
            "id": "p1",
            "slug": "le-lac",
            "name": "Le Lac",
            "mainCategory": "restaurant",
            "category": "bistrot",
            "description": "Terrasse face au lac",
            "coordinates": { "lat": 45.899, "lng": 6.129 },
            "rating": 4.5
        }]),
        "articles" => json!([{
            "id": "a1",
            "slug": "fete-du-lac",
            "title": "Fête du lac",
            "authorId": "u9",
            "publishedAt": "2026-08-01"
        }]),
        "profiles" => json!([{ "id": "u1", "slug": "camille", "fullName": "Camille" }]),
        _ => json!([]),
    })
}

async fn profile_me(State(upstream): State<Upstream>) -> impl IntoResponse {
    if !upstream.signed_in.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, Json(json!({}))).into_response();
    }
    Json(json!({
        "slug": "camille",
        "fullName": "Camille Favre",
        "role": upstream.role,
        "location": "Annecy"
    }))
    .into_response()
}

async fn get_session(State(upstream): State<Upstream>) -> Json<Value> {
    if !upstream.signed_in.load(Ordering::SeqCst) {
        return Json(Value::Null);
    }
    Json(json!({
        "session": {
            "id": "s1",
            "token": "tok-1",
            "userId": "u1",
            "expiresAt": "2027-01-01T00:00:00Z"
        },
        "user": { "id": "u1", "email": "camille@example.fr", "name": "Camille" }
    }))
}

async fn sign_in(State(upstream): State<Upstream>, Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "bad credentials" })));
    }
    upstream.signed_in.store(true, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({ "redirect": false })))
}

async fn sign_out(State(upstream): State<Upstream>) -> Json<Value> {
    upstream.signed_in.store(false, Ordering::SeqCst);
    Json(json!({ "success": true }))
}

async fn list_users() -> Json<Value> {
    Json(json!({
        "users": [{ "id": "u1", "email": "camille@example.fr", "name": "Camille" }],
        "total": 1
    }))
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_upstream("user", false).await
    }

    async fn with_upstream(role: &'static str, signed_in: bool) -> Self {
        let upstream = Upstream {
            signed_in: Arc::new(AtomicBool::new(signed_in)),
            role,
        };
        let upstream_url = serve(upstream.router()).await;

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = Config {
            api_base_url: upstream_url.clone(),
            auth_base_url: format!("{}/api/auth", upstream_url),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            storage_path: temp_dir.path().join("local.sqlite"),
            log_level: "warn".to_string(),
        };

        let state = build_state(config).await.expect("Failed to build state");
        state.app.bootstrap(state.auth.as_ref(), &state.api).await;
        state.sync.spawn_all();
        state.sync.wait_idle().await;

        let base_url = serve(create_router(state)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }

    async fn sign_in(&self) {
        let (status, _) = self
            .post(
                "/auth/sign-in",
                json!({ "email": "camille@example.fr", "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

/// Serve `router` on an ephemeral loopback port.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

// ==================== SHELL ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_router_answers_in_process_with_cors() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config {
        api_base_url: "http://127.0.0.1:9".to_string(),
        auth_base_url: "http://127.0.0.1:9/api/auth".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        storage_path: temp_dir.path().join("local.sqlite"),
        log_level: "warn".to_string(),
    };
    let state = build_state(config).await.expect("Failed to build state");

    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let resp = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_home_page_reads_mirror() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["revisionId"].as_u64().unwrap() > 0);

    let page = &body["data"];
    assert_eq!(page["page"], "home");
    assert_eq!(page["featuredPlaces"][0]["id"], "p1");
    assert_eq!(page["markers"].as_array().unwrap().len(), 1);
    assert_eq!(page["markers"][0]["path"], "/restaurant/le-lac");
    assert_eq!(page["latestArticles"][0]["slug"], "fete-du-lac");
}

#[tokio::test]
async fn test_place_detail_and_not_found() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get("/restaurant/le-lac").await;
    assert_eq!(body["data"]["page"], "place-detail");
    assert_eq!(body["data"]["place"]["name"], "Le Lac");
    assert_eq!(body["data"]["isFavorite"], false);

    let (_, body) = fixture.get("/place/p1").await;
    assert_eq!(body["data"]["place"]["slug"], "le-lac");

    let (status, body) = fixture.get("/restaurant/nulle-part").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["page"], "not-found");
    assert_eq!(body["data"]["home"], "/");

    let (status, body) = fixture.get("/pas/une/route").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["page"], "not-found");
    assert_eq!(body["data"]["path"], "/pas/une/route");
}

#[tokio::test]
async fn test_category_list_and_gated_pages() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get("/restaurants/bistrot").await;
    assert_eq!(body["data"]["page"], "category-list");
    assert_eq!(body["data"]["places"].as_array().unwrap().len(), 1);

    let (_, body) = fixture.get("/restaurants/pizzeria").await;
    assert!(body["data"]["places"].as_array().unwrap().is_empty());

    let (_, body) = fixture.get("/favoris").await;
    assert_eq!(body["data"]["page"], "sign-in-required");
    assert_eq!(body["data"]["returnTo"], "/favoris");
}

#[tokio::test]
async fn test_search_page() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get("/recherche?q=lac").await;
    let page = &body["data"];
    assert_eq!(page["page"], "search");
    let hits = page["hits"].as_array().unwrap();
    assert!(hits.iter().any(|h| h["path"] == "/restaurant/le-lac"));
    assert!(hits.iter().any(|h| h["path"] == "/article/fete-du-lac"));

    let (_, body) = fixture.get("/recherche?q=lac&filter=place").await;
    let hits = body["data"]["hits"].as_array().unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h["kind"] == "place"));

    let (_, body) = fixture.get("/recherche").await;
    assert!(body["data"]["hits"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_navigate_pushes_history() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture
        .post("/navigate", json!({ "page": "place-detail", "id": "p1" }))
        .await;
    assert_eq!(body["data"]["location"], "/restaurant/le-lac");

    let (_, body) = fixture.post("/navigate", json!({ "page": "no-such-page" })).await;
    assert_eq!(body["data"]["location"], "/");

    let (_, body) = fixture.get("/location").await;
    assert_eq!(body["data"]["location"], "/");
    assert_eq!(
        body["data"]["entries"],
        json!(["/", "/restaurant/le-lac", "/"])
    );
    assert_eq!(body["data"]["scrollResets"], 2);
}

#[tokio::test]
async fn test_consent_persists() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get("/consent").await;
    assert_eq!(body["data"]["accepted"], Value::Null);
    assert_eq!(body["data"]["showBanner"], true);

    let (status, _) = fixture.post("/consent", json!({ "accepted": true })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = fixture.get("/consent").await;
    assert_eq!(body["data"]["accepted"], true);
    assert_eq!(body["data"]["showBanner"], false);
}

#[tokio::test]
async fn test_sync_collection() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.post("/sync/places", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["collection"], "places");
    assert_eq!(body["data"]["outcome"]["received"], 1);
    assert_eq!(body["data"]["outcome"]["total"], 1);

    let (status, body) = fixture.post("/sync/unicorns", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// ==================== SESSION ====================

#[tokio::test]
async fn test_sign_in_and_out() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get("/auth/session").await;
    assert_eq!(body["data"]["user"], Value::Null);

    let (status, body) = fixture
        .post(
            "/auth/sign-in",
            json!({ "email": "camille@example.fr", "password": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    fixture.sign_in().await;
    let (_, body) = fixture.get("/auth/session").await;
    assert_eq!(body["data"]["user"]["id"], "u1");
    assert_eq!(body["data"]["user"]["fullName"], "Camille Favre");
    assert_eq!(body["data"]["authUser"]["session"]["token"], "tok-1");

    let (_, body) = fixture.post("/auth/sign-out", json!({})).await;
    assert_eq!(body["data"]["location"], "/");
    let (_, body) = fixture.get("/auth/session").await;
    assert_eq!(body["data"]["user"], Value::Null);
}

#[tokio::test]
async fn test_modals() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.post("/actions/modals/login", json!({})).await;
    assert_eq!(body["data"]["loginOpen"], true);
    let (_, body) = fixture.post("/actions/modals/register", json!({})).await;
    assert_eq!(body["data"]["loginOpen"], false);
    assert_eq!(body["data"]["registerOpen"], true);
    let (_, body) = fixture.post("/actions/modals/close", json!({})).await;
    assert_eq!(body["data"]["registerOpen"], false);

    // Reporting while signed out opens the login dialog instead
    let (_, body) = fixture
        .post("/actions/reports/open", json!({ "kind": "place", "id": "p1" }))
        .await;
    assert_eq!(body["data"]["loginOpen"], true);
    assert_eq!(body["data"]["reportTarget"], Value::Null);
}

// ==================== ACTIONS ====================

#[tokio::test]
async fn test_action_without_user_is_not_applied() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post("/actions/listings", json!({ "title": "Vélo de route" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["applied"], false);
    assert_eq!(body["data"]["record"], Value::Null);
    assert_eq!(body["data"]["location"], "/");
}

#[tokio::test]
async fn test_listing_lifecycle() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let (_, body) = fixture
        .post(
            "/actions/listings",
            json!({ "title": "Vélo de route", "price": 250.0, "category": "sport" }),
        )
        .await;
    let outcome = &body["data"];
    assert_eq!(outcome["applied"], true);
    assert_eq!(outcome["record"]["userId"], "u1");
    assert_eq!(outcome["record"]["status"], "published");
    let id = outcome["record"]["id"].as_str().unwrap().to_string();
    let location = outcome["location"].as_str().unwrap().to_string();
    assert!(location.starts_with("/annonce/velo-de-route-"));

    let (_, body) = fixture.get(&location).await;
    assert_eq!(body["data"]["page"], "listing-detail");
    assert_eq!(body["data"]["isOwner"], true);

    let (_, body) = fixture
        .send(
            reqwest::Method::PUT,
            &format!("/actions/listings/{}", id),
            json!({ "price": 200.0 }),
        )
        .await;
    assert_eq!(body["data"]["record"]["price"], 200.0);
    assert_eq!(body["data"]["record"]["title"], "Vélo de route");

    let (_, body) = fixture
        .send(
            reqwest::Method::DELETE,
            &format!("/actions/listings/{}", id),
            json!({}),
        )
        .await;
    assert_eq!(body["data"]["applied"], true);
    assert_eq!(body["data"]["location"], "/mes-annonces");

    let (_, body) = fixture.get(&location).await;
    assert_eq!(body["data"]["page"], "not-found");
}

#[tokio::test]
async fn test_favorite_toggle_restores_profile() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let (_, body) = fixture.post("/actions/places/p1/favorite", json!({})).await;
    assert_eq!(body["data"]["record"]["favoritePlaceIds"], json!(["p1"]));

    let (_, body) = fixture.get("/favoris").await;
    assert_eq!(body["data"]["places"][0]["id"], "p1");

    let (_, body) = fixture.post("/actions/places/p1/favorite", json!({})).await;
    assert_eq!(body["data"]["record"]["favoritePlaceIds"], json!([]));
}

#[tokio::test]
async fn test_live_event_vote_toggles() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let (_, body) = fixture
        .post(
            "/actions/live-events",
            json!({ "title": "Concert sur le Pâquier", "placeId": "p1" }),
        )
        .await;
    let id = body["data"]["record"]["id"].as_str().unwrap().to_string();
    let path = format!("/actions/live-events/{}/vote", id);

    let (_, body) = fixture.post(&path, json!({ "vote": "up" })).await;
    assert_eq!(body["data"]["record"]["upvotes"], json!(["u1"]));

    let (_, body) = fixture.post(&path, json!({ "vote": "down" })).await;
    assert_eq!(body["data"]["record"]["upvotes"], json!([]));
    assert_eq!(body["data"]["record"]["downvotes"], json!(["u1"]));

    let (_, body) = fixture.post(&path, json!({ "vote": "down" })).await;
    assert_eq!(body["data"]["record"]["downvotes"], json!([]));

    let (_, body) = fixture.get("/restaurant/le-lac").await;
    assert_eq!(body["data"]["liveEvents"][0]["id"], id);
    assert_eq!(body["data"]["liveEvents"][0]["score"], 0);
}

#[tokio::test]
async fn test_moderation_requires_moderator() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let (_, body) = fixture
        .send(
            reqwest::Method::PUT,
            "/actions/moderation/places/p1/status",
            json!({ "status": "rejected" }),
        )
        .await;
    assert_eq!(body["data"]["applied"], false);

    let (status, body) = fixture
        .send(
            reqwest::Method::PUT,
            "/actions/moderation/articles/a1/status",
            json!({ "status": "rejected" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// ==================== ADMIN ====================

#[tokio::test]
async fn test_admin_gate() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/auth/admin/users").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    fixture.sign_in().await;
    let (status, body) = fixture.get("/auth/admin/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (_, body) = fixture.get("/admin").await;
    assert_eq!(body["data"]["page"], "forbidden");
}

#[tokio::test]
async fn test_admin_as_moderator() {
    let fixture = TestFixture::with_upstream("moderator", true).await;

    let (status, body) = fixture.get("/auth/admin/users?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["users"][0]["id"], "u1");

    let (_, body) = fixture.get("/admin?tab=claims").await;
    assert_eq!(body["data"]["page"], "admin");
    assert_eq!(body["data"]["tab"], "claims");

    let (_, body) = fixture
        .send(
            reqwest::Method::PUT,
            "/actions/moderation/places/p1/status",
            json!({ "status": "rejected" }),
        )
        .await;
    assert_eq!(body["data"]["applied"], true);
    assert_eq!(body["data"]["record"]["status"], "rejected");

    // Still visible to moderators, hidden from the home page
    let (_, body) = fixture.get("/restaurant/le-lac").await;
    assert_eq!(body["data"]["page"], "place-detail");
    let (_, body) = fixture.get("/").await;
    assert!(body["data"]["featuredPlaces"].as_array().unwrap().is_empty());
}
