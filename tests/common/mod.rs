#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use sqlx::{pool::PoolConnection, Sqlite};
use tower::ServiceExt;
use warbler::{
    config::settings::{Environment, Settings},
    users::{NewUser, User},
    AppState,
};

pub const PASSWORD: &str = "password";

/// An isolated app over a fresh in-memory database, driven in-process.
///
/// The test pool holds a single connection: drop any connection taken with
/// [`TestApp::conn`] before sending requests.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    cookie: Option<String>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let settings = Settings::for_environment(Environment::Testing).expect("testing settings");
        Self::with_settings(settings).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let state = AppState::new(settings).await.expect("app state");
        let router = warbler::router(state.clone());
        Self {
            state,
            router,
            cookie: None,
        }
    }

    pub async fn conn(&self) -> PoolConnection<Sqlite> {
        self.state.pool().acquire().await.expect("connection")
    }

    /// Inserts a user through the signup path, so the password is hashed.
    pub async fn signup(&self, username: &str) -> User {
        let mut conn = self.conn().await;
        User::signup(
            &mut conn,
            NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: PASSWORD.to_string(),
                ..Default::default()
            },
        )
        .await
        .expect("signup")
    }

    pub async fn login(&mut self, username: &str) {
        let resp = self
            .post_form("/login", &[("username", username), ("password", PASSWORD)])
            .await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER, "login failed: {}", resp.body);
    }

    /// The `name=value` cookie pair sent with the next request.
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn set_cookie(&mut self, pair: &str) {
        self.cookie = Some(pair.to_string());
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post_form(&mut self, uri: &str, form: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(form).expect("form encodes");
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn get_following_redirects(&mut self, uri: &str) -> TestResponse {
        let resp = self.get(uri).await;
        self.follow_redirects(resp).await
    }

    pub async fn post_form_following_redirects(
        &mut self,
        uri: &str,
        form: &[(&str, &str)],
    ) -> TestResponse {
        let resp = self.post_form(uri, form).await;
        self.follow_redirects(resp).await
    }

    async fn follow_redirects(&mut self, mut resp: TestResponse) -> TestResponse {
        for _ in 0..10 {
            if !resp.status.is_redirection() {
                return resp;
            }
            let location = resp.location.clone().expect("redirect has a location");
            resp = self.get(&location).await;
        }
        panic!("too many redirects");
    }

    async fn send(&mut self, method: Method, uri: &str, form: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match form {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let raw = set_cookie.to_str().expect("ascii cookie");
            let pair = raw.split(';').next().unwrap_or_default().to_string();
            self.cookie = Some(pair);
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().expect("ascii location").to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

pub fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@test.com"),
        password: "HASHED_PASSWORD".to_string(),
        ..Default::default()
    }
}
