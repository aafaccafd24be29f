// handlers/public/auth/mod.rs - Token acquisition endpoints (no JWT required)

pub mod login;
pub mod logout;
pub mod refresh;
pub mod register;
pub mod utils;

pub use login::login_post;
pub use logout::logout_post;
pub use refresh::refresh_post;
pub use register::register_post;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::json;

    use crate::testing::TestContext;

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let ctx = TestContext::new();
        let user = ctx.create_test_user("hana").await;

        let same_email = ctx
            .request(
                Method::POST,
                "/api/register",
                None,
                Some(json!({ "username": "someone_else", "email": user.email, "password": user.password })),
            )
            .await;
        assert_eq!(same_email.status, StatusCode::CONFLICT);
        assert_eq!(same_email.json()["error"], "Email is already registered");

        let same_name = ctx
            .request(
                Method::POST,
                "/api/register",
                None,
                Some(json!({ "username": user.username, "email": "new@example.com", "password": user.password })),
            )
            .await;
        assert_eq!(same_name.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn registration_validates_fields() {
        let ctx = TestContext::new();
        let response = ctx
            .request(
                Method::POST,
                "/api/register",
                None,
                Some(json!({ "username": "x", "email": "nope", "password": "short" })),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.json()["field_errors"]["password"].is_string());

        let not_json = ctx
            .send(
                Request::post("/api/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{"))
                    .unwrap(),
            )
            .await;
        assert_eq!(not_json.status, StatusCode::BAD_REQUEST);
        assert_eq!(not_json.json()["code"], "INVALID_JSON");
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_uniformly() {
        let ctx = TestContext::new();
        let user = ctx.create_test_user("ivan").await;

        let wrong_password = ctx
            .request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": user.email, "password": "not the password" })),
            )
            .await;
        let unknown = ctx
            .request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": "ghost@example.com", "password": "whatever123" })),
            )
            .await;

        assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.json()["error"], unknown.json()["error"]);
    }

    #[tokio::test]
    async fn login_sets_refresh_cookie_and_email_is_case_insensitive() {
        let ctx = TestContext::new();
        let user = ctx.create_test_user("jane").await;

        let response = ctx
            .request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": user.email.to_uppercase(), "password": user.password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let data = response.json()["data"].clone();
        assert_eq!(data["token_type"], "Bearer");
        assert_eq!(data["user"]["username"], user.username.as_str());
        assert!(data["user"].get("password_hash").is_none());

        let cookie = response.header("set-cookie").unwrap();
        assert!(cookie.starts_with(&format!("refresh_token={};", data["refresh_token"].as_str().unwrap())));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn refresh_tokens_are_single_use() {
        let ctx = TestContext::new();
        let user = ctx.create_test_user("kim").await;

        let first = ctx
            .request(
                Method::POST,
                "/api/refresh-token",
                None,
                Some(json!({ "refresh_token": user.refresh_token })),
            )
            .await;
        assert_eq!(first.status, StatusCode::OK);
        let rotated = first.json()["data"]["refresh_token"].as_str().unwrap().to_string();
        assert_ne!(rotated, user.refresh_token);

        let replay = ctx
            .request(
                Method::POST,
                "/api/refresh-token",
                None,
                Some(json!({ "refresh_token": user.refresh_token })),
            )
            .await;
        assert_eq!(replay.status, StatusCode::UNAUTHORIZED);

        // The rotated token works from the cookie too
        let via_cookie = ctx
            .send(
                Request::post("/api/refresh-token")
                    .header(header::COOKIE, format!("refresh_token={}", rotated))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(via_cookie.status, StatusCode::OK);

        let new_access = via_cookie.json()["data"]["access_token"].as_str().unwrap().to_string();
        let whoami = ctx.request(Method::GET, "/api/auth/whoami", Some(&new_access), None).await;
        assert_eq!(whoami.json()["data"]["id"], user.id.to_string());
    }

    #[tokio::test]
    async fn refresh_without_token_is_unauthorized() {
        let ctx = TestContext::new();
        let response = ctx.request(Method::POST, "/api/refresh-token", None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.json()["error"], "No refresh token provided");
    }

    #[tokio::test]
    async fn logout_revokes_refresh_token() {
        let ctx = TestContext::new();
        let user = ctx.create_test_user("lee").await;

        let logout = ctx
            .request(
                Method::POST,
                "/api/logout",
                None,
                Some(json!({ "refresh_token": user.refresh_token })),
            )
            .await;
        assert_eq!(logout.status, StatusCode::OK);
        assert_eq!(logout.json()["success"], true);
        assert!(logout.header("set-cookie").unwrap().contains("Max-Age=0"));

        let refresh = ctx
            .request(
                Method::POST,
                "/api/refresh-token",
                None,
                Some(json!({ "refresh_token": user.refresh_token })),
            )
            .await;
        assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);

        // Logging out without a token still succeeds
        let anonymous = ctx.request(Method::POST, "/api/logout", None, None).await;
        assert_eq!(anonymous.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_all_revokes_every_session() {
        let ctx = TestContext::new();
        let user = ctx.create_test_user("mia").await;

        let second_login = ctx
            .request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": user.email, "password": user.password })),
            )
            .await;
        let second_refresh = second_login.json()["data"]["refresh_token"].as_str().unwrap().to_string();

        let revoke = ctx
            .request(Method::POST, "/api/auth/logout-all", Some(&user.access_token), None)
            .await;
        assert_eq!(revoke.status, StatusCode::OK);
        assert_eq!(revoke.json()["data"]["revoked"], 2);

        for token in [&user.refresh_token, &second_refresh] {
            let refresh = ctx
                .request(
                    Method::POST,
                    "/api/refresh-token",
                    None,
                    Some(json!({ "refresh_token": token })),
                )
                .await;
            assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);
        }
    }
}
