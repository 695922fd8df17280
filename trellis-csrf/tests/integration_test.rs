//! Integration tests for trellis-csrf

use trellis_core::*;
use trellis_csrf::*;

fn app() -> Application {
    let routes = RouteTable::new()
        .get("/profile", |_, ctx| {
            let token = ctx.csrf_token()?;
            ctx.write(token);
            Ok(Output::Empty)
        })
        .unwrap()
        .post("/profile", |_, ctx| {
            ctx.write("saved");
            Ok(Output::Empty)
        })
        .unwrap()
        .post("/logout", |_, ctx| {
            ctx.session_mut().invalidate();
            ctx.redirect("/");
            Ok(Output::Empty)
        })
        .unwrap()
        .post("/webhooks/mail", |_, ctx| {
            ctx.write("hook");
            Ok(Output::Empty)
        })
        .unwrap();

    let guard = CsrfGuard::new(CsrfConfig::default().exclude_path("/webhooks")).unwrap();
    Application::builder().routes(routes).csrf(guard).build().unwrap()
}

fn session_cookie(response: &HttpResponse) -> String {
    response
        .header("Set-Cookie")
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_token_round_trip() {
    let app = app();

    let page = app.handle(HttpRequest::get("/profile")).await;
    let cookie = session_cookie(&page);
    let token = page.text();

    let again = app
        .handle(HttpRequest::get("/profile").with_header("Cookie", cookie.as_str()))
        .await;
    assert_eq!(again.text(), token);

    let submit = HttpRequest::post("/profile")
        .with_header("Cookie", cookie.as_str())
        .with_form(&[("_token", token.as_str())])
        .unwrap();
    let response = app.handle(submit).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "saved");

    let via_header = HttpRequest::post("/profile")
        .with_header("Cookie", cookie.as_str())
        .with_header("X-CSRF-Token", token.as_str());
    assert_eq!(app.handle(via_header).await.status, 200);
}

#[tokio::test]
async fn test_forged_and_missing_tokens_are_forbidden() {
    let app = app();
    let page = app.handle(HttpRequest::get("/profile")).await;
    let cookie = session_cookie(&page);

    let forged = HttpRequest::post("/profile")
        .with_header("Cookie", cookie.as_str())
        .with_form(&[("_token", "forged")])
        .unwrap();
    assert_eq!(app.handle(forged).await.status, 403);

    let missing = HttpRequest::post("/profile").with_header("Cookie", cookie.as_str());
    assert_eq!(app.handle(missing).await.status, 403);

    let fresh = app.handle(HttpRequest::post("/profile")).await;
    assert_eq!(fresh.status, 403);
}

#[tokio::test]
async fn test_sessions_get_distinct_tokens() {
    let app = app();
    let a = app.handle(HttpRequest::get("/profile")).await.text();
    let b = app.handle(HttpRequest::get("/profile")).await.text();
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_invalidate_drops_token() {
    let app = app();
    let page = app.handle(HttpRequest::get("/profile")).await;
    let cookie = session_cookie(&page);
    let token = page.text();

    let logout = HttpRequest::post("/logout")
        .with_header("Cookie", cookie.as_str())
        .with_form(&[("_token", token.as_str())])
        .unwrap();
    let response = app.handle(logout).await;
    assert_eq!(response.status, 302);
    let new_cookie = session_cookie(&response);
    assert_ne!(new_cookie, cookie);

    let replay = HttpRequest::post("/profile")
        .with_header("Cookie", new_cookie.as_str())
        .with_form(&[("_token", token.as_str())])
        .unwrap();
    assert_eq!(app.handle(replay).await.status, 403);
}

#[tokio::test]
async fn test_excluded_path_skips_check() {
    let app = app();
    let response = app.handle(HttpRequest::post("/webhooks/mail")).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "hook");
}

#[tokio::test]
async fn test_json_rejection_body() {
    let app = app();
    let response = app
        .handle(HttpRequest::post("/profile").with_header("Accept", "application/json"))
        .await;
    assert_eq!(response.status, 403);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("CSRF"));
}
