use actix_web::{http::StatusCode, test, web, App};
use conduit_server::{configure, AppState, Settings};
use serde_json::{json, Value};

fn state() -> web::Data<AppState> {
    let config = Settings::new_for_test().expect("Failed to load test config");
    web::Data::new(AppState::in_memory(config))
}

fn sign_up(email: &str, first_name: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/authentication/signUp")
        .set_json(json!({
            "email": email,
            "password": "password123",
            "firstName": first_name,
            "lastName": "Tester"
        }))
}

fn sign_in(email: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/authentication/signIn")
        .set_json(json!({ "email": email, "password": "password123" }))
}

fn authed(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.insert_header(("Authorization", format!("Bearer {}", token)))
}

#[test_log::test(actix_web::test)]
async fn test_follow_and_unfollow_scenario() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

    let a: Value = test::call_and_read_body_json(&app, sign_up("a@example.com", "Ann").to_request()).await;
    assert_eq!(a["id"], 1);
    let pair: Value = test::call_and_read_body_json(&app, sign_in("a@example.com").to_request()).await;
    let token = pair["accessToken"].as_str().unwrap().to_string();
    let b: Value = test::call_and_read_body_json(&app, sign_up("b@example.com", "Ben").to_request()).await;
    assert_eq!(b["id"], 2);

    let req = authed(test::TestRequest::post().uri("/api/users/1/follow/2"), &token).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    // Following twice keeps a single edge
    let req = authed(test::TestRequest::post().uri("/api/users/1/follow/2"), &token).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = authed(test::TestRequest::get().uri("/api/users/1"), &token).to_request();
    let a: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(a["followingCount"], 1);
    assert_eq!(a["followersCount"], 0);
    let req = authed(test::TestRequest::get().uri("/api/users/2"), &token).to_request();
    let b: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(b["followersCount"], 1);
    assert_eq!(b["followingCount"], 0);

    let req = authed(test::TestRequest::delete().uri("/api/users/1/follow/2"), &token).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = authed(test::TestRequest::get().uri("/api/users/1"), &token).to_request();
    let a: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(a["followingCount"], 0);
    let req = authed(test::TestRequest::get().uri("/api/users/2"), &token).to_request();
    let b: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(b["followersCount"], 0);
}

#[test_log::test(actix_web::test)]
async fn test_follow_rejections() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
    test::call_service(&app, sign_up("a@example.com", "Ann").to_request()).await;
    test::call_service(&app, sign_up("b@example.com", "Ben").to_request()).await;
    let pair: Value = test::call_and_read_body_json(&app, sign_in("a@example.com").to_request()).await;
    let token = pair["accessToken"].as_str().unwrap();

    let cases = [
        ("/api/users/2/follow/1", StatusCode::FORBIDDEN),
        ("/api/users/1/follow/1", StatusCode::BAD_REQUEST),
        ("/api/users/1/follow/99", StatusCode::NOT_FOUND),
    ];
    for (uri, status) in cases {
        let req = authed(test::TestRequest::post().uri(uri), token).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), status, "{}", uri);
    }

    let req = test::TestRequest::post().uri("/api/users/1/follow/2").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[test_log::test(actix_web::test)]
async fn test_update_profile() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
    test::call_service(&app, sign_up("a@example.com", "Ann").to_request()).await;
    test::call_service(&app, sign_up("b@example.com", "Ben").to_request()).await;
    let pair: Value = test::call_and_read_body_json(&app, sign_in("a@example.com").to_request()).await;
    let token = pair["accessToken"].as_str().unwrap();

    let body = json!({
        "email": "ann@example.com",
        "password": "new-password",
        "firstName": "Ann",
        "lastName": "Updated"
    });
    let req = authed(test::TestRequest::put().uri("/api/users/1"), token)
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(test::read_body(resp).await.is_empty());

    let req = authed(test::TestRequest::get().uri("/api/users/1"), token).to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["email"], "ann@example.com");
    assert_eq!(profile["name"], "Ann Updated");

    let req = test::TestRequest::post()
        .uri("/api/authentication/signIn")
        .set_json(json!({ "email": "ann@example.com", "password": "new-password" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = authed(test::TestRequest::put().uri("/api/users/2"), token)
        .set_json(&body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let taken = json!({
        "email": "b@example.com",
        "password": "new-password",
        "firstName": "Ann",
        "lastName": "Updated"
    });
    let req = authed(test::TestRequest::put().uri("/api/users/1"), token)
        .set_json(&taken)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[test_log::test(actix_web::test)]
async fn test_feed_and_favorites() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
    test::call_service(&app, sign_up("reader@example.com", "Rae").to_request()).await;
    test::call_service(&app, sign_up("author@example.com", "Art").to_request()).await;
    let reader: Value = test::call_and_read_body_json(&app, sign_in("reader@example.com").to_request()).await;
    let reader = reader["accessToken"].as_str().unwrap().to_string();
    let author: Value = test::call_and_read_body_json(&app, sign_in("author@example.com").to_request()).await;
    let author = author["accessToken"].as_str().unwrap().to_string();

    let mut ids = Vec::new();
    for i in 0..20 {
        let req = authed(test::TestRequest::post().uri("/api/articles"), &author)
            .set_json(json!({ "title": format!("Article {}", i), "content": "Body" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let article: Value = test::read_body_json(resp).await;
        assert_eq!(article["authorName"], "Art Tester");
        ids.push(article["id"].as_i64().unwrap());
    }

    // Not following anyone yet
    let req = authed(test::TestRequest::get().uri("/api/articles"), &reader).to_request();
    let feed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(feed.is_empty());

    let req = authed(test::TestRequest::post().uri("/api/users/1/follow/2"), &reader).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = authed(test::TestRequest::get().uri("/api/articles?pageIndex=1&pageSize=100"), &reader).to_request();
    let feed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed.len(), 15);

    let req = authed(test::TestRequest::get().uri("/api/articles?pageIndex=1&pageSize=10"), &reader).to_request();
    let first: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let req = authed(test::TestRequest::get().uri("/api/articles?pageIndex=2&pageSize=10"), &reader).to_request();
    let second: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let mut seen: Vec<i64> = first.iter().chain(second.iter()).map(|a| a["id"].as_i64().unwrap()).collect();
    // Same timestamps fall back to newest id first
    assert!(seen.windows(2).all(|w| w[0] > w[1]));
    seen.sort_unstable();
    ids.sort_unstable();
    assert_eq!(seen, ids);

    let req = authed(test::TestRequest::get().uri("/api/articles?pageIndex=0&pageSize=10"), &reader).to_request();
    let page_zero: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page_zero, first);

    let target = ids[0];
    for _ in 0..2 {
        let req = authed(test::TestRequest::post().uri(&format!("/api/articles/{}/favorite", target)), &reader)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }
    let req = test::TestRequest::get().uri(&format!("/api/articles/{}", target)).to_request();
    let article: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(article["favoritedCount"], 1);

    let req = authed(test::TestRequest::delete().uri(&format!("/api/articles/{}/favorite", target)), &reader)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri(&format!("/api/articles/{}", target)).to_request();
    let article: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(article["favoritedCount"], 0);

    let req = authed(test::TestRequest::post().uri("/api/articles/999/favorite"), &reader).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[test_log::test(actix_web::test)]
async fn test_article_ownership_and_comments() {
    let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
    test::call_service(&app, sign_up("author@example.com", "Art").to_request()).await;
    test::call_service(&app, sign_up("reader@example.com", "Rae").to_request()).await;
    let author: Value = test::call_and_read_body_json(&app, sign_in("author@example.com").to_request()).await;
    let author = author["accessToken"].as_str().unwrap().to_string();
    let reader: Value = test::call_and_read_body_json(&app, sign_in("reader@example.com").to_request()).await;
    let reader = reader["accessToken"].as_str().unwrap().to_string();

    let req = authed(test::TestRequest::post().uri("/api/articles"), &author)
        .set_json(json!({ "title": "Hello", "content": "World" }))
        .to_request();
    let article: Value = test::call_and_read_body_json(&app, req).await;
    let id = article["id"].as_i64().unwrap();

    let req = authed(test::TestRequest::post().uri("/api/articles"), &author)
        .set_json(json!({ "title": "", "content": "World" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = authed(test::TestRequest::put().uri(&format!("/api/articles/{}", id)), &reader)
        .set_json(json!({ "title": "Mine now", "content": "World" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = authed(test::TestRequest::put().uri(&format!("/api/articles/{}", id)), &author)
        .set_json(json!({ "title": "Hello again", "content": "World" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = authed(test::TestRequest::post().uri(&format!("/api/articles/{}/comments", id)), &reader)
        .set_json(json!({ "content": "Nice one" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let comment: Value = test::read_body_json(resp).await;
    assert_eq!(comment["articleTitle"], "Hello again");
    assert_eq!(comment["authorName"], "Rae Tester");
    let comment_id = comment["id"].as_i64().unwrap();

    let req = test::TestRequest::get().uri(&format!("/api/articles/{}/comments", id)).to_request();
    let comments: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comments.len(), 1);

    let uri = format!("/api/articles/{}/comments/{}", id, comment_id);
    let req = authed(test::TestRequest::delete().uri(&uri), &author).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    let req = authed(test::TestRequest::delete().uri(&uri), &reader).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = authed(test::TestRequest::delete().uri(&format!("/api/articles/{}", id)), &author).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::get().uri(&format!("/api/articles/{}", id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
