use serde::Deserialize;
use serde_json::json;
use supabase_rest::{ClientConfig, ClientError, SupabaseClient};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct LikeRow {
    post_id: String,
}

async fn client_for(server: &MockServer) -> SupabaseClient {
    SupabaseClient::new(ClientConfig::new(server.uri(), "anon-key")).unwrap()
}

#[tokio::test]
async fn select_sends_filters_and_anon_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/post_likes"))
        .and(query_param("select", "post_id"))
        .and(query_param("user_id", "eq.user-1"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "post_id": "a" }, { "post_id": "c" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let rows: Vec<LikeRow> = client
        .from("post_likes")
        .select("post_id")
        .eq("user_id", "user-1")
        .fetch_all()
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            LikeRow { post_id: "a".into() },
            LikeRow { post_id: "c".into() }
        ]
    );
}

#[tokio::test]
async fn fetch_optional_returns_none_on_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/post_likes"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let row: Option<LikeRow> = client
        .from("post_likes")
        .eq("post_id", "p1")
        .eq("user_id", "u1")
        .fetch_optional()
        .await
        .unwrap();

    assert!(row.is_none());
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/post_likes"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .from("post_likes")
        .insert_minimal(&json!({ "post_id": "p1", "user_id": "u1" }))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 409);
            assert!(message.contains("duplicate key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn rpc_posts_named_function_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/increment_likes"))
        .and(body_json(json!({ "post_id": "p1" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client
        .rpc("increment_likes", &json!({ "post_id": "p1" }))
        .await
        .unwrap();
}

#[tokio::test]
async fn sign_in_switches_bearer_to_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "refresh_token": "refresh",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "user-1", "email": "reader@example.com" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "user-1", "email": "reader@example.com" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let session = client
        .sign_in_with_password("reader@example.com", "secret")
        .await
        .unwrap();
    assert_eq!(session.user.id, "user-1");

    let user = client.current_user().await.unwrap().unwrap();
    assert_eq!(user.email.as_deref(), Some("reader@example.com"));
}

#[tokio::test]
async fn sign_up_without_confirmation_returns_bare_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "new-user", "email": "new@example.com" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let user = client.sign_up("new@example.com", "secret").await.unwrap();

    assert_eq!(user.id, "new-user");
    assert!(client.session().await.is_none());
}

#[tokio::test]
async fn upload_returns_public_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/cultural-posts/123.png"))
        .and(header("content-type", "image/png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "Key": "cultural-posts/123.png" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let url = client
        .upload("cultural-posts", "123.png", vec![0x89, 0x50], "image/png")
        .await
        .unwrap();

    assert_eq!(
        url,
        format!("{}/storage/v1/object/public/cultural-posts/123.png", server.uri())
    );
}

#[tokio::test]
async fn unfiltered_delete_is_refused_locally() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let err = client.from("jobs").delete().await.unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}
