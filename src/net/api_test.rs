use super::*;
use crate::net::error::ErrorKind;
use crate::net::testing::{ScriptedTransport, identity_json};
use crate::net::transport::{HttpMethod, RequestBody, TransportError};
use crate::token::TokenHolder;

fn api(script: &ScriptedTransport) -> NotexApi {
    NotexApi::new(Gateway::new(script.clone(), TokenHolder::in_memory()))
}

fn note_json(id: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id, "title": "Lecture", "content": "Borrowing", "ownerUsername": "alice",
        "createdAt": "2025-03-01T12:00:00", "updatedAt": null, "images": []
    })
}

fn group_json(id: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id, "name": "Algebra", "description": "d", "ownerUsername": "bob",
        "membersCount": 1, "createdAt": null, "isPrivate": false, "isMember": true
    })
}

fn image(name: &str) -> ImageUpload {
    ImageUpload { file_name: name.to_owned(), content_type: "image/png".to_owned(), bytes: vec![1, 2, 3] }
}

fn part_names(body: &RequestBody) -> Vec<String> {
    match body {
        RequestBody::Multipart(parts) => parts.iter().map(|p| p.name().to_owned()).collect(),
        other => panic!("expected multipart, got {other:?}"),
    }
}

// =============================================================
// Auth
// =============================================================

#[tokio::test]
async fn login_posts_credentials_and_decodes_token() {
    let script = ScriptedTransport::new();
    script.reply(200, serde_json::json!({"token": "jwt", "tokenExpirationTime": 3_600_000}));

    let response = api(&script)
        .login(&LoginRequest { username: "alice".to_owned(), password: "pw".to_owned() })
        .await
        .unwrap();

    assert_eq!(response.token, "jwt");
    let sent = script.last();
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.path, "/auth/login");
    assert_eq!(sent.body, RequestBody::Json(serde_json::json!({"username": "alice", "password": "pw"})));
}

#[tokio::test]
async fn register_conflict_surfaces_as_conflict() {
    let script = ScriptedTransport::new();
    script.reply(409, serde_json::json!({"status": 409, "message": "Username already taken"}));

    let err = api(&script)
        .register(&RegisterUser {
            username: "alice".to_owned(),
            email: "a@x".to_owned(),
            password: "pw".to_owned(),
            first_name: "A".to_owned(),
            last_name: "L".to_owned(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(script.last().path, "/auth/register");
}

#[tokio::test]
async fn verify_and_resend_hit_auth_routes() {
    let script = ScriptedTransport::new();
    script.reply_text(200, "Account verified successfully");
    script.reply_text(200, "Verification code sent");
    let api = api(&script);

    api.verify(&VerifyUser { username: "a".to_owned(), verification_code: "123456".to_owned() })
        .await
        .unwrap();
    api.resend_verification(&ResendVerification { username: "a".to_owned() })
        .await
        .unwrap();

    let paths: Vec<String> = script.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, ["/auth/verify", "/auth/resend"]);
}

// =============================================================
// Users
// =============================================================

#[tokio::test]
async fn me_decodes_identity() {
    let script = ScriptedTransport::new();
    script.reply(200, identity_json("alice"));

    let me = api(&script).me().await.unwrap();

    assert_eq!(me.username, "alice");
    assert_eq!(script.last().path, "/users/me");
}

#[tokio::test]
async fn username_segments_are_percent_encoded() {
    let script = ScriptedTransport::new();
    script.reply(200, serde_json::json!([]));

    api(&script).user_notes("jo hn/x").await.unwrap();

    assert_eq!(script.last().path, "/users/jo%20hn%2Fx/notes");
}

#[tokio::test]
async fn admin_note_listing_sends_filter() {
    let script = ScriptedTransport::new();
    script.reply(200, serde_json::json!([note_json(1)]));

    let notes = api(&script).user_notes_admin("bob", NoteFilter::Deleted).await.unwrap();

    assert_eq!(notes.len(), 1);
    let sent = script.last();
    assert_eq!(sent.path, "/users/bob/notes/admin");
    assert_eq!(sent.query, vec![("filter".to_owned(), "DELETED".to_owned())]);
}

#[tokio::test]
async fn update_me_patches_only_set_fields() {
    let script = ScriptedTransport::new();
    script.reply_text(200, "User updated");

    api(&script)
        .update_me(&UpdateUser { first_name: Some("Al".to_owned()), ..UpdateUser::default() })
        .await
        .unwrap();

    let sent = script.last();
    assert_eq!(sent.method, HttpMethod::Patch);
    assert_eq!(sent.body, RequestBody::Json(serde_json::json!({"firstName": "Al"})));
}

#[tokio::test]
async fn all_users_forbidden_for_non_admin() {
    let script = ScriptedTransport::new();
    script.reply(403, serde_json::json!({"message": "Access Denied"}));

    let err = api(&script).all_users().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

// =============================================================
// Notes
// =============================================================

#[tokio::test]
async fn create_note_builds_multipart_with_images() {
    let script = ScriptedTransport::new();
    script.reply(201, note_json(5));

    let note = api(&script)
        .create_note(&NewNote {
            title: "Lecture".to_owned(),
            content: "Borrowing".to_owned(),
            images: vec![image("a.png"), image("b.png")],
        })
        .await
        .unwrap();

    assert_eq!(note.id, 5);
    let sent = script.last();
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.path, "/notes");
    assert_eq!(part_names(&sent.body), ["title", "content", "images", "images"]);
}

#[tokio::test]
async fn update_note_uses_new_images_and_remove_ids() {
    let script = ScriptedTransport::new();
    script.reply_text(200, "Note updated");

    api(&script)
        .update_note(
            5,
            &NoteUpdate {
                title: None,
                content: Some("edited".to_owned()),
                new_images: vec![image("c.png")],
                remove_image_ids: vec![11, 12],
            },
        )
        .await
        .unwrap();

    let sent = script.last();
    assert_eq!(sent.method, HttpMethod::Patch);
    assert_eq!(sent.path, "/notes/5");
    assert_eq!(part_names(&sent.body), ["content", "newImages", "removeImageIds", "removeImageIds"]);
    let RequestBody::Multipart(parts) = &sent.body else { unreachable!() };
    assert_eq!(parts[3], FormPart::Text { name: "removeImageIds".to_owned(), value: "12".to_owned() });
}

#[tokio::test]
async fn search_notes_includes_optional_filter() {
    let script = ScriptedTransport::new();
    script.reply(200, serde_json::json!([]));
    script.reply(200, serde_json::json!([]));
    let api = api(&script);

    api.search_notes("rust", None).await.unwrap();
    api.search_notes("rust", Some(NoteFilter::Active)).await.unwrap();

    let sent = script.requests();
    assert_eq!(sent[0].query, vec![("query".to_owned(), "rust".to_owned())]);
    assert_eq!(sent[1].query.len(), 2);
    assert_eq!(sent[1].query[1], ("filter".to_owned(), "ACTIVE".to_owned()));
}

#[tokio::test]
async fn note_lookup_routes() {
    let script = ScriptedTransport::new();
    script.reply(200, note_json(3));
    script.reply(200, serde_json::json!([note_json(3)]));
    script.reply(200, serde_json::json!({"message": "A short summary"}));
    script.reply_text(200, "Image deleted");
    script.reply_text(200, "Note deleted");
    let api = api(&script);

    api.note(3).await.unwrap();
    api.notes_by_partial_name("Lec").await.unwrap();
    let summary = api.summarize_note(3).await.unwrap();
    api.delete_note_image(3, 8).await.unwrap();
    api.delete_note(3).await.unwrap();

    assert_eq!(summary.message.as_deref(), Some("A short summary"));
    let sent = script.requests();
    assert_eq!(sent[0].path, "/notes/3");
    assert_eq!(sent[1].query, vec![("partialName".to_owned(), "Lec".to_owned())]);
    assert_eq!(sent[2].path, "/notes/3/summarize");
    assert_eq!((sent[3].method, sent[3].path.as_str()), (HttpMethod::Delete, "/notes/3/images/8"));
    assert_eq!((sent[4].method, sent[4].path.as_str()), (HttpMethod::Delete, "/notes/3"));
}

#[tokio::test]
async fn translate_note_sends_language_code() {
    let script = ScriptedTransport::new();
    script.reply(200, serde_json::json!({"message": "Kurze Notiz"}));
    let api = api(&script);

    let translated = api.translate_note(3, Language::De).await.unwrap();

    assert_eq!(translated.message.as_deref(), Some("Kurze Notiz"));
    let sent = script.last();
    assert_eq!((sent.method, sent.path.as_str()), (HttpMethod::Get, "/notes/3/translate"));
    assert_eq!(sent.query, vec![("language".to_owned(), "DE".to_owned())]);
}

// =============================================================
// Groups and messages
// =============================================================

#[tokio::test]
async fn group_membership_routes() {
    let script = ScriptedTransport::new();
    for _ in 0..4 {
        script.reply_text(200, "ok");
    }
    let api = api(&script);

    api.join_group(4, &JoinGroup { password: Some("pw".to_owned()) }).await.unwrap();
    api.add_group_member(4, "carol").await.unwrap();
    api.remove_group_member(4, "carol").await.unwrap();
    api.leave_group(4).await.unwrap();

    let sent = script.requests();
    assert_eq!(sent[0].path, "/groups/4/members");
    assert_eq!(sent[0].body, RequestBody::Json(serde_json::json!({"password": "pw"})));
    assert_eq!((sent[1].method, sent[1].path.as_str()), (HttpMethod::Post, "/groups/4/members/carol"));
    assert_eq!((sent[2].method, sent[2].path.as_str()), (HttpMethod::Delete, "/groups/4/members/carol"));
    assert_eq!(sent[3].path, "/groups/4/members/me");
}

#[tokio::test]
async fn group_crud_routes() {
    let script = ScriptedTransport::new();
    script.reply(201, group_json(9));
    script.reply(200, group_json(9));
    script.reply(200, serde_json::json!([group_json(9)]));
    script.reply(200, serde_json::json!([group_json(9)]));
    script.reply_text(200, "Group deleted");
    let api = api(&script);

    let created = api
        .create_group(&CreateGroup {
            name: "Algebra".to_owned(),
            description: "d".to_owned(),
            is_private: false,
            password: None,
        })
        .await
        .unwrap();
    api.update_group(9, &UpdateGroup { name: Some("Algebra II".to_owned()), ..UpdateGroup::default() })
        .await
        .unwrap();
    api.groups_by_name("Alg").await.unwrap();
    api.groups_by_owner("bob").await.unwrap();
    api.delete_group(9).await.unwrap();

    assert_eq!(created.id, 9);
    let sent = script.requests();
    assert_eq!(sent[0].path, "/groups");
    assert_eq!(sent[1].method, HttpMethod::Patch);
    assert_eq!(sent[2].query, vec![("name".to_owned(), "Alg".to_owned())]);
    assert_eq!(sent[3].query, vec![("owner".to_owned(), "bob".to_owned())]);
    assert_eq!((sent[4].method, sent[4].path.as_str()), (HttpMethod::Delete, "/groups/9"));
}

#[tokio::test]
async fn messages_page_query() {
    let script = ScriptedTransport::new();
    script.reply(
        200,
        serde_json::json!({"content": [], "totalElements": 0, "totalPages": 0, "size": 20, "number": 1,
                            "first": false, "last": true}),
    );

    let page = api(&script).messages(2, 1, DEFAULT_MESSAGE_PAGE_SIZE).await.unwrap();

    assert!(page.last);
    let sent = script.last();
    assert_eq!(sent.path, "/groups/2/messages");
    assert_eq!(
        sent.query,
        vec![("page".to_owned(), "1".to_owned()), ("size".to_owned(), "20".to_owned())]
    );
}

#[tokio::test]
async fn send_message_posts_content_and_group() {
    let script = ScriptedTransport::new();
    script.reply(
        201,
        serde_json::json!({"id": 1, "content": "hi", "author": "alice", "createdAt": null, "groupId": 2}),
    );

    let message = api(&script).send_message(2, "hi").await.unwrap();

    assert_eq!(message.author, "alice");
    assert_eq!(script.last().body, RequestBody::Json(serde_json::json!({"content": "hi", "groupId": 2})));
}

#[tokio::test]
async fn group_members_forbidden_for_outsider() {
    let script = ScriptedTransport::new();
    script.reply(403, serde_json::json!({}));

    let err = api(&script).group_members(3).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

// =============================================================
// Health
// =============================================================

#[tokio::test]
async fn health_true_only_on_200() {
    let script = ScriptedTransport::new();
    script.reply_text(200, "OK");
    script.reply(503, serde_json::json!({}));
    script.fail(TransportError::Unreachable("refused".to_owned()));
    let api = api(&script);

    assert!(api.health().await);
    assert!(!api.health().await);
    assert!(!api.health().await);
    assert_eq!(script.last().path, "/health");
}
