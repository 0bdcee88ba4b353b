//! Typed endpoint wrappers over the gateway.
//!
//! Each method fixes the HTTP method, the path template and the payload
//! shape, nothing else: no retry, no caching, no deduplication. Auth
//! requirements are enforced by the server, not here.
//!
//! ERROR HANDLING
//! ==============
//! Every method returns the gateway's [`ApiError`] unchanged. Only
//! [`NotexApi::health`] collapses failures, because its answer is a boolean.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;

use super::error::ApiError;
use super::gateway::{Gateway, RequestOptions};
use super::transport::{ApiRequest, FormPart};
use super::types::{
    AdminUser, ApiMessage, CreateGroup, Group, GroupMember, Identity, ImageUpload, JoinGroup, Language, LoginRequest,
    LoginResponse, Message, MessagePage, NewNote, Note, NoteFilter, NoteUpdate, RegisterUser, ResendVerification,
    SendMessage, UpdateGroup, UpdateUser, VerifyUser,
};

pub const DEFAULT_MESSAGE_PAGE_SIZE: u32 = 20;

/// Cheap-clone handle exposing one method per endpoint.
#[derive(Clone, Debug)]
pub struct NotexApi {
    gateway: Arc<Gateway>,
}

impl NotexApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway: Arc::new(gateway) }
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    // =========================================================================
    // AUTH
    // =========================================================================

    /// `POST /auth/register`. `409` when the username or email is taken.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn register(&self, payload: &RegisterUser) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::post("/auth/register").json(payload)?)
            .await
    }

    /// `POST /auth/login`. `401` for bad credentials, `403` for unverified accounts.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn login(&self, payload: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.gateway
            .send_json(ApiRequest::post("/auth/login").json(payload)?)
            .await
    }

    /// `POST /auth/verify`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn verify(&self, payload: &VerifyUser) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::post("/auth/verify").json(payload)?)
            .await
    }

    /// `POST /auth/resend`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn resend_verification(&self, payload: &ResendVerification) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::post("/auth/resend").json(payload)?)
            .await
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// `GET /users/me`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn me(&self) -> Result<Identity, ApiError> {
        self.gateway.send_json(ApiRequest::get("/users/me")).await
    }

    /// [`NotexApi::me`] with per-call timeout/cancellation.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn me_with(&self, options: &RequestOptions) -> Result<Identity, ApiError> {
        self.gateway
            .send_json_with(ApiRequest::get("/users/me"), options)
            .await
    }

    /// `PATCH /users/me`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn update_me(&self, payload: &UpdateUser) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::patch("/users/me").json(payload)?)
            .await
    }

    /// `GET /users` (admin).
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn all_users(&self) -> Result<Vec<AdminUser>, ApiError> {
        self.gateway.send_json(ApiRequest::get("/users")).await
    }

    /// `GET /users/me/notes`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn my_notes(&self) -> Result<Vec<Note>, ApiError> {
        self.gateway.send_json(ApiRequest::get("/users/me/notes")).await
    }

    /// `GET /users/me/groups`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn my_groups(&self) -> Result<Vec<Group>, ApiError> {
        self.gateway.send_json(ApiRequest::get("/users/me/groups")).await
    }

    /// `GET /users/{username}`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn user_by_username(&self, username: &str) -> Result<Identity, ApiError> {
        self.gateway
            .send_json(ApiRequest::get(format!("/users/{}", segment(username))))
            .await
    }

    /// `GET /users/{username}/groups` (admin).
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn user_groups(&self, username: &str) -> Result<Vec<Group>, ApiError> {
        self.gateway
            .send_json(ApiRequest::get(format!("/users/{}/groups", segment(username))))
            .await
    }

    /// `GET /users/{username}/notes`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn user_notes(&self, username: &str) -> Result<Vec<Note>, ApiError> {
        self.gateway
            .send_json(ApiRequest::get(format!("/users/{}/notes", segment(username))))
            .await
    }

    /// `GET /users/{username}/notes/admin?filter=` (admin).
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn user_notes_admin(&self, username: &str, filter: NoteFilter) -> Result<Vec<Note>, ApiError> {
        let request =
            ApiRequest::get(format!("/users/{}/notes/admin", segment(username))).query("filter", filter.as_str());
        self.gateway.send_json(request).await
    }

    /// `PATCH /users/{username}` (admin).
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn update_user_by_admin(&self, username: &str, payload: &UpdateUser) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::patch(format!("/users/{}", segment(username))).json(payload)?)
            .await
    }

    // =========================================================================
    // NOTES
    // =========================================================================

    /// `GET /notes/{id}`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn note(&self, note_id: i64) -> Result<Note, ApiError> {
        self.gateway
            .send_json(ApiRequest::get(format!("/notes/{note_id}")))
            .await
    }

    /// `GET /notes?partialName=`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn notes_by_partial_name(&self, partial_name: &str) -> Result<Vec<Note>, ApiError> {
        self.gateway
            .send_json(ApiRequest::get("/notes").query("partialName", partial_name))
            .await
    }

    /// `GET /notes/search?query=&filter=`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn search_notes(&self, query: &str, filter: Option<NoteFilter>) -> Result<Vec<Note>, ApiError> {
        let mut request = ApiRequest::get("/notes/search").query("query", query);
        if let Some(filter) = filter {
            request = request.query("filter", filter.as_str());
        }
        self.gateway.send_json(request).await
    }

    /// `POST /notes` as multipart (`title`, `content`, repeated `images`).
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn create_note(&self, note: &NewNote) -> Result<Note, ApiError> {
        self.gateway
            .send_json(ApiRequest::post("/notes").multipart(new_note_form(note)))
            .await
    }

    /// `PATCH /notes/{id}` as multipart (`title`, `content`, repeated
    /// `newImages` and `removeImageIds`).
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn update_note(&self, note_id: i64, update: &NoteUpdate) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::patch(format!("/notes/{note_id}")).multipart(note_update_form(update)))
            .await
    }

    /// `DELETE /notes/{id}`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn delete_note(&self, note_id: i64) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::delete(format!("/notes/{note_id}")))
            .await
    }

    /// `DELETE /notes/{id}/images/{imageId}`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn delete_note_image(&self, note_id: i64, image_id: i64) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::delete(format!("/notes/{note_id}/images/{image_id}")))
            .await
    }

    /// `GET /notes/{id}/summarize`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn summarize_note(&self, note_id: i64) -> Result<ApiMessage, ApiError> {
        self.gateway
            .send_json(ApiRequest::get(format!("/notes/{note_id}/summarize")))
            .await
    }

    /// `GET /notes/{id}/translate?language=`. The translated text comes back
    /// in the message body.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn translate_note(&self, note_id: i64, language: Language) -> Result<ApiMessage, ApiError> {
        self.gateway
            .send_json(ApiRequest::get(format!("/notes/{note_id}/translate")).query("language", language.as_str()))
            .await
    }

    // =========================================================================
    // GROUPS
    // =========================================================================

    /// `GET /groups?name=`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn groups_by_name(&self, name: &str) -> Result<Vec<Group>, ApiError> {
        self.gateway
            .send_json(ApiRequest::get("/groups").query("name", name))
            .await
    }

    /// `GET /groups?owner=`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn groups_by_owner(&self, owner: &str) -> Result<Vec<Group>, ApiError> {
        self.gateway
            .send_json(ApiRequest::get("/groups").query("owner", owner))
            .await
    }

    /// `GET /groups/{id}`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn group(&self, group_id: i64) -> Result<Group, ApiError> {
        self.gateway
            .send_json(ApiRequest::get(format!("/groups/{group_id}")))
            .await
    }

    /// `GET /groups/{id}/members`. `403` for non-members of private groups.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn group_members(&self, group_id: i64) -> Result<Vec<GroupMember>, ApiError> {
        self.gateway
            .send_json(ApiRequest::get(format!("/groups/{group_id}/members")))
            .await
    }

    /// `POST /groups`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn create_group(&self, payload: &CreateGroup) -> Result<Group, ApiError> {
        self.gateway
            .send_json(ApiRequest::post("/groups").json(payload)?)
            .await
    }

    /// `PATCH /groups/{id}`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn update_group(&self, group_id: i64, payload: &UpdateGroup) -> Result<Group, ApiError> {
        self.gateway
            .send_json(ApiRequest::patch(format!("/groups/{group_id}")).json(payload)?)
            .await
    }

    /// `DELETE /groups/{id}`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn delete_group(&self, group_id: i64) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::delete(format!("/groups/{group_id}")))
            .await
    }

    /// `POST /groups/{id}/members/{username}` (owner adds a member).
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn add_group_member(&self, group_id: i64, username: &str) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::post(format!("/groups/{group_id}/members/{}", segment(username))))
            .await
    }

    /// `POST /groups/{id}/members` (join, with password for private groups).
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn join_group(&self, group_id: i64, payload: &JoinGroup) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::post(format!("/groups/{group_id}/members")).json(payload)?)
            .await
    }

    /// `DELETE /groups/{id}/members/{username}`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn remove_group_member(&self, group_id: i64, username: &str) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::delete(format!("/groups/{group_id}/members/{}", segment(username))))
            .await
    }

    /// `DELETE /groups/{id}/members/me`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn leave_group(&self, group_id: i64) -> Result<(), ApiError> {
        self.gateway
            .send_unit(ApiRequest::delete(format!("/groups/{group_id}/members/me")))
            .await
    }

    // =========================================================================
    // MESSAGES
    // =========================================================================

    /// `GET /groups/{id}/messages?page=&size=`. `403` for non-members.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn messages(&self, group_id: i64, page: u32, size: u32) -> Result<MessagePage, ApiError> {
        let request = ApiRequest::get(format!("/groups/{group_id}/messages"))
            .query("page", page)
            .query("size", size);
        self.gateway.send_json(request).await
    }

    /// `POST /groups/{id}/messages`.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged.
    pub async fn send_message(&self, group_id: i64, content: &str) -> Result<Message, ApiError> {
        let payload = SendMessage { content: content.to_owned(), group_id };
        self.gateway
            .send_json(ApiRequest::post(format!("/groups/{group_id}/messages")).json(&payload)?)
            .await
    }

    // =========================================================================
    // MISC
    // =========================================================================

    /// `GET /health`; `true` only on `200`.
    pub async fn health(&self) -> bool {
        match self.gateway.execute(ApiRequest::get("/health"), &RequestOptions::default()).await {
            Ok(response) => response.status == 200,
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                false
            }
        }
    }
}

/// Percent-encode a user-supplied path segment.
fn segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn file_part(name: &str, image: &ImageUpload) -> FormPart {
    FormPart::File {
        name: name.to_owned(),
        file_name: image.file_name.clone(),
        content_type: image.content_type.clone(),
        bytes: image.bytes.clone(),
    }
}

fn text_part(name: &str, value: &str) -> FormPart {
    FormPart::Text { name: name.to_owned(), value: value.to_owned() }
}

fn new_note_form(note: &NewNote) -> Vec<FormPart> {
    let mut parts = vec![text_part("title", &note.title), text_part("content", &note.content)];
    parts.extend(note.images.iter().map(|image| file_part("images", image)));
    parts
}

fn note_update_form(update: &NoteUpdate) -> Vec<FormPart> {
    let mut parts = Vec::new();
    if let Some(title) = &update.title {
        parts.push(text_part("title", title));
    }
    if let Some(content) = &update.content {
        parts.push(text_part("content", content));
    }
    parts.extend(update.new_images.iter().map(|image| file_part("newImages", image)));
    parts.extend(
        update
            .remove_image_ids
            .iter()
            .map(|id| text_part("removeImageIds", &id.to_string())),
    );
    parts
}
