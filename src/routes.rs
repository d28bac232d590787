use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};

use crate::store::{Author, NewPost, Post, PostPatch, PostStore, StoreError};

pub type Store = Box<dyn PostStore>;

// ─── Models ───

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

fn err(status: Status, msg: &str, code: &str) -> (Status, Json<ApiError>) {
    (status, Json(ApiError { error: msg.to_string(), code: code.to_string() }))
}

fn store_err(e: StoreError) -> (Status, Json<ApiError>) {
    match e {
        StoreError::NotFound => err(Status::NotFound, "Post not found", "NOT_FOUND"),
        StoreError::Unavailable(msg) => err(Status::InternalServerError, &msg, "DB_ERROR"),
    }
}

/// Public post schema: exactly these five fields, `author` as the
/// derived display string.
#[derive(Serialize)]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub created: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        PostResponse {
            id: post.id,
            title: post.title,
            content: post.content,
            author: post.author.display(),
            created: post.created,
        }
    }
}

// ─── Request bodies ───

#[derive(Deserialize)]
pub struct CreatePostReq {
    pub title: String,
    pub content: String,
    pub author: Author,
}

/// Unknown fields (a redundant `id` echoing the path, for instance) are
/// ignored; the path id is authoritative.
#[derive(Deserialize)]
pub struct UpdatePostReq {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<Author>,
}

// ─── Helpers ───

fn require_non_empty(value: &str, field: &str) -> Result<(), (Status, Json<ApiError>)> {
    if value.trim().is_empty() {
        return Err(err(
            Status::UnprocessableEntity,
            &format!("Field '{}' is required", field),
            "VALIDATION_ERROR",
        ));
    }
    Ok(())
}

// ─── Routes ───

#[get("/health")]
pub fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

#[get("/posts")]
pub fn list_posts(store: &State<Store>) -> Result<Json<Vec<PostResponse>>, (Status, Json<ApiError>)> {
    let posts = store.find_all().map_err(store_err)?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

#[get("/posts/<id>")]
pub fn get_post(id: &str, store: &State<Store>) -> Result<Json<PostResponse>, (Status, Json<ApiError>)> {
    store
        .find_by_id(id)
        .map_err(store_err)?
        .map(|post| Json(PostResponse::from(post)))
        .ok_or_else(|| err(Status::NotFound, "Post not found", "NOT_FOUND"))
}

#[post("/posts", format = "json", data = "<req>")]
pub fn create_post(req: Json<CreatePostReq>, store: &State<Store>) -> Result<(Status, Json<PostResponse>), (Status, Json<ApiError>)> {
    // Reject before anything is persisted.
    require_non_empty(&req.title, "title")?;
    require_non_empty(&req.content, "content")?;
    require_non_empty(&req.author.first_name, "author.firstName")?;
    require_non_empty(&req.author.last_name, "author.lastName")?;

    let post = store
        .insert_one(NewPost {
            title: req.title.clone(),
            content: req.content.clone(),
            author: req.author.clone(),
        })
        .map_err(store_err)?;

    Ok((Status::Created, Json(PostResponse::from(post))))
}

#[put("/posts/<id>", format = "json", data = "<req>")]
pub fn update_post(id: &str, req: Json<UpdatePostReq>, store: &State<Store>) -> Result<Status, (Status, Json<ApiError>)> {
    let req = req.into_inner();
    let patch = PostPatch {
        title: req.title,
        content: req.content,
        author: req.author,
    };

    store.update_by_id(id, patch).map_err(store_err)?;
    Ok(Status::NoContent)
}

#[delete("/posts/<id>")]
pub fn delete_post(id: &str, store: &State<Store>) -> Result<Status, (Status, Json<ApiError>)> {
    // Idempotent: deleting an absent id still reports success.
    store.delete_by_id(id).map_err(store_err)?;
    Ok(Status::NoContent)
}

// ─── Catchers ───

#[catch(404)]
pub fn not_found() -> Json<ApiError> {
    Json(ApiError { error: "Not found".to_string(), code: "NOT_FOUND".to_string() })
}

#[catch(422)]
pub fn unprocessable_entity() -> Json<ApiError> {
    Json(ApiError { error: "Malformed or incomplete request body".to_string(), code: "VALIDATION_ERROR".to_string() })
}

#[catch(500)]
pub fn internal_error() -> Json<ApiError> {
    Json(ApiError { error: "Internal server error".to_string(), code: "INTERNAL_ERROR".to_string() })
}
