pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use catalog_http::error::{field_detail, AppError};
use catalog_kernel::{InitCtx, Module};
use catalog_store::Table;

use models::{Author, AuthorPayload};

/// Shared state for author routes
#[derive(Clone)]
pub struct AuthorsState {
    pub authors: Arc<Table<Author>>,
}

/// Authors module: CRUD over the author table
pub struct AuthorsModule {
    state: AuthorsState,
}

impl AuthorsModule {
    pub fn new(authors: Arc<Table<Author>>) -> Self {
        Self {
            state: AuthorsState { authors },
        }
    }
}

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_authors).post(create_author))
            .route(
                "/{id}/",
                get(get_author)
                    .put(update_author)
                    .patch(update_author)
                    .delete(delete_author),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List authors",
                        "tags": ["Authors"],
                        "responses": {
                            "200": {
                                "description": "List of authors",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {
                                                "$ref": "#/components/schemas/Author"
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create an author",
                        "tags": ["Authors"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/AuthorPayload"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created author",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/Author"
                                        }
                                    }
                                }
                            },
                            "422": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}/": {
                    "get": {
                        "summary": "Retrieve an author",
                        "tags": ["Authors"],
                        "responses": {
                            "200": {
                                "description": "Author",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/Author"
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "Author not found",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "put": {
                        "summary": "Replace an author",
                        "tags": ["Authors"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/AuthorPayload"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Updated author",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/Author"
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "Author not found",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "delete": {
                        "summary": "Delete an author",
                        "tags": ["Authors"],
                        "responses": {
                            "204": {
                                "description": "Deleted"
                            },
                            "404": {
                                "description": "Author not found",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Author": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "integer",
                                "format": "int64",
                                "description": "Server-assigned identifier"
                            },
                            "name": {
                                "type": "string",
                                "description": "Author's display name"
                            },
                            "email": {
                                "type": "string",
                                "format": "email",
                                "description": "Contact email, unique across authors"
                            }
                        },
                        "required": ["id", "name", "email"]
                    },
                    "AuthorPayload": {
                        "type": "object",
                        "properties": {
                            "name": {
                                "type": "string"
                            },
                            "email": {
                                "type": "string",
                                "format": "email"
                            }
                        },
                        "required": ["name", "email"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "authors module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "authors module stopped");
        Ok(())
    }
}

async fn list_authors(State(state): State<AuthorsState>) -> Json<Vec<Author>> {
    Json(state.authors.list().await)
}

async fn get_author(
    State(state): State<AuthorsState>,
    Path(id): Path<i64>,
) -> Result<Json<Author>, AppError> {
    state
        .authors
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("author {id} not found")))
}

async fn create_author(
    State(state): State<AuthorsState>,
    Json(payload): Json<AuthorPayload>,
) -> Result<(StatusCode, Json<Author>), AppError> {
    validate_payload(&state, &payload, None).await?;

    let stored = state
        .authors
        .insert(Author {
            id: 0,
            name: payload.name,
            email: payload.email,
        })
        .await;

    Ok((StatusCode::CREATED, Json(stored)))
}

async fn update_author(
    State(state): State<AuthorsState>,
    Path(id): Path<i64>,
    Json(payload): Json<AuthorPayload>,
) -> Result<Json<Author>, AppError> {
    if !state.authors.contains(id).await {
        return Err(AppError::not_found(format!("author {id} not found")));
    }

    validate_payload(&state, &payload, Some(id)).await?;

    state
        .authors
        .update(
            id,
            Author {
                id: 0,
                name: payload.name,
                email: payload.email,
            },
        )
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("author {id} not found")))
}

async fn delete_author(
    State(state): State<AuthorsState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.authors.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("author {id} not found")))
    }
}

/// Field-level payload checks. `current_id` excludes the record being
/// updated from the unique-email check.
async fn validate_payload(
    state: &AuthorsState,
    payload: &AuthorPayload,
    current_id: Option<i64>,
) -> Result<(), AppError> {
    let mut details = Vec::new();

    if payload.name.trim().is_empty() {
        details.push(field_detail("name", "required"));
    }

    if payload.email.trim().is_empty() {
        details.push(field_detail("email", "required"));
    } else if !looks_like_email(&payload.email) {
        details.push(field_detail("email", "enter a valid email address"));
    } else {
        let duplicate = state
            .authors
            .find(|author| author.email == payload.email && Some(author.id) != current_id)
            .await;
        if duplicate.is_some() {
            details.push(field_detail("email", "author with this email already exists"));
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(details, "author payload failed validation"))
    }
}

/// Shallow shape check, not full RFC parsing.
fn looks_like_email(value: &str) -> bool {
    let mut parts = value.split('@');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None)
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
    )
}

/// Create a new instance of the authors module
pub fn create_module(authors: Arc<Table<Author>>) -> Arc<dyn Module> {
    Arc::new(AuthorsModule::new(authors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> Router {
        AuthorsModule::new(Arc::new(Table::new())).routes()
    }

    async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(value) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn payload(name: &str, email: &str) -> Value {
        json!({"name": name, "email": email})
    }

    #[tokio::test]
    async fn create_then_retrieve_round_trips() {
        let router = test_router();

        let (status, created) = send(
            router.clone(),
            Method::POST,
            "/",
            Some(payload("Frank Herbert", "frank@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "Frank Herbert");
        assert_eq!(created["email"], "frank@example.com");

        let id = created["id"].as_i64().unwrap();
        let (status, fetched) = send(router, Method::GET, &format!("/{id}/"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn list_returns_all_in_id_order() {
        let router = test_router();
        for email in ["a@example.com", "b@example.com"] {
            let (status, _) = send(
                router.clone(),
                Method::POST,
                "/",
                Some(payload("Author", email)),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, listed) = send(router, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_with_details() {
        let router = test_router();

        let (status, body) = send(router, Method::POST, "/", Some(payload("", ""))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let details = body["error"]["details"].as_array().unwrap();
        let fields: Vec<&str> = details.iter().map(|d| d["field"].as_str().unwrap()).collect();
        assert_eq!(fields, vec!["name", "email"]);
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let router = test_router();

        let (status, body) = send(
            router,
            Method::POST,
            "/",
            Some(payload("Frank Herbert", "not-an-email")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "email");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let router = test_router();

        let (status, _) = send(
            router.clone(),
            Method::POST,
            "/",
            Some(payload("First", "shared@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            router,
            Method::POST,
            "/",
            Some(payload("Second", "shared@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["error"]["details"][0]["error"],
            "author with this email already exists"
        );
    }

    #[tokio::test]
    async fn update_keeping_own_email_is_allowed() {
        let router = test_router();

        let (_, created) = send(
            router.clone(),
            Method::POST,
            "/",
            Some(payload("Old Name", "same@example.com")),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, updated) = send(
            router,
            Method::PUT,
            &format!("/{id}/"),
            Some(payload("New Name", "same@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "New Name");
        assert_eq!(updated["id"], id);
    }

    #[tokio::test]
    async fn update_missing_author_is_404_and_creates_nothing() {
        let router = test_router();

        let (status, _) = send(
            router.clone(),
            Method::PUT,
            "/99/",
            Some(payload("Ghost", "ghost@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, listed) = send(router, Method::GET, "/", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_then_retrieve_is_404() {
        let router = test_router();

        let (_, created) = send(
            router.clone(),
            Method::POST,
            "/",
            Some(payload("Gone", "gone@example.com")),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(router.clone(), Method::DELETE, &format!("/{id}/"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = send(router, Method::GET, &format!("/{id}/"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
