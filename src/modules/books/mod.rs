pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use catalog_http::error::{field_detail, AppError};
use catalog_kernel::{InitCtx, Module};
use catalog_store::Table;
use serde::Deserialize;
use time::macros::format_description;
use time::Date;

use crate::modules::authors::models::Author;
use models::{Book, BookPayload};

/// Shared state for book routes. Books hold a reference to the author
/// table to check referenced author ids.
#[derive(Clone)]
pub struct BooksState {
    pub books: Arc<Table<Book>>,
    pub authors: Arc<Table<Author>>,
}

/// Books module: CRUD over the book table plus substring search
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(books: Arc<Table<Book>>, authors: Arc<Table<Author>>) -> Self {
        Self {
            state: BooksState { books, authors },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books).post(create_book))
            .route(
                "/{id}/",
                get(get_book)
                    .put(update_book)
                    .patch(update_book)
                    .delete(delete_book),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "search",
                                "in": "query",
                                "required": false,
                                "description": "Case-insensitive substring matched against title and published date",
                                "schema": {
                                    "type": "string"
                                }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "List of books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {
                                                "$ref": "#/components/schemas/Book"
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/BookPayload"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/Book"
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
                        "summary": "Retrieve a book",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/Book"
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
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
                        "summary": "Replace a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/BookPayload"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Updated book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/Book"
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
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
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "responses": {
                            "204": {
                                "description": "Deleted"
                            },
                            "404": {
                                "description": "Book not found",
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
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "integer",
                                "format": "int64",
                                "description": "Server-assigned identifier"
                            },
                            "title": {
                                "type": "string",
                                "description": "Title of the book"
                            },
                            "published_date": {
                                "type": "string",
                                "format": "date",
                                "description": "Publication date (YYYY-MM-DD)"
                            },
                            "author": {
                                "type": "integer",
                                "format": "int64",
                                "nullable": true,
                                "description": "Id of the referenced author"
                            }
                        },
                        "required": ["id", "title", "published_date"]
                    },
                    "BookPayload": {
                        "type": "object",
                        "properties": {
                            "title": {
                                "type": "string"
                            },
                            "published_date": {
                                "type": "string",
                                "format": "date"
                            },
                            "author": {
                                "type": "integer",
                                "format": "int64",
                                "nullable": true
                            }
                        },
                        "required": ["title", "published_date"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Query parameters accepted by the list route
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub search: Option<String>,
}

async fn list_books(
    State(state): State<BooksState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Book>> {
    let books = match params.search.as_deref().filter(|term| !term.is_empty()) {
        Some(term) => {
            let needle = term.to_lowercase();
            state
                .books
                .filter(|book| {
                    book.title.to_lowercase().contains(&needle)
                        || book.published_date.to_string().contains(&needle)
                })
                .await
        }
        None => state.books.list().await,
    };

    Json(books)
}

async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, AppError> {
    state
        .books
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("book {id} not found")))
}

async fn create_book(
    State(state): State<BooksState>,
    Json(payload): Json<BookPayload>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let published_date = validate_payload(&state, &payload).await?;

    let stored = state
        .books
        .insert(Book {
            id: 0,
            title: payload.title,
            published_date,
            author: payload.author,
        })
        .await;

    Ok((StatusCode::CREATED, Json(stored)))
}

async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<Book>, AppError> {
    if !state.books.contains(id).await {
        return Err(AppError::not_found(format!("book {id} not found")));
    }

    let published_date = validate_payload(&state, &payload).await?;

    state
        .books
        .update(
            id,
            Book {
                id: 0,
                title: payload.title,
                published_date,
                author: payload.author,
            },
        )
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("book {id} not found")))
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.books.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("book {id} not found")))
    }
}

/// Field-level payload checks. Returns the parsed publication date on
/// success so handlers never parse twice.
async fn validate_payload(state: &BooksState, payload: &BookPayload) -> Result<Date, AppError> {
    let mut details = Vec::new();

    if payload.title.trim().is_empty() {
        details.push(field_detail("title", "required"));
    }

    let date_format = format_description!("[year]-[month]-[day]");
    let published_date = if payload.published_date.trim().is_empty() {
        details.push(field_detail("published_date", "required"));
        None
    } else {
        match Date::parse(&payload.published_date, &date_format) {
            Ok(date) => Some(date),
            Err(_) => {
                details.push(field_detail(
                    "published_date",
                    "date must use the YYYY-MM-DD format",
                ));
                None
            }
        }
    };

    if let Some(author_id) = payload.author {
        if !state.authors.contains(author_id).await {
            details.push(field_detail("author", format!("unknown author id {author_id}")));
        }
    }

    match (details.is_empty(), published_date) {
        (true, Some(date)) => Ok(date),
        _ => Err(AppError::validation(details, "book payload failed validation")),
    }
}

/// Create a new instance of the books module
pub fn create_module(books: Arc<Table<Book>>, authors: Arc<Table<Author>>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(books, authors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> (Router, Arc<Table<Author>>) {
        let authors = Arc::new(Table::new());
        let books = Arc::new(Table::new());
        let router = BooksModule::new(books, authors.clone()).routes();
        (router, authors)
    }

    async fn seed_author(authors: &Table<Author>) -> i64 {
        authors
            .insert(Author {
                id: 0,
                name: "Frank Herbert".to_string(),
                email: "frank@example.com".to_string(),
            })
            .await
            .id
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

    #[tokio::test]
    async fn post_dune_then_search_finds_exactly_it() {
        let (router, authors) = test_router();
        let author_id = seed_author(&authors).await;

        let (status, created) = send(
            router.clone(),
            Method::POST,
            "/",
            Some(json!({
                "title": "Dune",
                "published_date": "1965-08-01",
                "author": author_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Dune");
        assert_eq!(created["published_date"], "1965-08-01");

        let (status, listed) = send(router, Method::GET, "/?search=Dune", None).await;
        assert_eq!(status, StatusCode::OK);
        let listed = listed.as_array().unwrap().clone();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], created);
    }

    #[tokio::test]
    async fn search_matches_title_and_date_case_insensitively() {
        let (router, _) = test_router();
        for (title, date) in [
            ("Dune", "1965-08-01"),
            ("Dune Messiah", "1969-07-01"),
            ("Neuromancer", "1984-07-01"),
        ] {
            let (status, _) = send(
                router.clone(),
                Method::POST,
                "/",
                Some(json!({"title": title, "published_date": date})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, by_title) = send(router.clone(), Method::GET, "/?search=dune", None).await;
        let titles: Vec<&str> = by_title
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Dune", "Dune Messiah"]);

        let (_, by_date) = send(router.clone(), Method::GET, "/?search=1984", None).await;
        let titles: Vec<&str> = by_date
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Neuromancer"]);

        let (_, none) = send(router.clone(), Method::GET, "/?search=solaris", None).await;
        assert!(none.as_array().unwrap().is_empty());

        let (_, all) = send(router, Method::GET, "/", None).await;
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn create_without_author_reference_is_allowed() {
        let (router, _) = test_router();

        let (status, created) = send(
            router.clone(),
            Method::POST,
            "/",
            Some(json!({"title": "Anonymous", "published_date": "2001-01-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["author"], Value::Null);

        let id = created["id"].as_i64().unwrap();
        let (status, fetched) = send(router, Method::GET, &format!("/{id}/"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn unknown_author_id_is_rejected() {
        let (router, _) = test_router();

        let (status, body) = send(
            router,
            Method::POST,
            "/",
            Some(json!({
                "title": "Orphan",
                "published_date": "2001-01-01",
                "author": 42
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "author");
    }

    #[tokio::test]
    async fn malformed_date_is_rejected_with_details() {
        let (router, _) = test_router();

        let (status, body) = send(
            router,
            Method::POST,
            "/",
            Some(json!({"title": "Dune", "published_date": "August 1965"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "published_date");
    }

    #[tokio::test]
    async fn update_missing_book_is_404_and_creates_nothing() {
        let (router, _) = test_router();

        let (status, _) = send(
            router.clone(),
            Method::PUT,
            "/7/",
            Some(json!({"title": "Ghost", "published_date": "1999-09-09"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, listed) = send(router, Method::GET, "/", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_overwrites_fields() {
        let (router, authors) = test_router();
        let author_id = seed_author(&authors).await;

        let (_, created) = send(
            router.clone(),
            Method::POST,
            "/",
            Some(json!({"title": "Draft", "published_date": "2000-01-01"})),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, updated) = send(
            router,
            Method::PUT,
            &format!("/{id}/"),
            Some(json!({
                "title": "Final",
                "published_date": "2002-02-02",
                "author": author_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], id);
        assert_eq!(updated["title"], "Final");
        assert_eq!(updated["published_date"], "2002-02-02");
        assert_eq!(updated["author"], author_id);
    }

    #[tokio::test]
    async fn delete_then_retrieve_is_404() {
        let (router, _) = test_router();

        let (_, created) = send(
            router.clone(),
            Method::POST,
            "/",
            Some(json!({"title": "Gone", "published_date": "1990-05-05"})),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, _) = send(router.clone(), Method::DELETE, &format!("/{id}/"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(router, Method::GET, &format!("/{id}/"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
