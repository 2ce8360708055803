pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;

use library_kernel::{InitCtx, Module};

use repository::{DynBookRepository, MongoBookRepository};

/// CRUD module for the book collection.
pub struct BooksModule {
    repository: DynBookRepository,
}

impl BooksModule {
    pub fn new(repository: DynBookRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    // The public contract predates the module system; routes live under
    // the versioned prefix rather than /api/books.
    fn base_path(&self) -> String {
        "/api/v1".to_string()
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
            .route("/create-book", post(routes::create_book))
            .route("/list-books", get(routes::list_books))
            .route("/get-book/{isbn}", get(routes::get_book))
            .route("/update-book/{isbn}", put(routes::update_book))
            .route("/delete-book/{isbn}", delete(routes::delete_book))
            .route("/books/stats", get(routes::book_statistics))
            .with_state(self.repository.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/create-book": {
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            },
                            "required": true
                        },
                        "responses": {
                            "200": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "422": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/list-books": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All books in storage order",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/get-book/{isbn}": {
                    "get": {
                        "summary": "Get a book by isbn",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "isbn",
                                "in": "path",
                                "required": true,
                                "schema": { "type": "string" }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "The first book matching the isbn",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": {
                                "description": "No book matches the isbn",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/update-book/{isbn}": {
                    "put": {
                        "summary": "Merge-patch a book by isbn",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "isbn",
                                "in": "path",
                                "required": true,
                                "schema": { "type": "string" }
                            }
                        ],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateBook" }
                                }
                            },
                            "required": true
                        },
                        "responses": {
                            "200": {
                                "description": "The book after the patch",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": {
                                "description": "No book matches the isbn",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            },
                            "422": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/delete-book/{isbn}": {
                    "delete": {
                        "summary": "Delete a book by isbn",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "isbn",
                                "in": "path",
                                "required": true,
                                "schema": { "type": "string" }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "Deletion acknowledgment",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "message": { "type": "string" }
                                            }
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "No book matches the isbn",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/books/stats": {
                    "get": {
                        "summary": "Count of books per genre",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Counts ordered by count descending",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/GenreCount" }
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
                            "title": {
                                "type": "string",
                                "minLength": 1,
                                "maxLength": 100
                            },
                            "author": {
                                "type": "string",
                                "minLength": 1,
                                "maxLength": 100
                            },
                            "isbn": {
                                "type": "string",
                                "minLength": 10,
                                "maxLength": 13
                            },
                            "genre": {
                                "type": "string",
                                "enum": ["fiction", "nonfiction", "fantasy", "science_fiction", "biography"]
                            },
                            "published_year": {
                                "type": "integer",
                                "minimum": 1800,
                                "maximum": 2100
                            },
                            "available": {
                                "type": "boolean"
                            }
                        },
                        "required": ["title", "author", "isbn", "genre", "published_year", "available"]
                    },
                    "UpdateBook": {
                        "type": "object",
                        "description": "Partial update; absent fields are left unchanged",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "isbn": { "type": "string" },
                            "genre": {
                                "type": "string",
                                "enum": ["fiction", "nonfiction", "fantasy", "science_fiction", "biography"]
                            },
                            "published_year": { "type": "integer" },
                            "available": { "type": "boolean" }
                        }
                    },
                    "GenreCount": {
                        "type": "object",
                        "properties": {
                            "genre": { "type": "string" },
                            "count": { "type": "integer" }
                        },
                        "required": ["genre", "count"]
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

/// Create the books module backed by the shared MongoDB handle.
pub fn create_module(db: &library_db::Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(MongoBookRepository::new(db))))
}
