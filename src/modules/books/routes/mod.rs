//! HTTP handlers for the books module.
//!
//! Each handler is one unit of work against the repository: validate
//! the input, make the persistence call, shape the response. Storage
//! failures bubble up as 500s; nothing is retried.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use library_http::error::AppError;

use super::models::{Book, GenreCount, UpdateBook};
use super::repository::{DynBookRepository, UpdateOutcome};

pub async fn create_book(
    State(repository): State<DynBookRepository>,
    Json(book): Json<Book>,
) -> Result<Json<Book>, AppError> {
    book.validate()
        .map_err(|details| AppError::validation(details, "book failed validation"))?;

    // Duplicate isbns are allowed by design; later lookups resolve to
    // the first stored match.
    let stored = repository.insert(book).await?;
    Ok(Json(stored))
}

pub async fn list_books(
    State(repository): State<DynBookRepository>,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(repository.find_all().await?))
}

pub async fn get_book(
    State(repository): State<DynBookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<Book>, AppError> {
    match repository.find_by_isbn(&isbn).await? {
        Some(book) => Ok(Json(book)),
        None => Err(AppError::not_found("Book not found")),
    }
}

pub async fn update_book(
    State(repository): State<DynBookRepository>,
    Path(isbn): Path<String>,
    Json(patch): Json<UpdateBook>,
) -> Result<Json<Book>, AppError> {
    patch
        .validate()
        .map_err(|details| AppError::validation(details, "update failed validation"))?;

    match repository.update_by_isbn(&isbn, &patch).await? {
        UpdateOutcome::Missing => Err(AppError::not_found("Book not found")),
        // A no-op patch is a success, not a 404: the book exists and
        // already looks like the caller wants it to.
        UpdateOutcome::Unchanged(book) | UpdateOutcome::Updated(book) => Ok(Json(book)),
    }
}

pub async fn delete_book(
    State(repository): State<DynBookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if repository.delete_by_isbn(&isbn).await? {
        Ok(Json(json!({"message": "Book deleted successfully"})))
    } else {
        Err(AppError::not_found("Book not found"))
    }
}

pub async fn book_statistics(
    State(repository): State<DynBookRepository>,
) -> Result<Json<Vec<GenreCount>>, AppError> {
    Ok(Json(repository.genre_counts().await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::modules::books::repository::InMemoryBookRepository;
    use crate::modules::books::BooksModule;
    use library_kernel::Module;

    fn test_router() -> Router {
        BooksModule::new(Arc::new(InMemoryBookRepository::new())).routes()
    }

    fn dune() -> Value {
        json!({
            "title": "Dune",
            "author": "Herbert",
            "isbn": "1234567890",
            "genre": "science_fiction",
            "published_year": 1965,
            "available": true
        })
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(body) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }

    #[tokio::test]
    async fn create_returns_the_stored_record() {
        let router = test_router();

        let (status, body) = send(&router, "POST", "/create-book", Some(dune())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, dune());
    }

    #[tokio::test]
    async fn create_rejects_invalid_book_and_persists_nothing() {
        let router = test_router();

        let mut invalid = dune();
        invalid["isbn"] = json!("123");
        invalid["published_year"] = json!(1700);

        let (status, body) = send(&router, "POST", "/create-book", Some(invalid)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);

        let (status, body) = send(&router, "GET", "/list-books", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn create_rejects_unknown_genre() {
        let router = test_router();

        let mut invalid = dune();
        invalid["genre"] = json!("romance");

        let (status, _) = send(&router, "POST", "/create-book", Some(invalid)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn get_missing_book_is_404() {
        let router = test_router();

        let (status, body) = send(&router, "GET", "/get-book/0000000000", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn delete_missing_book_is_404() {
        let router = test_router();

        let (status, _) = send(&router, "DELETE", "/delete-book/0000000000", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_missing_book_is_404() {
        let router = test_router();

        let (status, _) = send(
            &router,
            "PUT",
            "/update-book/0000000000",
            Some(json!({"available": false})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_rejects_out_of_range_fields() {
        let router = test_router();
        send(&router, "POST", "/create-book", Some(dune())).await;

        let (status, body) = send(
            &router,
            "PUT",
            "/update-book/1234567890",
            Some(json!({"published_year": 2500})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "published_year");
    }

    #[tokio::test]
    async fn update_can_rename_the_isbn() {
        let router = test_router();
        send(&router, "POST", "/create-book", Some(dune())).await;

        let (status, body) = send(
            &router,
            "PUT",
            "/update-book/1234567890",
            Some(json!({"isbn": "0987654321"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isbn"], json!("0987654321"));
        assert_eq!(body["title"], json!("Dune"));

        // The record only answers to the new isbn now.
        let (status, _) = send(&router, "GET", "/get-book/1234567890", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&router, "GET", "/get-book/0987654321", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], json!("Dune"));
    }

    #[tokio::test]
    async fn noop_update_returns_the_current_record() {
        let router = test_router();
        send(&router, "POST", "/create-book", Some(dune())).await;

        let (status, body) = send(
            &router,
            "PUT",
            "/update-book/1234567890",
            Some(json!({"available": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, dune());
    }

    #[tokio::test]
    async fn stats_counts_books_per_genre() {
        let router = test_router();

        for (isbn, genre) in [
            ("1111111111", "fiction"),
            ("2222222222", "fiction"),
            ("3333333333", "fantasy"),
        ] {
            let mut book = dune();
            book["isbn"] = json!(isbn);
            book["genre"] = json!(genre);
            send(&router, "POST", "/create-book", Some(book)).await;
        }

        let (status, body) = send(&router, "GET", "/books/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"genre": "fiction", "count": 2},
                {"genre": "fantasy", "count": 1}
            ])
        );
    }

    #[tokio::test]
    async fn dune_scenario_end_to_end() {
        let router = test_router();

        // Create returns the same fields back.
        let (status, body) = send(&router, "POST", "/create-book", Some(dune())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, dune());

        // The listing includes it.
        let (status, body) = send(&router, "GET", "/list-books", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([dune()]));

        // Flip availability; everything else stays put.
        let (status, body) = send(
            &router,
            "PUT",
            "/update-book/1234567890",
            Some(json!({"available": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], json!(false));
        assert_eq!(body["title"], json!("Dune"));

        let (status, body) = send(&router, "GET", "/get-book/1234567890", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], json!(false));
        assert_eq!(body["published_year"], json!(1965));

        // Delete, then the book is gone.
        let (status, body) = send(&router, "DELETE", "/delete-book/1234567890", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Book deleted successfully"}));

        let (status, _) = send(&router, "GET", "/get-book/1234567890", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
