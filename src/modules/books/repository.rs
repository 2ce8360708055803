//! Persistence seam for the books module.
//!
//! Handlers only ever see [`BookRepository`]; the MongoDB-backed
//! implementation lives next to an in-process one used by tests and
//! local runs without a database.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::TryStreamExt;
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::models::{Book, Genre, GenreCount, UpdateBook};

pub type DynBookRepository = Arc<dyn BookRepository>;

/// Result of a merge-patch attempt against a stored book.
///
/// A matched-but-identical patch is deliberately not an error: the
/// original API returned 404 for it, which conflated "no such book"
/// with "nothing to do".
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// No stored book matched the isbn.
    Missing,
    /// A book matched but every patched field already held that value.
    Unchanged(Book),
    /// A book matched and at least one field changed.
    Updated(Book),
}

/// Narrow collection-access interface between handlers and the store.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Insert a book and return the stored record, read back by its
    /// surrogate id.
    async fn insert(&self, book: Book) -> anyhow::Result<Book>;

    /// All books in storage order.
    async fn find_all(&self) -> anyhow::Result<Vec<Book>>;

    /// First book matching the isbn.
    async fn find_by_isbn(&self, isbn: &str) -> anyhow::Result<Option<Book>>;

    /// Merge-patch the first book matching the isbn.
    async fn update_by_isbn(&self, isbn: &str, patch: &UpdateBook)
        -> anyhow::Result<UpdateOutcome>;

    /// Remove the first book matching the isbn. Returns true if a
    /// record was removed.
    async fn delete_by_isbn(&self, isbn: &str) -> anyhow::Result<bool>;

    /// Count of books per genre, ordered by count descending with ties
    /// broken by genre name ascending.
    async fn genre_counts(&self) -> anyhow::Result<Vec<GenreCount>>;
}

/// Persisted shape of a book: the API model plus the surrogate `_id`.
#[derive(Debug, Serialize, Deserialize)]
struct BookDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    title: String,
    author: String,
    isbn: String,
    genre: Genre,
    published_year: i32,
    available: bool,
}

impl From<Book> for BookDocument {
    fn from(book: Book) -> Self {
        Self {
            id: None,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            genre: book.genre,
            published_year: book.published_year,
            available: book.available,
        }
    }
}

impl BookDocument {
    /// Strip the surrogate id.
    fn into_book(self) -> Book {
        Book {
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            genre: self.genre,
            published_year: self.published_year,
            available: self.available,
        }
    }
}

/// MongoDB-backed repository over the `books` collection.
pub struct MongoBookRepository {
    books: Collection<BookDocument>,
}

impl MongoBookRepository {
    pub const COLLECTION: &'static str = "books";

    pub fn new(db: &library_db::Database) -> Self {
        Self {
            books: db.collection(Self::COLLECTION),
        }
    }

    /// `$set` document holding exactly the fields present in the patch.
    fn set_document(patch: &UpdateBook) -> Document {
        let mut set = Document::new();
        if let Some(title) = &patch.title {
            set.insert("title", title.clone());
        }
        if let Some(author) = &patch.author {
            set.insert("author", author.clone());
        }
        if let Some(isbn) = &patch.isbn {
            set.insert("isbn", isbn.clone());
        }
        if let Some(genre) = patch.genre {
            set.insert("genre", genre.as_str());
        }
        if let Some(year) = patch.published_year {
            set.insert("published_year", year);
        }
        if let Some(available) = patch.available {
            set.insert("available", available);
        }
        set
    }
}

#[async_trait]
impl BookRepository for MongoBookRepository {
    async fn insert(&self, book: Book) -> anyhow::Result<Book> {
        let result = self
            .books
            .insert_one(BookDocument::from(book))
            .await
            .context("failed to insert book")?;

        // Read-back is a second call; a concurrent delete in between
        // makes it miss. Accepted, surfaced as a 500.
        let stored = self
            .books
            .find_one(doc! { "_id": result.inserted_id.clone() })
            .await
            .context("failed to read back inserted book")?
            .ok_or_else(|| anyhow!("inserted book disappeared before read-back"))?;

        Ok(stored.into_book())
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Book>> {
        let books = self
            .books
            .find(doc! {})
            .await
            .context("failed to list books")?
            .try_collect::<Vec<BookDocument>>()
            .await
            .context("failed to collect books")?;

        Ok(books.into_iter().map(BookDocument::into_book).collect())
    }

    async fn find_by_isbn(&self, isbn: &str) -> anyhow::Result<Option<Book>> {
        let book = self
            .books
            .find_one(doc! { "isbn": isbn })
            .await
            .context("failed to fetch book")?;

        Ok(book.map(BookDocument::into_book))
    }

    async fn update_by_isbn(
        &self,
        isbn: &str,
        patch: &UpdateBook,
    ) -> anyhow::Result<UpdateOutcome> {
        // MongoDB rejects an empty `$set`; an empty patch is just a fetch.
        if patch.is_empty() {
            return Ok(match self.find_by_isbn(isbn).await? {
                Some(book) => UpdateOutcome::Unchanged(book),
                None => UpdateOutcome::Missing,
            });
        }

        let result = self
            .books
            .update_one(
                doc! { "isbn": isbn },
                doc! { "$set": Self::set_document(patch) },
            )
            .await
            .context("failed to update book")?;

        if result.matched_count == 0 {
            return Ok(UpdateOutcome::Missing);
        }

        // The patch may rename the isbn itself; re-fetch under the new key.
        let current_isbn = patch.isbn.as_deref().unwrap_or(isbn);
        let book = self
            .find_by_isbn(current_isbn)
            .await?
            .ok_or_else(|| anyhow!("updated book disappeared before read-back"))?;

        if result.modified_count == 0 {
            Ok(UpdateOutcome::Unchanged(book))
        } else {
            Ok(UpdateOutcome::Updated(book))
        }
    }

    async fn delete_by_isbn(&self, isbn: &str) -> anyhow::Result<bool> {
        let result = self
            .books
            .delete_one(doc! { "isbn": isbn })
            .await
            .context("failed to delete book")?;

        Ok(result.deleted_count > 0)
    }

    async fn genre_counts(&self) -> anyhow::Result<Vec<GenreCount>> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$genre", "count": { "$sum": 1 } } },
            // Secondary key keeps ties deterministic.
            doc! { "$sort": { "count": -1, "_id": 1 } },
        ];

        let rows = self
            .books
            .aggregate(pipeline)
            .await
            .context("failed to aggregate genre counts")?
            .try_collect::<Vec<Document>>()
            .await
            .context("failed to collect genre counts")?;

        rows.into_iter()
            .map(|row| {
                let genre = Genre::from_str(
                    row.get_str("_id")
                        .context("genre group key is not a string")?,
                )?;
                let count = match row.get("count") {
                    Some(Bson::Int32(n)) => *n as u64,
                    Some(Bson::Int64(n)) => *n as u64,
                    other => return Err(anyhow!("unexpected genre count value: {other:?}")),
                };
                Ok(GenreCount { genre, count })
            })
            .collect()
    }
}

/// In-process repository holding books in insertion order.
#[derive(Default)]
pub struct InMemoryBookRepository {
    books: RwLock<Vec<Book>>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn insert(&self, book: Book) -> anyhow::Result<Book> {
        self.books.write().await.push(book.clone());
        Ok(book)
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Book>> {
        Ok(self.books.read().await.clone())
    }

    async fn find_by_isbn(&self, isbn: &str) -> anyhow::Result<Option<Book>> {
        Ok(self
            .books
            .read()
            .await
            .iter()
            .find(|book| book.isbn == isbn)
            .cloned())
    }

    async fn update_by_isbn(
        &self,
        isbn: &str,
        patch: &UpdateBook,
    ) -> anyhow::Result<UpdateOutcome> {
        let mut books = self.books.write().await;

        let Some(index) = books.iter().position(|book| book.isbn == isbn) else {
            return Ok(UpdateOutcome::Missing);
        };

        let mut book = books[index].clone();
        let changed = patch.merge_into(&mut book);
        books[index] = book.clone();

        // Mirror the read-back: the patch may rename the isbn, and
        // duplicates resolve to the first match under the new key.
        let current = books
            .iter()
            .find(|stored| stored.isbn == book.isbn)
            .cloned()
            .unwrap_or(book);

        if changed {
            Ok(UpdateOutcome::Updated(current))
        } else {
            Ok(UpdateOutcome::Unchanged(current))
        }
    }

    async fn delete_by_isbn(&self, isbn: &str) -> anyhow::Result<bool> {
        let mut books = self.books.write().await;

        match books.iter().position(|book| book.isbn == isbn) {
            Some(index) => {
                books.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn genre_counts(&self) -> anyhow::Result<Vec<GenreCount>> {
        let mut counts: HashMap<Genre, u64> = HashMap::new();
        for book in self.books.read().await.iter() {
            *counts.entry(book.genre).or_default() += 1;
        }

        let mut rows: Vec<GenreCount> = counts
            .into_iter()
            .map(|(genre, count)| GenreCount { genre, count })
            .collect();
        rows.sort_by_key(|row| (Reverse(row.count), row.genre.as_str()));

        Ok(rows)
    }
}
