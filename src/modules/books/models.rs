use serde::{Deserialize, Serialize};
use serde_json::json;

const TITLE_MIN: usize = 1;
const TITLE_MAX: usize = 100;
const AUTHOR_MIN: usize = 1;
const AUTHOR_MAX: usize = 100;
const ISBN_MIN: usize = 10;
const ISBN_MAX: usize = 13;
const YEAR_MIN: i32 = 1800;
const YEAR_MAX: i32 = 2100;

/// Closed set of book genres. Unknown values are rejected during
/// deserialization, before anything reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Fiction,
    Nonfiction,
    Fantasy,
    ScienceFiction,
    Biography,
}

impl Genre {
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "fiction",
            Genre::Nonfiction => "nonfiction",
            Genre::Fantasy => "fantasy",
            Genre::ScienceFiction => "science_fiction",
            Genre::Biography => "biography",
        }
    }
}

impl std::str::FromStr for Genre {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fiction" => Ok(Genre::Fiction),
            "nonfiction" => Ok(Genre::Nonfiction),
            "fantasy" => Ok(Genre::Fantasy),
            "science_fiction" => Ok(Genre::ScienceFiction),
            "biography" => Ok(Genre::Biography),
            other => Err(anyhow::anyhow!("unknown genre '{other}'")),
        }
    }
}

/// A book record as exposed by the API. The store's surrogate id is
/// never part of this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub genre: Genre,
    pub published_year: i32,
    pub available: bool,
}

impl Book {
    /// Check every field constraint, collecting all violations.
    pub fn validate(&self) -> Result<(), Vec<serde_json::Value>> {
        let mut details = Vec::new();

        check_length("title", &self.title, TITLE_MIN, TITLE_MAX, &mut details);
        check_length("author", &self.author, AUTHOR_MIN, AUTHOR_MAX, &mut details);
        check_length("isbn", &self.isbn, ISBN_MIN, ISBN_MAX, &mut details);
        check_year(self.published_year, &mut details);

        if details.is_empty() {
            Ok(())
        } else {
            Err(details)
        }
    }
}

/// Partial-update request: absent fields leave the stored value
/// unchanged; present fields obey the same constraints as [`Book`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl UpdateBook {
    /// Check every present field against its constraint, collecting all
    /// violations.
    pub fn validate(&self) -> Result<(), Vec<serde_json::Value>> {
        let mut details = Vec::new();

        if let Some(title) = &self.title {
            check_length("title", title, TITLE_MIN, TITLE_MAX, &mut details);
        }
        if let Some(author) = &self.author {
            check_length("author", author, AUTHOR_MIN, AUTHOR_MAX, &mut details);
        }
        if let Some(isbn) = &self.isbn {
            check_length("isbn", isbn, ISBN_MIN, ISBN_MAX, &mut details);
        }
        if let Some(year) = self.published_year {
            check_year(year, &mut details);
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(details)
        }
    }

    /// True when no field is present, i.e. the patch cannot change anything.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.isbn.is_none()
            && self.genre.is_none()
            && self.published_year.is_none()
            && self.available.is_none()
    }

    /// Merge present fields over `book`. Returns true if any stored
    /// value actually changed.
    pub fn merge_into(&self, book: &mut Book) -> bool {
        let before = book.clone();

        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(author) = &self.author {
            book.author = author.clone();
        }
        if let Some(isbn) = &self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(year) = self.published_year {
            book.published_year = year;
        }
        if let Some(available) = self.available {
            book.available = available;
        }

        *book != before
    }
}

/// One row of the genre statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: Genre,
    pub count: u64,
}

fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
    details: &mut Vec<serde_json::Value>,
) {
    let chars = value.chars().count();
    if chars < min || chars > max {
        details.push(json!({
            "field": field,
            "error": format!("length must be between {min} and {max} characters"),
            "value": value,
        }));
    }
}

fn check_year(year: i32, details: &mut Vec<serde_json::Value>) {
    if !(YEAR_MIN..=YEAR_MAX).contains(&year) {
        details.push(json!({
            "field": "published_year",
            "error": format!("must be between {YEAR_MIN} and {YEAR_MAX}"),
            "value": year,
        }));
    }
}
