//! Catalog export for the retrieval index.
//!
//! Reads every distinct published book from the warehouse and serializes
//! it as newline-delimited JSON, one object per book with exactly the keys
//! `book_id`, `title`, `description`. The batch job uploads the resulting
//! document into the assistant's vector store; the `export` subcommand
//! writes the same format to a file or stdout for inspection.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::models::CatalogBook;

/// Fetch all distinct published books from the production view.
pub async fn fetch_catalog(pool: &PgPool) -> Result<Vec<CatalogBook>> {
    let rows = sqlx::query(
        "SELECT DISTINCT book_id, title, description \
         FROM published_books ORDER BY book_id",
    )
    .fetch_all(pool)
    .await?;

    let books = rows
        .iter()
        .map(|row| CatalogBook {
            book_id: row.get("book_id"),
            title: row.get("title"),
            description: row.get("description"),
        })
        .collect();

    Ok(books)
}

/// Serialize books as NDJSON, one object per line.
pub fn write_catalog<W: Write>(books: &[CatalogBook], mut writer: W) -> Result<()> {
    for book in books {
        let line = serde_json::to_string(book)?;
        writeln!(writer, "{}", line)?;
    }
    Ok(())
}

/// Export the catalog to a temporary `.json` file for index provisioning.
///
/// The file is removed when the returned handle is dropped, so the caller
/// must keep it alive until the upload has completed.
pub async fn export_catalog(pool: &PgPool) -> Result<NamedTempFile> {
    let books = fetch_catalog(pool).await?;

    let mut file = tempfile::Builder::new()
        .prefix("catalog-")
        .suffix(".json")
        .tempfile()
        .context("Failed to create catalog temp file")?;

    write_catalog(&books, &mut file)?;
    file.flush()?;

    eprintln!("Exported {} catalog books", books.len());

    Ok(file)
}

/// Export the catalog to a chosen path, or stdout when `output` is `None`.
pub async fn run_export(pool: &PgPool, output: Option<&Path>) -> Result<()> {
    let books = fetch_catalog(pool).await?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(path)?;
            write_catalog(&books, file)?;
            eprintln!("Exported {} books to {}", books.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            write_catalog(&books, stdout.lock())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_books() -> Vec<CatalogBook> {
        vec![
            CatalogBook {
                book_id: "bk-001".to_string(),
                title: "The Science of Space".to_string(),
                description: "An introduction to astrophysics.".to_string(),
            },
            CatalogBook {
                book_id: "bk-002".to_string(),
                title: "Forest Friends".to_string(),
                description: "Animal stories\nwith a newline.".to_string(),
            },
        ]
    }

    #[test]
    fn ndjson_one_line_per_book() {
        let mut buf = Vec::new();
        write_catalog(&sample_books(), &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn ndjson_lines_have_exact_keys() {
        let mut buf = Vec::new();
        write_catalog(&sample_books(), &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();

        for line in out.lines() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            let obj = value.as_object().unwrap();
            let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
            keys.sort_unstable();
            assert_eq!(keys, vec!["book_id", "description", "title"]);
        }
    }

    #[test]
    fn embedded_newlines_stay_escaped() {
        let mut buf = Vec::new();
        write_catalog(&sample_books(), &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        // The literal newline in the description must not split the record.
        let second: serde_json::Value = serde_json::from_str(out.lines().nth(1).unwrap()).unwrap();
        assert_eq!(second["book_id"], "bk-002");
    }

    #[test]
    fn empty_catalog_writes_nothing() {
        let mut buf = Vec::new();
        write_catalog(&[], &mut buf).unwrap();
        assert!(buf.is_empty());
    }
}
