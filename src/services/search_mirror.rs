//! Full-text search mirror.
//!
//! A derived index of the record store, keyed by record id. The store stays
//! authoritative: the mirror can be dropped and rebuilt at any time.

use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use crate::database::connection::Database;
use crate::types::errors::MirrorError;
use crate::types::record::Record;
use crate::types::search::SearchCriteria;

/// Operations a search index must provide to mirror the store.
pub trait SearchMirror: Send + Sync {
    /// Inserts or replaces the document for `record.id`.
    fn upsert(&self, record: &Record) -> Result<(), MirrorError>;
    /// Removes a document. Removing an absent id is not an error.
    fn delete(&self, id: u64) -> Result<(), MirrorError>;
    /// Clears the index and inserts every record.
    fn rebuild_all(&self, records: &[Record]) -> Result<(), MirrorError>;
    /// Number of indexed documents.
    fn count(&self) -> Result<usize, MirrorError>;
    /// Ids matching normalized `criteria`, best first, at most `limit`.
    fn search(&self, criteria: &SearchCriteria, limit: usize) -> Result<Vec<u64>, MirrorError>;
}

/// `SearchMirror` backed by a SQLite database with an FTS5 table.
pub struct SqliteSearchMirror {
    db: Mutex<Database>,
}

impl SqliteSearchMirror {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>, MirrorError> {
        self.db
            .lock()
            .map_err(|e| MirrorError::Unavailable(format!("index connection poisoned: {}", e)))
    }

    fn insert_document(conn: &Connection, record: &Record) -> Result<(), rusqlite::Error> {
        let id = record.id as i64;
        conn.execute(
            "INSERT OR REPLACE INTO documents (id, url, title, comment, rating, likes, author, created_date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                record.url,
                record.title,
                record.comment,
                record.rating,
                record.likes as i64,
                record.author,
                record.created_date
            ],
        )?;
        conn.execute("DELETE FROM document_tags WHERE doc_id = ?1", params![id])?;
        for (position, tag) in record.tags.iter().enumerate() {
            conn.execute(
                "INSERT INTO document_tags (doc_id, position, tag) VALUES (?1, ?2, ?3)",
                params![id, position as i64, tag],
            )?;
        }
        conn.execute("DELETE FROM documents_fts WHERE rowid = ?1", params![id])?;
        conn.execute(
            "INSERT INTO documents_fts (rowid, title, comment) VALUES (?1, ?2, ?3)",
            params![id, record.title, record.comment],
        )?;
        Ok(())
    }
}

/// Turns free text into an FTS5 expression: every word becomes a quoted prefix
/// term and the terms are OR-ed, so any matching word counts and bm25 ranks
/// documents matching more of them higher.
pub fn fts_expression(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split_whitespace()
        .map(|word| format!("\"{}\"*", word.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn db_err(e: rusqlite::Error) -> MirrorError {
    MirrorError::Database(e.to_string())
}

impl SearchMirror for SqliteSearchMirror {
    fn upsert(&self, record: &Record) -> Result<(), MirrorError> {
        let mut db = self.db()?;
        let tx = db.connection_mut().transaction().map_err(db_err)?;
        Self::insert_document(&tx, record).map_err(db_err)?;
        tx.commit().map_err(db_err)
    }

    fn delete(&self, id: u64) -> Result<(), MirrorError> {
        let mut db = self.db()?;
        let tx = db.connection_mut().transaction().map_err(db_err)?;
        let id = id as i64;
        tx.execute("DELETE FROM document_tags WHERE doc_id = ?1", params![id])
            .map_err(db_err)?;
        tx.execute("DELETE FROM documents_fts WHERE rowid = ?1", params![id])
            .map_err(db_err)?;
        tx.execute("DELETE FROM documents WHERE id = ?1", params![id])
            .map_err(db_err)?;
        tx.commit().map_err(db_err)
    }

    fn rebuild_all(&self, records: &[Record]) -> Result<(), MirrorError> {
        let mut db = self.db()?;
        let tx = db.connection_mut().transaction().map_err(db_err)?;
        tx.execute_batch(
            "DELETE FROM document_tags;
             DELETE FROM documents_fts;
             DELETE FROM documents;",
        )
        .map_err(db_err)?;
        for record in records {
            Self::insert_document(&tx, record).map_err(db_err)?;
        }
        tx.commit().map_err(db_err)
    }

    fn count(&self) -> Result<usize, MirrorError> {
        let db = self.db()?;
        let n: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(n as usize)
    }

    fn search(&self, criteria: &SearchCriteria, limit: usize) -> Result<Vec<u64>, MirrorError> {
        let mut sql = String::from("SELECT d.id FROM documents d");
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        let expression = criteria.text.as_deref().and_then(fts_expression);
        if let Some(expr) = &expression {
            sql.push_str(" JOIN documents_fts ON documents_fts.rowid = d.id");
            clauses.push("documents_fts MATCH ?");
            values.push(Value::Text(expr.clone()));
        }
        if let Some(tag) = &criteria.tag {
            clauses.push("EXISTS (SELECT 1 FROM document_tags t WHERE t.doc_id = d.id AND t.tag = ?)");
            values.push(Value::Text(tag.clone()));
        }
        if let Some(author) = &criteria.author {
            clauses.push("d.author = ?");
            values.push(Value::Text(author.clone()));
        }
        if let Some(from) = &criteria.date_from {
            clauses.push("d.created_date >= ?");
            values.push(Value::Text(from.clone()));
        }
        if let Some(to) = &criteria.date_to {
            clauses.push("d.created_date <= ?");
            values.push(Value::Text(to.clone()));
        }
        if let Some(min) = criteria.rating_min {
            clauses.push("d.rating >= ?");
            values.push(Value::Real(min));
        }
        if let Some(max) = criteria.rating_max {
            clauses.push("d.rating <= ?");
            values.push(Value::Real(max));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if expression.is_some() {
            sql.push_str(" ORDER BY bm25(documents_fts), d.rating DESC, d.id ASC");
        } else {
            sql.push_str(" ORDER BY d.rating DESC, d.id ASC");
        }
        sql.push_str(" LIMIT ?");
        values.push(Value::Integer(limit as i64));

        let db = self.db()?;
        let mut stmt = db.connection().prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get::<_, i64>(0))
            .map_err(|e| MirrorError::InvalidQuery(e.to_string()))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(db_err)? as u64);
        }
        Ok(ids)
    }
}
