//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Collections are rows in a `collections` table; every stored text belongs
//! to exactly one collection.

use super::{check_dimensions, rank, Record, ScoredText, VectorStore};
use crate::error::{KimiError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        description TEXT NOT NULL,
        dimension INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a SQLite vector store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KimiError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    /// Stored dimension of a collection, or `CollectionNotFound`.
    fn dimension_of(conn: &Connection, collection: &str) -> Result<usize> {
        let dimension: Option<i64> = conn
            .query_row(
                "SELECT dimension FROM collections WHERE name = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()?;

        dimension
            .map(|d| d as usize)
            .ok_or_else(|| KimiError::CollectionNotFound(collection.to_string()))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, description))]
    async fn create_collection(
        &self,
        name: &str,
        description: &str,
        dimension: usize,
    ) -> Result<bool> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO collections (name, description, dimension, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![name, description, dimension as i64, Utc::now().to_rfc3339()],
        )?;

        if inserted > 0 {
            info!("Created collection {}", name);
        }
        Ok(inserted > 0)
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM collections WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
        let names = stmt.query_map([], |row| row.get(0))?;
        let result: Vec<String> = names.filter_map(|n| n.ok()).collect();
        Ok(result)
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert(&self, collection: &str, records: &[Record]) -> Result<usize> {
        let conn = self.lock()?;

        let dimension = Self::dimension_of(&conn, collection)?;
        check_dimensions(collection, dimension, records)?;

        let tx = conn.unchecked_transaction()?;
        for record in records {
            tx.execute(
                "INSERT INTO documents (id, collection, text, embedding) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id.to_string(),
                    collection,
                    record.text,
                    Self::embedding_to_bytes(&record.embedding),
                ],
            )?;
        }
        tx.commit()?;

        info!("Inserted {} documents into {}", records.len(), collection);
        Ok(records.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredText>> {
        let conn = self.lock()?;
        Self::dimension_of(&conn, collection)?;

        let mut stmt =
            conn.prepare("SELECT text, embedding FROM documents WHERE collection = ?1")?;
        let rows = stmt.query_map(params![collection], |row| {
            let text: String = row.get(0)?;
            let bytes: Vec<u8> = row.get(1)?;
            Ok((text, Self::bytes_to_embedding(&bytes)))
        })?;
        let rows: Vec<(String, Vec<f32>)> = rows.filter_map(|r| r.ok()).collect();

        let results = rank(
            rows.iter().map(|(text, emb)| (text.as_str(), emb.as_slice())),
            query_embedding,
            limit,
        );

        debug!("Found {} matching documents in {}", results.len(), collection);
        Ok(results)
    }

    async fn fetch_texts(&self, collection: &str, limit: usize) -> Result<Vec<String>> {
        let conn = self.lock()?;
        Self::dimension_of(&conn, collection)?;

        let mut stmt = conn.prepare(
            "SELECT text FROM documents WHERE collection = ?1 ORDER BY rowid LIMIT ?2",
        )?;
        let texts = stmt.query_map(params![collection, limit as i64], |row| row.get(0))?;
        let result: Vec<String> = texts.filter_map(|t| t.ok()).collect();
        Ok(result)
    }

    async fn row_count(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;
        Self::dimension_of(&conn, collection)?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
