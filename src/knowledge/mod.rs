//! Knowledge base: the vector-store operations exposed to the model.
//!
//! Every public operation returns an [`Outcome`] instead of an error, so a
//! failing operation becomes a structured tool result the model can read.
//! Data operations require an explicit [`KnowledgeBase::connect`] first.

mod outcome;

pub use outcome::{
    CollectionContent, CollectionNames, CollectionRef, Connected, FileChunks, Inserted, Outcome,
    SearchHits, Upload,
};

use crate::chunking::{chunk_text, ChunkingConfig};
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{KimiError, Result};
use crate::vector_store::{Record, SqliteVectorStore, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Where `connect` gets its store from.
pub enum StoreBackend {
    /// Open (or create) a SQLite file on connect.
    Sqlite(PathBuf),
    /// Hand out an already-open store.
    Shared(Arc<dyn VectorStore>),
}

impl StoreBackend {
    fn open(&self) -> Result<Arc<dyn VectorStore>> {
        match self {
            StoreBackend::Sqlite(path) => Ok(Arc::new(SqliteVectorStore::new(path)?)),
            StoreBackend::Shared(store) => Ok(store.clone()),
        }
    }

    fn describe(&self) -> String {
        match self {
            StoreBackend::Sqlite(path) => format!("SQLite at {}", path.display()),
            StoreBackend::Shared(_) => "shared store".to_string(),
        }
    }
}

/// How an incoming collection name maps to the stored one.
#[derive(Debug, Clone, Copy)]
enum Naming {
    /// Apply the configured prefix unless already present.
    Prefixed,
    /// Use the name verbatim.
    Stored,
}

/// Vector-store collaborator used by the assistant's tools.
pub struct KnowledgeBase {
    backend: StoreBackend,
    store: Option<Arc<dyn VectorStore>>,
    embedder: Arc<dyn Embedder>,
    prefix: String,
    chunking: ChunkingConfig,
    content_limit: usize,
}

impl KnowledgeBase {
    /// Create a knowledge base. Nothing is opened until `connect`.
    pub fn new(backend: StoreBackend, embedder: Arc<dyn Embedder>, prefix: &str) -> Self {
        Self {
            backend,
            store: None,
            embedder,
            prefix: prefix.to_string(),
            chunking: ChunkingConfig::default(),
            content_limit: 100,
        }
    }

    /// Create a knowledge base backed by the configured SQLite file.
    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(
            StoreBackend::Sqlite(settings.sqlite_path()),
            embedder,
            &settings.vector_store.collection_prefix,
        )
        .with_chunking(ChunkingConfig::from(&settings.chunking))
        .with_content_limit(settings.vector_store.content_limit)
    }

    /// Set default chunking for file operations.
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Set the maximum number of documents `get_collection_content` returns.
    pub fn with_content_limit(mut self, limit: usize) -> Self {
        self.content_limit = limit;
        self
    }

    /// Collection prefix applied to bare names.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `connect` has succeeded and `disconnect` has not been called since.
    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// Open the store. Reconnecting keeps the existing handle.
    #[instrument(skip(self))]
    pub fn connect(&mut self) -> Outcome<Connected> {
        let location = self.backend.describe();

        if self.store.is_some() {
            return Outcome::ok(
                format!("Already connected to vector database ({})", location),
                Connected { client: location },
            );
        }

        match self.backend.open() {
            Ok(store) => {
                self.store = Some(store);
                info!("Connected to vector database ({})", location);
                Outcome::ok(
                    format!("Connected to vector database ({})", location),
                    Connected { client: location },
                )
            }
            Err(e) => Outcome::from_result("Failed to connect to database", Err(e)),
        }
    }

    /// Release the store handle.
    pub fn disconnect(&mut self) {
        if self.store.take().is_some() {
            info!("Disconnected from vector database");
        }
    }

    fn store(&self) -> Result<&Arc<dyn VectorStore>> {
        self.store.as_ref().ok_or(KimiError::NotConnected)
    }

    /// User-facing name: spaces become underscores.
    fn display_name(name: &str) -> String {
        name.trim().replace(' ', "_")
    }

    /// Stored name: display name with the prefix, unless already prefixed.
    pub fn full_name(&self, name: &str) -> String {
        let name = Self::display_name(name);
        if name.starts_with(&self.prefix) {
            name
        } else {
            format!("{}{}", self.prefix, name)
        }
    }

    /// Resolve a collection that must already exist.
    async fn existing(&self, name: &str) -> Result<(&Arc<dyn VectorStore>, String)> {
        self.existing_as(name, Naming::Prefixed).await
    }

    async fn existing_as(
        &self,
        name: &str,
        naming: Naming,
    ) -> Result<(&Arc<dyn VectorStore>, String)> {
        let store = self.store()?;
        let full = match naming {
            Naming::Prefixed => self.full_name(name),
            Naming::Stored => name.to_string(),
        };
        if !store.has_collection(&full).await? {
            return Err(KimiError::CollectionNotFound(Self::display_name(name)));
        }
        Ok((store, full))
    }

    /// Create a collection; an existing one is reported as success.
    pub async fn create_collection(&self, name: &str, description: &str) -> Outcome<CollectionRef> {
        Outcome::from_result(
            "Failed to create collection",
            self.try_create_collection(name, description).await,
        )
    }

    async fn try_create_collection(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Outcome<CollectionRef>> {
        let store = self.store()?;
        let display = Self::display_name(name);
        if display.is_empty() {
            return Err(KimiError::InvalidInput("collection name is empty".to_string()));
        }
        let full = self.full_name(name);

        let created = store
            .create_collection(&full, description, self.embedder.dimensions())
            .await?;

        let message = if created {
            format!("Created collection '{}'", display)
        } else {
            format!("Collection '{}' already exists", display)
        };
        Ok(Outcome::ok(message, CollectionRef { collection: full }))
    }

    /// Embed and insert texts into an existing collection.
    pub async fn add_documents(&self, name: &str, documents: &[String]) -> Outcome<Inserted> {
        Outcome::from_result(
            "Failed to add documents",
            self.try_add_documents(name, documents).await,
        )
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn try_add_documents(
        &self,
        name: &str,
        documents: &[String],
    ) -> Result<Outcome<Inserted>> {
        let (store, full) = self.existing(name).await?;
        let display = Self::display_name(name);

        if documents.is_empty() {
            return Ok(Outcome::ok(
                format!("No documents to add to collection '{}'", display),
                Inserted { insert_count: 0 },
            ));
        }

        let embeddings = self.embedder.embed_batch(documents).await?;
        if embeddings.len() != documents.len() {
            return Err(KimiError::Embedding(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let records: Vec<Record> = documents
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(text, embedding)| Record::new(text, embedding))
            .collect();

        let inserted = store.insert(&full, &records).await?;

        Ok(Outcome::ok(
            format!("Added {} documents to collection '{}'", documents.len(), display),
            Inserted {
                insert_count: inserted,
            },
        ))
    }

    /// Vector search within a collection.
    pub async fn search_documents(
        &self,
        name: &str,
        query: &str,
        limit: usize,
    ) -> Outcome<SearchHits> {
        Outcome::from_result(
            "Failed to search documents",
            self.try_search_documents(name, Naming::Prefixed, query, limit)
                .await,
        )
    }

    /// Vector search in a collection named exactly as the store lists it.
    pub async fn search_stored_collection(
        &self,
        stored: &str,
        query: &str,
        limit: usize,
    ) -> Outcome<SearchHits> {
        Outcome::from_result(
            "Failed to search documents",
            self.try_search_documents(stored, Naming::Stored, query, limit)
                .await,
        )
    }

    #[instrument(skip(self, query))]
    async fn try_search_documents(
        &self,
        name: &str,
        naming: Naming,
        query: &str,
        limit: usize,
    ) -> Result<Outcome<SearchHits>> {
        let (store, full) = self.existing_as(name, naming).await?;

        let embedding = self.embedder.embed(query).await?;
        let results = store.search(&full, &embedding, limit).await?;
        debug!("Search in {} returned {} results", full, results.len());

        Ok(Outcome::ok(
            "",
            SearchHits {
                count: results.len(),
                results,
                collection_content: None,
            },
        ))
    }

    /// All stored texts of a collection, bypassing vector search.
    pub async fn get_collection_content(&self, name: &str) -> Outcome<CollectionContent> {
        Outcome::from_result(
            "Failed to get collection content",
            self.try_get_collection_content(name, Naming::Prefixed).await,
        )
    }

    /// Like [`Self::get_collection_content`], for a name as the store lists it.
    pub async fn stored_collection_content(&self, stored: &str) -> Outcome<CollectionContent> {
        Outcome::from_result(
            "Failed to get collection content",
            self.try_get_collection_content(stored, Naming::Stored).await,
        )
    }

    async fn try_get_collection_content(
        &self,
        name: &str,
        naming: Naming,
    ) -> Result<Outcome<CollectionContent>> {
        let (store, full) = self.existing_as(name, naming).await?;
        let display = Self::display_name(name);

        if store.row_count(&full).await? == 0 {
            return Ok(Outcome::ok(
                format!("Collection '{}' is empty", display),
                CollectionContent {
                    count: 0,
                    documents: Vec::new(),
                },
            ));
        }

        let documents = store.fetch_texts(&full, self.content_limit).await?;
        Ok(Outcome::ok(
            format!("Retrieved documents from collection '{}'", display),
            CollectionContent {
                count: documents.len(),
                documents,
            },
        ))
    }

    /// Names of every collection in the store.
    pub async fn list_all_collections(&self) -> Outcome<CollectionNames> {
        Outcome::from_result("Failed to list collections", self.try_list_all_collections().await)
    }

    async fn try_list_all_collections(&self) -> Result<Outcome<CollectionNames>> {
        let collections = self.store()?.list_collections().await?;
        Ok(Outcome::ok("", CollectionNames { collections }))
    }

    /// Read a UTF-8 file and split it into chunks. Works without a connection.
    ///
    /// Unset values fall back to the configured chunking; a zero chunk size
    /// counts as unset.
    pub async fn read_and_chunk_file(
        &self,
        path: &str,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    ) -> Outcome<FileChunks> {
        Outcome::from_result(
            "Failed to read file",
            self.try_read_and_chunk_file(path, chunk_size, overlap).await,
        )
    }

    async fn try_read_and_chunk_file(
        &self,
        path: &str,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    ) -> Result<Outcome<FileChunks>> {
        let file_path = Path::new(path);
        if !file_path.exists() {
            return Ok(Outcome::fail(format!("File '{}' does not exist", path)));
        }

        let text = tokio::fs::read_to_string(file_path).await?;
        let config = ChunkingConfig {
            chunk_size: chunk_size.filter(|&n| n > 0).unwrap_or(self.chunking.chunk_size),
            overlap: overlap.unwrap_or(self.chunking.overlap),
        };
        let chunks = chunk_text(&text, config);

        Ok(Outcome::ok(
            "",
            FileChunks {
                file_name: file_name(file_path),
                chunk_count: chunks.len(),
                chunks,
            },
        ))
    }

    /// Chunk a file and insert it, creating the collection when missing.
    ///
    /// The first failing step's message is returned unchanged.
    pub async fn upload_file_to_collection(
        &self,
        path: &str,
        name: &str,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    ) -> Outcome<Upload> {
        Outcome::from_result(
            "Failed to upload file",
            self.try_upload_file(path, name, chunk_size, overlap).await,
        )
    }

    async fn try_upload_file(
        &self,
        path: &str,
        name: &str,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    ) -> Result<Outcome<Upload>> {
        let store = self.store()?;
        let file = file_name(Path::new(path));
        let full = self.full_name(name);

        if !store.has_collection(&full).await? {
            let created = self
                .create_collection(name, &format!("Collection for {}", file))
                .await;
            if !created.success {
                return Ok(Outcome::fail(created.message));
            }
        }

        let chunked = self.read_and_chunk_file(path, chunk_size, overlap).await;
        let chunks = match chunked.data {
            Some(c) if chunked.success => c,
            _ => return Ok(Outcome::fail(chunked.message)),
        };

        let added = self.add_documents(name, &chunks.chunks).await;
        let inserted = match added.data {
            Some(i) if added.success => i,
            _ => return Ok(Outcome::fail(added.message)),
        };

        Ok(Outcome::ok(
            format!(
                "Uploaded file '{}' to collection '{}'",
                file,
                Self::display_name(name)
            ),
            Upload {
                file_name: file,
                collection: full,
                chunk_count: chunks.chunk_count,
                insert_count: inserted.insert_count,
            },
        ))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
