//! Tool catalog, argument parsing and dispatch for the assistant.

use crate::error::{KimiError, Result};
use crate::knowledge::{
    CollectionContent, CollectionNames, CollectionRef, Connected, FileChunks, Inserted,
    KnowledgeBase, Outcome, SearchHits, Upload,
};
use crate::web::{PageDownload, WebDownloader};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// Names of every tool in the catalog, in catalog order.
pub const TOOL_NAMES: [&str; 11] = [
    "connect_database",
    "create_collection",
    "add_documents",
    "search_documents",
    "get_collection_content",
    "list_all_collections",
    "read_and_chunk_file",
    "upload_file_to_collection",
    "download_webpage",
    "batch_download_webpages",
    "download_free_books",
];

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    ConnectDatabase,

    CreateCollection {
        collection_name: String,
        #[serde(default)]
        description: String,
    },

    AddDocuments {
        collection_name: String,
        documents: Vec<String>,
    },

    SearchDocuments {
        collection_name: String,
        query: String,
        #[serde(default = "default_limit")]
        limit: usize,
    },

    GetCollectionContent { collection_name: String },

    ListAllCollections,

    ReadAndChunkFile {
        file_path: String,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    },

    UploadFileToCollection {
        file_path: String,
        collection_name: String,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    },

    DownloadWebpage { url: String },

    BatchDownloadWebpages { urls: Vec<String> },

    DownloadFreeBooks {
        #[serde(default = "default_book_count")]
        count: usize,
    },
}

fn default_limit() -> usize {
    5
}

fn default_book_count() -> usize {
    3
}

impl ToolCall {
    /// Catalog name of this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::ConnectDatabase => "connect_database",
            ToolCall::CreateCollection { .. } => "create_collection",
            ToolCall::AddDocuments { .. } => "add_documents",
            ToolCall::SearchDocuments { .. } => "search_documents",
            ToolCall::GetCollectionContent { .. } => "get_collection_content",
            ToolCall::ListAllCollections => "list_all_collections",
            ToolCall::ReadAndChunkFile { .. } => "read_and_chunk_file",
            ToolCall::UploadFileToCollection { .. } => "upload_file_to_collection",
            ToolCall::DownloadWebpage { .. } => "download_webpage",
            ToolCall::BatchDownloadWebpages { .. } => "batch_download_webpages",
            ToolCall::DownloadFreeBooks { .. } => "download_free_books",
        }
    }
}

/// Parse a tool call from the name and JSON arguments sent by the model.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    if !TOOL_NAMES.contains(&name) {
        return Err(KimiError::Agent(format!("Unknown tool: {}", name)));
    }

    let mut args: Value = if arguments.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(arguments)
            .map_err(|e| KimiError::Agent(format!("Invalid tool arguments: {}", e)))?
    };

    let object = args
        .as_object_mut()
        .ok_or_else(|| KimiError::Agent("Tool arguments must be a JSON object".to_string()))?;
    object.insert("name".to_string(), Value::String(name.to_string()));

    serde_json::from_value(args)
        .map_err(|e| KimiError::Agent(format!("Invalid arguments for {}: {}", name, e)))
}

/// Payload of the batch-style download tools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageBatch {
    pub results: Vec<PageDownload>,
}

/// Result of a tool execution, serialized as the tool message content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Connected(Outcome<Connected>),
    Collection(Outcome<CollectionRef>),
    Inserted(Outcome<Inserted>),
    Search(Outcome<SearchHits>),
    Content(Outcome<CollectionContent>),
    Collections(Outcome<CollectionNames>),
    Chunks(Outcome<FileChunks>),
    Upload(Outcome<Upload>),
    Page(PageDownload),
    Pages(Outcome<PageBatch>),
    /// The call never reached a tool: bad arguments, unknown name, or a
    /// failed search pre-step.
    Failed(Outcome<()>),
}

impl ToolOutput {
    pub fn failed(message: impl Into<String>) -> Self {
        ToolOutput::Failed(Outcome::fail(message))
    }

    pub fn is_success(&self) -> bool {
        match self {
            ToolOutput::Connected(o) => o.success,
            ToolOutput::Collection(o) => o.success,
            ToolOutput::Inserted(o) => o.success,
            ToolOutput::Search(o) => o.success,
            ToolOutput::Content(o) => o.success,
            ToolOutput::Collections(o) => o.success,
            ToolOutput::Chunks(o) => o.success,
            ToolOutput::Upload(o) => o.success,
            ToolOutput::Page(p) => p.success,
            ToolOutput::Pages(o) => o.success,
            ToolOutput::Failed(o) => o.success,
        }
    }

    /// JSON text sent back to the model.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            json!({"success": false, "message": format!("Unserializable tool result: {}", e)})
                .to_string()
        })
    }
}

/// Collaborators the tools operate on.
pub struct ToolContext {
    pub knowledge: KnowledgeBase,
    pub web: WebDownloader,
}

impl ToolContext {
    pub fn new(knowledge: KnowledgeBase, web: WebDownloader) -> Self {
        Self { knowledge, web }
    }

    /// Execute a tool call. Failures are reported inside the output.
    pub async fn execute(&mut self, tool: &ToolCall) -> ToolOutput {
        info!("Executing tool {}", tool.name());

        match tool {
            ToolCall::ConnectDatabase => ToolOutput::Connected(self.knowledge.connect()),
            ToolCall::CreateCollection {
                collection_name,
                description,
            } => ToolOutput::Collection(
                self.knowledge
                    .create_collection(collection_name, description)
                    .await,
            ),
            ToolCall::AddDocuments {
                collection_name,
                documents,
            } => ToolOutput::Inserted(
                self.knowledge
                    .add_documents(collection_name, documents)
                    .await,
            ),
            ToolCall::SearchDocuments {
                collection_name,
                query,
                limit,
            } => ToolOutput::Search(
                self.knowledge
                    .search_documents(collection_name, query, *limit)
                    .await,
            ),
            ToolCall::GetCollectionContent { collection_name } => {
                ToolOutput::Content(self.knowledge.get_collection_content(collection_name).await)
            }
            ToolCall::ListAllCollections => {
                ToolOutput::Collections(self.knowledge.list_all_collections().await)
            }
            ToolCall::ReadAndChunkFile {
                file_path,
                chunk_size,
                overlap,
            } => ToolOutput::Chunks(
                self.knowledge
                    .read_and_chunk_file(file_path, *chunk_size, *overlap)
                    .await,
            ),
            ToolCall::UploadFileToCollection {
                file_path,
                collection_name,
                chunk_size,
                overlap,
            } => ToolOutput::Upload(
                self.knowledge
                    .upload_file_to_collection(file_path, collection_name, *chunk_size, *overlap)
                    .await,
            ),
            ToolCall::DownloadWebpage { url } => {
                ToolOutput::Page(self.web.download_webpage(url).await)
            }
            ToolCall::BatchDownloadWebpages { urls } => {
                let results = self.web.batch_download(urls).await;
                ToolOutput::Pages(Outcome::ok(
                    format!("Batch download finished, {} URLs", urls.len()),
                    PageBatch { results },
                ))
            }
            ToolCall::DownloadFreeBooks { count } => {
                let results = self.web.download_free_books(*count).await;
                ToolOutput::Pages(Outcome::ok(
                    format!(
                        "Download finished, files are in {}",
                        self.web.download_dir().display()
                    ),
                    PageBatch { results },
                ))
            }
        }
    }
}

fn tool(name: &str, description: &str, parameters: Value) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters: Some(parameters),
            strict: None,
        },
    }
}

/// OpenAI function definitions for every tool, in catalog order.
pub fn tool_definitions() -> Vec<ChatCompletionTool> {
    vec![
        tool(
            "connect_database",
            "Connect to the vector database. Call this before any other database operation.",
            json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        ),
        tool(
            "create_collection",
            "Create a new document collection.",
            json!({
                "type": "object",
                "properties": {
                    "collection_name": {"type": "string", "description": "Collection name"},
                    "description": {"type": "string", "description": "Collection description"}
                },
                "required": ["collection_name"]
            }),
        ),
        tool(
            "add_documents",
            "Add documents to a collection.",
            json!({
                "type": "object",
                "properties": {
                    "collection_name": {"type": "string", "description": "Collection name"},
                    "documents": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Documents to add"
                    }
                },
                "required": ["collection_name", "documents"]
            }),
        ),
        tool(
            "search_documents",
            "Search a collection for documents similar to a query.",
            json!({
                "type": "object",
                "properties": {
                    "collection_name": {"type": "string", "description": "Collection name"},
                    "query": {"type": "string", "description": "What to search for"},
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": 5
                    }
                },
                "required": ["collection_name", "query"]
            }),
        ),
        tool(
            "get_collection_content",
            "Read the documents stored in a collection directly, without vector search.",
            json!({
                "type": "object",
                "properties": {
                    "collection_name": {"type": "string", "description": "Collection name"}
                },
                "required": ["collection_name"]
            }),
        ),
        tool(
            "list_all_collections",
            "List every collection in the database.",
            json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        ),
        tool(
            "read_and_chunk_file",
            "Read a local text file and split it into chunks.",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path of the file"},
                    "chunk_size": {
                        "type": "integer",
                        "description": "Characters per chunk",
                        "default": 500
                    },
                    "overlap": {
                        "type": "integer",
                        "description": "Characters shared by neighbouring chunks",
                        "default": 50
                    }
                },
                "required": ["file_path"]
            }),
        ),
        tool(
            "upload_file_to_collection",
            "Upload a local file into a collection: it is chunked, embedded and stored. \
            The collection is created if it does not exist.",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path of the file"},
                    "collection_name": {"type": "string", "description": "Target collection"},
                    "chunk_size": {
                        "type": "integer",
                        "description": "Characters per chunk",
                        "default": 500
                    },
                    "overlap": {
                        "type": "integer",
                        "description": "Characters shared by neighbouring chunks",
                        "default": 50
                    }
                },
                "required": ["file_path", "collection_name"]
            }),
        ),
        tool(
            "download_webpage",
            "Download a web page and save its text as a file.",
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "Page URL"}
                },
                "required": ["url"]
            }),
        ),
        tool(
            "batch_download_webpages",
            "Download several web pages and save each as a text file.",
            json!({
                "type": "object",
                "properties": {
                    "urls": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Page URLs"
                    }
                },
                "required": ["urls"]
            }),
        ),
        tool(
            "download_free_books",
            "Download a few classic public-domain books to experiment with.",
            json!({
                "type": "object",
                "properties": {
                    "count": {
                        "type": "integer",
                        "description": "How many books to download",
                        "default": 3
                    }
                },
                "required": []
            }),
        ),
    ]
}
