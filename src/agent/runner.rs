//! The assistant: a tool-calling conversation loop over one user command.

use super::llm::{ChatModel, ModelReply, OpenAIChatModel};
use super::resolve::resolve_collection;
use super::retry::{retry_with_backoff, Backoff, Sleeper, TokioSleeper};
use super::tools::{parse_tool_call, tool_definitions, ToolCall, ToolContext, ToolOutput};
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::error::{KimiError, Result};
use crate::knowledge::{KnowledgeBase, Outcome, SearchHits};
use crate::web::WebDownloader;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default system prompt for the assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an intelligent assistant that manages a vector database and answers questions.

Decision principles:
1. Favour answer speed and quality; choose the best way to respond.
2. Answer general-knowledge questions directly from your own knowledge.
3. Only search the database when:
   - the user explicitly asks to search stored content
   - the question concerns documents or material the user uploaded
   - specific, specialised information has to be looked up
4. You can upload files, download web pages and manage collections.
5. Always aim for the fastest accurate answer.

Important:
- Call connect_database before any other database operation.
- If the API rate limit is hit the system retries automatically; be patient.

Do not use tools for their own sake. Solve the user's problem the best way."#;

/// Message attached to a search that matched nothing in a non-empty collection.
const EMPTY_SEARCH_MESSAGE: &str =
    "Vector search found no matches, but the collection contains documents";

/// Assistant that answers commands, calling tools as the model requests.
pub struct Assistant {
    model: Arc<dyn ChatModel>,
    tools: ToolContext,
    catalog: Vec<ChatCompletionTool>,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
    system_prompt: String,
}

impl Assistant {
    /// Create an assistant over the given model and tool collaborators.
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolContext) -> Self {
        Self {
            model,
            tools,
            catalog: tool_definitions(),
            backoff: Backoff::default(),
            sleeper: Arc::new(TokioSleeper),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Wire up the Kimi model, embedder, knowledge base and downloader from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let model = OpenAIChatModel::from_settings(settings)?;
        let embedder = OpenAIEmbedder::from_settings(settings)?;
        let knowledge = KnowledgeBase::from_settings(settings, Arc::new(embedder));
        let web = WebDownloader::from_settings(settings)?;

        let mut assistant = Self::new(Arc::new(model), ToolContext::new(knowledge, web))
            .with_backoff(Backoff::from_settings(&settings.retry));
        if let Some(prompt) = &settings.llm.system_prompt {
            assistant = assistant.with_system_prompt(prompt);
        }
        Ok(assistant)
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the retry schedule for rate-limited model calls.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set what waits between retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Collaborators the tools run against.
    pub fn tools(&self) -> &ToolContext {
        &self.tools
    }

    /// Release the database handle, if one is open.
    pub fn shutdown(&mut self) {
        self.tools.knowledge.disconnect();
    }

    /// Answer one command. Never fails: errors come back as
    /// `"Execution error: ..."` text.
    pub async fn execute_command(&mut self, command: &str) -> String {
        self.execute_command_traced(command).await.answer
    }

    /// Answer one command and report what happened along the way.
    pub async fn execute_command_traced(&mut self, command: &str) -> CommandTrace {
        let mut trace = CommandTrace::default();

        match self.run(command, &mut trace).await {
            Ok(answer) => {
                info!(
                    "Command finished after {} model calls and {} tool calls",
                    trace.model_calls,
                    trace.tool_calls.len()
                );
                trace.answer = answer;
            }
            Err(e) => {
                error!("Command failed: {}", e);
                trace.answer = format!("Execution error: {}", e);
                trace.failed = true;
            }
        }

        trace
    }

    async fn run(&mut self, command: &str, trace: &mut CommandTrace) -> Result<String> {
        if command.trim().is_empty() {
            return Err(KimiError::InvalidInput("command is empty".to_string()));
        }

        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.clone())
                .build()
                .map_err(|e| KimiError::Agent(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(command)
                .build()
                .map_err(|e| KimiError::Agent(e.to_string()))?
                .into(),
        ];

        loop {
            debug!("Model turn with {} messages", messages.len());

            let model = &self.model;
            let catalog = &self.catalog;
            let conversation = &messages;
            let calls = &mut trace.model_calls;
            let reply = retry_with_backoff(&self.backoff, self.sleeper.as_ref(), move || {
                *calls += 1;
                model.complete(conversation, catalog)
            })
            .await?;

            let tool_calls = match reply {
                ModelReply::Answer(text) => return Ok(text),
                ModelReply::ToolCalls(calls) => calls,
            };

            messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .tool_calls(tool_calls.clone())
                    .build()
                    .map_err(|e| KimiError::Agent(e.to_string()))?
                    .into(),
            );

            // Every call id gets exactly one tool message, in request order.
            for tool_call in &tool_calls {
                let output = self.dispatch(tool_call).await;

                messages.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(&tool_call.id)
                        .content(output.to_json())
                        .build()
                        .map_err(|e| KimiError::Agent(e.to_string()))?
                        .into(),
                );

                trace.tool_calls.push(ToolCallRecord {
                    name: tool_call.function.name.clone(),
                    arguments: tool_call.function.arguments.clone(),
                    success: output.is_success(),
                });
            }
        }
    }

    /// Parse and run one tool call.
    async fn dispatch(&mut self, tool_call: &ChatCompletionMessageToolCall) -> ToolOutput {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Model calling tool: {} with args: {}", name, arguments);

        let tool = match parse_tool_call(name, arguments) {
            Ok(tool) => tool,
            Err(e) => {
                warn!("Rejected tool call {}: {}", name, e);
                return ToolOutput::failed(e.to_string());
            }
        };

        match tool {
            ToolCall::SearchDocuments {
                collection_name,
                query,
                limit,
            } => self.search(&collection_name, &query, limit).await,
            other => self.tools.execute(&other).await,
        }
    }

    /// Search with connection, name resolution and the empty-result fallback.
    async fn search(&mut self, collection_name: &str, query: &str, limit: usize) -> ToolOutput {
        let knowledge = &mut self.tools.knowledge;

        let connected = knowledge.connect();
        if !connected.success {
            return ToolOutput::failed(format!(
                "Cannot connect to database: {}",
                connected.message
            ));
        }

        let listed = knowledge.list_all_collections().await;
        let existing = match listed.data {
            Some(names) if listed.success => names.collections,
            _ => {
                return ToolOutput::failed(format!(
                    "Cannot list collections: {}",
                    listed.message
                ))
            }
        };
        debug!("Available collections: {:?}", existing);

        let resolved = resolve_collection(collection_name, &existing, knowledge.prefix());
        if resolved != collection_name {
            info!("Using collection {} for {}", resolved, collection_name);
        }

        // A listed name is already the stored name and must not be prefixed again.
        let stored = existing.contains(&resolved);
        let mut outcome = if stored {
            knowledge
                .search_stored_collection(&resolved, query, limit)
                .await
        } else {
            knowledge.search_documents(&resolved, query, limit).await
        };
        if is_empty_hit(&outcome) {
            info!(
                "Vector search found nothing, reading collection {} directly",
                resolved
            );
            let content = if stored {
                knowledge.stored_collection_content(&resolved).await
            } else {
                knowledge.get_collection_content(&resolved).await
            };
            if let (true, Some(found)) = (content.success, content.data) {
                if found.count > 0 {
                    if let Some(hits) = outcome.data.as_mut() {
                        hits.collection_content = Some(found.documents);
                    }
                    outcome.message = EMPTY_SEARCH_MESSAGE.to_string();
                }
            }
        }

        ToolOutput::Search(outcome)
    }
}

fn is_empty_hit(outcome: &Outcome<SearchHits>) -> bool {
    outcome.success && outcome.data.as_ref().is_some_and(|hits| hits.results.is_empty())
}

/// What happened while answering one command.
#[derive(Debug, Clone, Default)]
pub struct CommandTrace {
    /// Final answer, or the `"Execution error: ..."` text.
    pub answer: String,
    /// Model requests made, retries included.
    pub model_calls: usize,
    /// Tool calls dispatched, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Whether the command ended in an error.
    pub failed: bool,
}

/// Record of a tool call made by the assistant.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Whether the tool reported success.
    pub success: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::resolve::SAMPLE_DATA_COLLECTION;
    use crate::agent::retry::tests::RecordingSleeper;
    use crate::embedding::Embedder;
    use crate::knowledge::tests::{memory_kb, LetterEmbedder};
    use crate::knowledge::StoreBackend;
    use crate::vector_store::{MemoryVectorStore, Record, ScoredText, VectorStore};
    use async_openai::types::{
        ChatCompletionRequestToolMessageContent, ChatCompletionToolType, FunctionCall,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays canned replies and records every conversation it is sent.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<ModelReply>>>,
        seen: Mutex<Vec<Vec<ChatCompletionRequestMessage>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<ModelReply>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Vec<ChatCompletionRequestMessage>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(
            &self,
            messages: &[ChatCompletionRequestMessage],
            _tools: &[ChatCompletionTool],
        ) -> Result<ModelReply> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ModelReply::Answer("script exhausted".to_string())))
        }
    }

    /// Delegates to a memory store but never finds anything by vector.
    struct BlindStore(MemoryVectorStore);

    #[async_trait]
    impl VectorStore for BlindStore {
        async fn create_collection(
            &self,
            name: &str,
            description: &str,
            dimension: usize,
        ) -> Result<bool> {
            self.0.create_collection(name, description, dimension).await
        }

        async fn has_collection(&self, name: &str) -> Result<bool> {
            self.0.has_collection(name).await
        }

        async fn list_collections(&self) -> Result<Vec<String>> {
            self.0.list_collections().await
        }

        async fn insert(&self, collection: &str, records: &[Record]) -> Result<usize> {
            self.0.insert(collection, records).await
        }

        async fn search(
            &self,
            collection: &str,
            _embedding: &[f32],
            _limit: usize,
        ) -> Result<Vec<ScoredText>> {
            self.0.row_count(collection).await?;
            Ok(Vec::new())
        }

        async fn fetch_texts(&self, collection: &str, limit: usize) -> Result<Vec<String>> {
            self.0.fetch_texts(collection, limit).await
        }

        async fn row_count(&self, collection: &str) -> Result<usize> {
            self.0.row_count(collection).await
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ChatCompletionMessageToolCall {
        ChatCompletionMessageToolCall {
            id: id.to_string(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    fn web(dir: &std::path::Path) -> WebDownloader {
        WebDownloader::new(
            dir.to_path_buf(),
            "kimi-agent-test",
            Duration::from_secs(2),
            Duration::ZERO,
            100,
        )
        .unwrap()
    }

    fn assistant(
        model: Arc<ScriptedModel>,
        knowledge: KnowledgeBase,
        dir: &std::path::Path,
    ) -> (Assistant, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let assistant = Assistant::new(model, ToolContext::new(knowledge, web(dir)))
            .with_sleeper(sleeper.clone());
        (assistant, sleeper)
    }

    fn rate_limited() -> Result<ModelReply> {
        Err(KimiError::RateLimited("429 Too Many Requests".to_string()))
    }

    /// Tool message contents keyed by call id.
    fn tool_results(messages: &[ChatCompletionRequestMessage]) -> Vec<(String, Value)> {
        messages
            .iter()
            .filter_map(|m| match m {
                ChatCompletionRequestMessage::Tool(tool) => {
                    let text = match &tool.content {
                        ChatCompletionRequestToolMessageContent::Text(text) => text.clone(),
                        other => panic!("unexpected tool content {:?}", other),
                    };
                    Some((tool.tool_call_id.clone(), serde_json::from_str(&text).unwrap()))
                }
                _ => None,
            })
            .collect()
    }

    /// Every requested call id is answered by a tool message, in order.
    fn assert_no_orphans(messages: &[ChatCompletionRequestMessage]) {
        let mut answered = HashSet::new();
        for (i, message) in messages.iter().enumerate() {
            if let ChatCompletionRequestMessage::Assistant(reply) = message {
                let Some(calls) = &reply.tool_calls else { continue };
                for (offset, call) in calls.iter().enumerate() {
                    match &messages[i + 1 + offset] {
                        ChatCompletionRequestMessage::Tool(tool) => {
                            assert_eq!(tool.tool_call_id, call.id);
                            answered.insert(call.id.clone());
                        }
                        other => panic!("call {} not answered, found {:?}", call.id, other),
                    }
                }
            }
        }
        assert!(!answered.is_empty());
    }

    #[tokio::test]
    async fn test_direct_answer_sends_two_messages() {
        let dir = tempfile::tempdir().unwrap();
        let model = ScriptedModel::new(vec![Ok(ModelReply::Answer("Paris".to_string()))]);
        let (kb, _) = memory_kb();
        let (mut assistant, _) = assistant(model.clone(), kb, dir.path());

        let trace = assistant
            .execute_command_traced("What is the capital of France?")
            .await;

        assert_eq!(trace.answer, "Paris");
        assert_eq!(trace.model_calls, 1);
        assert!(trace.tool_calls.is_empty());
        assert!(!trace.failed);

        let seen = model.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 2);
        assert!(matches!(seen[0][0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(seen[0][1], ChatCompletionRequestMessage::User(_)));
    }

    #[tokio::test]
    async fn test_every_tool_call_gets_a_result() {
        let dir = tempfile::tempdir().unwrap();
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::ToolCalls(vec![
                call("c1", "connect_database", "{}"),
                call("c2", "list_all_collections", ""),
            ])),
            Ok(ModelReply::ToolCalls(vec![
                call("c3", "drop_everything", "{}"),
                call("c4", "add_documents", "{broken"),
            ])),
            Ok(ModelReply::Answer("done".to_string())),
        ]);
        let (kb, _) = memory_kb();
        let (mut assistant, _) = assistant(model.clone(), kb, dir.path());

        let trace = assistant.execute_command_traced("set things up").await;
        assert_eq!(trace.answer, "done");
        assert_eq!(trace.model_calls, 3);

        let names: Vec<&str> = trace.tool_calls.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["connect_database", "list_all_collections", "drop_everything", "add_documents"]
        );
        assert_eq!(
            trace.tool_calls.iter().map(|t| t.success).collect::<Vec<_>>(),
            vec![true, true, false, false]
        );

        let last = model.seen().pop().unwrap();
        assert_no_orphans(&last);

        let results = tool_results(&last);
        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);
        assert!(results[2].1["message"]
            .as_str()
            .unwrap()
            .contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_search_resolves_prefixed_collection() {
        let dir = tempfile::tempdir().unwrap();
        let (mut kb, _) = memory_kb();
        kb.connect();
        kb.create_collection("notes", "").await;
        kb.add_documents("notes", &["banana bread".to_string(), "oolong tea".to_string()])
            .await;
        kb.disconnect();

        let model = ScriptedModel::new(vec![
            Ok(ModelReply::ToolCalls(vec![call(
                "s1",
                "search_documents",
                r#"{"collection_name": "notes", "query": "aaaa", "limit": 1}"#,
            )])),
            Ok(ModelReply::Answer("found it".to_string())),
        ]);
        let (mut assistant, _) = assistant(model.clone(), kb, dir.path());

        assert_eq!(assistant.execute_command("search my notes").await, "found it");

        let results = tool_results(&model.seen()[1]);
        let value = &results[0].1;
        assert_eq!(value["success"], true);
        assert_eq!(value["results"][0]["text"], "banana bread");
        assert!(value.get("collection_content").is_none());
        assert!(assistant.tools().knowledge.is_connected());
    }

    #[tokio::test]
    async fn test_search_uses_listed_unprefixed_collection_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let (kb, store) = memory_kb();
        store.create_collection("notes", "", 3).await.unwrap();
        let embedding = LetterEmbedder.embed("aaaa").await.unwrap();
        store
            .insert("notes", &[Record::new("apple jam".to_string(), embedding)])
            .await
            .unwrap();

        let model = ScriptedModel::new(vec![
            Ok(ModelReply::ToolCalls(vec![call(
                "s1",
                "search_documents",
                r#"{"collection_name": "notes", "query": "aaaa"}"#,
            )])),
            Ok(ModelReply::Answer("ok".to_string())),
        ]);
        let (mut assistant, _) = assistant(model.clone(), kb, dir.path());
        let trace = assistant.execute_command_traced("search notes").await;
        assert!(trace.tool_calls[0].success);

        let results = tool_results(&model.seen()[1]);
        assert_eq!(results[0].1["success"], true);
        assert_eq!(results[0].1["results"][0]["text"], "apple jam");
        assert!(!store.has_collection("kimi_agent_notes").await.unwrap());
    }

    #[tokio::test]
    async fn test_sample_data_falls_back_regardless_of_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(BlindStore(MemoryVectorStore::new()));
        store
            .create_collection(SAMPLE_DATA_COLLECTION, "demo", 3)
            .await
            .unwrap();
        let embedding = LetterEmbedder.embed("x").await.unwrap();
        store
            .insert(
                SAMPLE_DATA_COLLECTION,
                &[Record::new("sample text".to_string(), embedding)],
            )
            .await
            .unwrap();
        let kb = KnowledgeBase::new(
            StoreBackend::Shared(store),
            Arc::new(LetterEmbedder),
            "demo_",
        );

        let model = ScriptedModel::new(vec![
            Ok(ModelReply::ToolCalls(vec![call(
                "s1",
                "search_documents",
                r#"{"collection_name": "sample_data", "query": "anything"}"#,
            )])),
            Ok(ModelReply::Answer("ok".to_string())),
        ]);
        let (mut assistant, _) = assistant(model.clone(), kb, dir.path());
        assistant.execute_command("what is in sample_data?").await;

        let results = tool_results(&model.seen()[1]);
        let value = &results[0].1;
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], EMPTY_SEARCH_MESSAGE);
        assert_eq!(
            value["collection_content"],
            serde_json::json!(["sample text"])
        );
    }

    #[tokio::test]
    async fn test_empty_search_falls_back_to_collection_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(BlindStore(MemoryVectorStore::new()));
        let mut kb = KnowledgeBase::new(
            StoreBackend::Shared(store),
            Arc::new(LetterEmbedder),
            "kimi_agent_",
        );
        kb.connect();
        kb.create_collection("sample_data", "demo").await;
        kb.add_documents(
            "sample_data",
            &["first".to_string(), "second".to_string(), "third".to_string()],
        )
        .await;

        let model = ScriptedModel::new(vec![
            Ok(ModelReply::ToolCalls(vec![call(
                "s1",
                "search_documents",
                r#"{"collection_name": "sample_data", "query": "anything"}"#,
            )])),
            Ok(ModelReply::Answer("ok".to_string())),
        ]);
        let (mut assistant, _) = assistant(model.clone(), kb, dir.path());
        assistant.execute_command("what is in sample_data?").await;

        let results = tool_results(&model.seen()[1]);
        let value = &results[0].1;
        assert_eq!(value["success"], true);
        assert_eq!(value["count"], 0);
        assert_eq!(value["message"], EMPTY_SEARCH_MESSAGE);
        assert_eq!(
            value["collection_content"],
            serde_json::json!(["first", "second", "third"])
        );
    }

    #[tokio::test]
    async fn test_search_missing_collection_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let model = ScriptedModel::new(vec![
            Ok(ModelReply::ToolCalls(vec![call(
                "s1",
                "search_documents",
                r#"{"collection_name": "recipes", "query": "soup"}"#,
            )])),
            Ok(ModelReply::Answer("no such collection".to_string())),
        ]);
        let (kb, _) = memory_kb();
        let (mut assistant, _) = assistant(model.clone(), kb, dir.path());

        let trace = assistant.execute_command_traced("find soup").await;
        assert!(!trace.failed);
        assert!(!trace.tool_calls[0].success);

        let results = tool_results(&model.seen()[1]);
        assert_eq!(results[0].1["success"], false);
        assert!(results[0].1["message"]
            .as_str()
            .unwrap()
            .contains("does not exist"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_with_backoff() {
        let dir = tempfile::tempdir().unwrap();
        let model = ScriptedModel::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            Ok(ModelReply::Answer("finally".to_string())),
        ]);
        let (kb, _) = memory_kb();
        let (mut assistant, sleeper) = assistant(model.clone(), kb, dir.path());

        let trace = assistant.execute_command_traced("hello").await;
        assert_eq!(trace.answer, "finally");
        assert_eq!(trace.model_calls, 5);

        let delays: Vec<f64> = sleeper
            .delays
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.as_secs_f64())
            .collect();
        assert_eq!(delays, vec![20.0, 30.0, 45.0, 67.5]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_become_error_text() {
        let dir = tempfile::tempdir().unwrap();
        let model = ScriptedModel::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            Ok(ModelReply::Answer("too late".to_string())),
        ]);
        let (kb, _) = memory_kb();
        let (mut assistant, sleeper) = assistant(model.clone(), kb, dir.path());

        let trace = assistant.execute_command_traced("hello").await;
        assert!(trace.failed);
        assert!(trace.answer.starts_with("Execution error: "));
        assert!(trace.answer.contains("maximum retries"));
        assert_eq!(model.seen().len(), 5);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_model_error_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let model = ScriptedModel::new(vec![Err(KimiError::Llm("invalid api key".to_string()))]);
        let (kb, _) = memory_kb();
        let (mut assistant, sleeper) = assistant(model.clone(), kb, dir.path());

        let answer = assistant.execute_command("hello").await;
        assert_eq!(answer, "Execution error: LLM API error: invalid api key");
        assert_eq!(model.seen().len(), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let model = ScriptedModel::new(vec![]);
        let (kb, _) = memory_kb();
        let (mut assistant, _) = assistant(model.clone(), kb, dir.path());

        let answer = assistant.execute_command("   ").await;
        assert!(answer.starts_with("Execution error: "));
        assert!(model.seen().is_empty());
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "search_documents".to_string(),
            arguments: r#"{"query": "test"}"#.to_string(),
            success: true,
        };
        assert_eq!(format!("{}", record), r#"search_documents({"query": "test"})"#);
    }
}
