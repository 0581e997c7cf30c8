//! LLM-backed structured extraction over page text.
//!
//! The strategy splits page text into word windows, asks the model for JSON
//! blocks per window, and flattens the replies into one array per page.
//! Token usage for every call is kept so a run can report it at the end.

use crate::provider::ProviderId;
use crate::traits::LlmClient;
use crate::usage::{UsageSummary, UsageTracker};
use futures::future::join_all;
use gleaner_common::{GleanerError, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

/// Average words per token used to size chunks.
pub const WORD_TOKEN_RATE: f32 = 0.75;
pub const DEFAULT_CHUNK_TOKEN_THRESHOLD: usize = 1000;
const MAX_OVERLAP_RATE: f32 = 0.9;

const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You extract structured data from web page content.
Reply with JSON only: an array of objects wrapped in <blocks></blocks> tags.
Never invent values that are not present in the content; use null instead.
"#;

/// How the model should shape each extracted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionType {
    /// Objects conforming to a caller-provided JSON Schema.
    Schema,
    /// Free-form semantic blocks (`index`, `tags`, `content`).
    Block,
}

/// Sampling arguments forwarded to every LLM call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtraArgs {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Everything the strategy needs besides the client itself.
#[derive(Clone)]
pub struct StrategyConfig {
    pub provider: ProviderId,
    pub api_token: String,
    pub instruction: String,
    pub extraction_type: ExtractionType,
    pub schema: Option<Value>,
    pub chunk_token_threshold: usize,
    pub overlap_rate: f32,
    pub apply_chunking: bool,
    pub extra_args: ExtraArgs,
}

impl fmt::Debug for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyConfig")
            .field("provider", &self.provider)
            .field("api_token", &"<redacted>")
            .field("instruction", &self.instruction)
            .field("extraction_type", &self.extraction_type)
            .field("schema", &self.schema)
            .field("chunk_token_threshold", &self.chunk_token_threshold)
            .field("overlap_rate", &self.overlap_rate)
            .field("apply_chunking", &self.apply_chunking)
            .field("extra_args", &self.extra_args)
            .finish()
    }
}

pub struct LlmExtractionStrategy {
    config: StrategyConfig,
    client: Arc<dyn LlmClient + Send + Sync>,
    usage: Mutex<UsageTracker>,
}

impl fmt::Debug for LlmExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmExtractionStrategy")
            .field("provider", &self.config.provider.to_string())
            .field("extraction_type", &self.config.extraction_type)
            .field("chunk_token_threshold", &self.config.chunk_token_threshold)
            .field("overlap_rate", &self.config.overlap_rate)
            .field("apply_chunking", &self.config.apply_chunking)
            .field("extra_args", &self.config.extra_args)
            .finish_non_exhaustive()
    }
}

impl LlmExtractionStrategy {
    /// Wrap `client` with the given settings. Values are stored as provided.
    pub fn new(config: StrategyConfig, client: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self {
            config,
            client,
            usage: Mutex::new(UsageTracker::default()),
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Run extraction over `content` fetched from `url`.
    ///
    /// Returns a JSON array of every block the model produced. A chunk whose
    /// call or reply fails is logged and skipped; the page fails only when no
    /// chunk succeeded.
    pub async fn extract(&self, url: &str, content: &str) -> Result<Value> {
        let chunks = self.chunk(content);
        if chunks.is_empty() {
            tracing::debug!(target: "llm.strategy", %url, "no text to extract from");
            return Ok(Value::Array(Vec::new()));
        }

        tracing::debug!(
            target: "llm.strategy",
            %url,
            chunks = chunks.len(),
            model = %self.model_name(),
            "running extraction"
        );

        let calls = chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| self.extract_chunk(url, idx, chunk));
        let outcomes = join_all(calls).await;

        let mut blocks = Vec::new();
        let mut succeeded = 0usize;
        let mut last_err = None;
        for (idx, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(mut chunk_blocks) => {
                    succeeded += 1;
                    blocks.append(&mut chunk_blocks);
                }
                Err(e) => {
                    tracing::warn!(
                        target: "llm.strategy",
                        %url,
                        chunk = idx,
                        error = %e,
                        "chunk extraction failed"
                    );
                    last_err = Some(e);
                }
            }
        }

        match (succeeded, last_err) {
            (0, Some(e)) => Err(e),
            _ => Ok(Value::Array(blocks)),
        }
    }

    /// Log and return the token usage accumulated so far.
    pub fn show_usage(&self) -> UsageSummary {
        let summary = self
            .usage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .summary();

        tracing::info!(
            target: "llm.usage",
            model = %self.model_name(),
            requests = summary.requests,
            prompt_tokens = summary.total.prompt_tokens,
            completion_tokens = summary.total.completion_tokens,
            total_tokens = summary.total.total_tokens,
            "token usage"
        );
        for entry in &summary.history {
            tracing::debug!(
                target: "llm.usage",
                url = %entry.url,
                chunk = entry.chunk,
                prompt_tokens = entry.usage.prompt_tokens,
                completion_tokens = entry.usage.completion_tokens,
                "request usage"
            );
        }
        summary
    }

    fn chunk(&self, content: &str) -> Vec<String> {
        if self.config.apply_chunking {
            chunk_words(
                content,
                self.config.chunk_token_threshold,
                self.config.overlap_rate,
            )
        } else if content.trim().is_empty() {
            Vec::new()
        } else {
            vec![content.to_string()]
        }
    }

    async fn extract_chunk(&self, url: &str, idx: usize, chunk: &str) -> Result<Vec<Value>> {
        let prompt = self.build_prompt(url, chunk)?;
        let response = self
            .client
            .generate(
                &prompt,
                Some(EXTRACTION_SYSTEM_PROMPT),
                Some(self.config.extra_args.max_tokens),
                Some(self.config.extra_args.temperature),
            )
            .await?;

        self.usage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(url, idx, response.usage.unwrap_or_default());

        parse_blocks(&response.text)
    }

    fn build_prompt(&self, url: &str, chunk: &str) -> Result<String> {
        let mut prompt = format!(
            "Here is the content from the URL:\n<url>{url}</url>\n\n<url_content>\n{chunk}\n</url_content>\n\n"
        );

        match (self.config.extraction_type, &self.config.schema) {
            (ExtractionType::Schema, Some(schema)) => {
                let schema = serde_json::to_string_pretty(schema)?;
                prompt.push_str(&format!(
                    "Instruction: {}\n\nEvery extracted object must conform to this JSON Schema:\n<schema_block>\n{schema}\n</schema_block>\n\n",
                    self.config.instruction
                ));
            }
            (ExtractionType::Schema, None) => {
                return Err(GleanerError::Config(
                    "schema extraction requires a schema".to_string(),
                ))
            }
            (ExtractionType::Block, _) => {
                prompt.push_str(&format!(
                    "Instruction: {}\n\nSplit the relevant content into semantic blocks. Each block is an object with `index` (number), `tags` (array of strings) and `content` (array of strings).\n\n",
                    self.config.instruction
                ));
            }
        }

        prompt.push_str(
            "Return the extracted objects as a JSON array wrapped in <blocks>...</blocks>.",
        );
        Ok(prompt)
    }
}

/// Split `text` into whitespace word windows sized for `chunk_token_threshold`
/// tokens, with consecutive windows sharing `overlap_rate` of their words.
pub fn chunk_words(text: &str, chunk_token_threshold: usize, overlap_rate: f32) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let window = ((chunk_token_threshold as f32 * WORD_TOKEN_RATE) as usize).max(1);
    let overlap = ((window as f32 * overlap_rate.clamp(0.0, MAX_OVERLAP_RATE)) as usize)
        .min(window - 1);
    let step = window - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Pull the JSON payload out of a model reply and flatten it into blocks.
///
/// Accepts `<blocks>` tags, ```json fences, or bare JSON, in that order of
/// preference. Each candidate is tried until one decodes, so a fence nested
/// inside `<blocks>` still parses.
pub fn parse_blocks(text: &str) -> Result<Vec<Value>> {
    let mut last_err = None;
    for payload in json_candidates(text) {
        match serde_json::from_str::<Value>(&payload) {
            Ok(value) => {
                return Ok(match value {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => vec![other],
                });
            }
            Err(e) => last_err = Some(e),
        }
    }
    let detail = last_err.map_or_else(|| "empty reply".to_string(), |e| e.to_string());
    Err(GleanerError::Extraction(format!(
        "model reply is not JSON: {detail}"
    )))
}

fn json_candidates(text: &str) -> Vec<String> {
    static BLOCKS: OnceLock<Option<Regex>> = OnceLock::new();
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    static BARE: OnceLock<Option<Regex>> = OnceLock::new();

    let patterns = [
        BLOCKS.get_or_init(|| Regex::new(r"(?s)<blocks>\s*(.*?)\s*</blocks>").ok()),
        FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").ok()),
        BARE.get_or_init(|| Regex::new(r"(?s)([\[{].*[\]}])").ok()),
    ];

    let mut candidates: Vec<String> = patterns
        .into_iter()
        .flatten()
        .filter_map(|re| re.captures(text).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().to_string())
        .collect();
    candidates.push(text.trim().to_string());
    candidates.dedup();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LlmResponse;
    use crate::usage::TokenUsage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedClient {
        replies: Vec<String>,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, Option<u32>, Option<f32>)>>,
    }

    impl ScriptedClient {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: replies.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn generate(
            &self,
            prompt: &str,
            _system_prompt: Option<&str>,
            max_tokens: Option<u32>,
            temperature: Option<f32>,
        ) -> Result<LlmResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_tokens, temperature));
            let text = self.replies[n % self.replies.len()].clone();
            if text == "!fail" {
                return Err(GleanerError::Llm("provider unavailable".into()));
            }
            Ok(LlmResponse {
                text,
                model: Some("scripted".into()),
                usage: Some(TokenUsage::new(10, 2)),
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn config(threshold: usize, apply_chunking: bool) -> StrategyConfig {
        StrategyConfig {
            provider: "openai/gpt-4o-mini".parse().unwrap(),
            api_token: "sk-test".into(),
            instruction: "List every service with its price.".into(),
            extraction_type: ExtractionType::Schema,
            schema: Some(crate::schema::Product::json_schema()),
            chunk_token_threshold: threshold,
            overlap_rate: 0.0,
            apply_chunking,
            extra_args: ExtraArgs {
                temperature: 0.0,
                max_tokens: 3000,
            },
        }
    }

    #[test]
    fn chunks_respect_word_window() {
        let text = (0..10).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        // threshold 4 tokens -> 3 words per window
        let chunks = chunk_words(&text, 4, 0.0);
        assert_eq!(chunks, ["w0 w1 w2", "w3 w4 w5", "w6 w7 w8", "w9"]);
    }

    #[test]
    fn chunks_overlap_when_requested() {
        let text = "a b c d e f";
        // window 3, overlap 1 -> step 2
        let chunks = chunk_words(text, 4, 0.34);
        assert_eq!(chunks, ["a b c", "c d e", "e f"]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(chunk_words("   \n\t ", 1000, 0.0).is_empty());
    }

    #[test]
    fn parses_tagged_fenced_and_bare_replies() {
        let tagged = "Sure!\n<blocks>[{\"name\":\"Facial\"}]</blocks>";
        assert_eq!(parse_blocks(tagged).unwrap(), vec![json!({"name": "Facial"})]);

        let fenced = "```json\n{\"name\": \"Botox\", \"price\": 12}\n```";
        assert_eq!(
            parse_blocks(fenced).unwrap(),
            vec![json!({"name": "Botox", "price": 12})]
        );

        let bare = "[{\"a\":1},{\"a\":2}]";
        assert_eq!(parse_blocks(bare).unwrap().len(), 2);

        assert!(matches!(
            parse_blocks("no json here"),
            Err(GleanerError::Extraction(_))
        ));
    }

    #[test]
    fn fence_inside_blocks_still_parses() {
        let reply = "<blocks>\n```json\n[{\"name\":\"Facial\",\"price\":100}]\n```\n</blocks>";
        assert_eq!(
            parse_blocks(reply).unwrap(),
            vec![json!({"name": "Facial", "price": 100})]
        );
    }

    #[test]
    fn falls_through_to_bare_json_when_tags_hold_prose() {
        let reply = "<blocks>none found</blocks> but here: {\"name\":\"Peel\"}";
        assert_eq!(parse_blocks(reply).unwrap(), vec![json!({"name": "Peel"})]);
    }

    #[test]
    fn debug_output_hides_api_token() {
        let cfg = config(1000, true);
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains(&cfg.api_token));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn constructor_passes_values_through() {
        let cfg = config(1000, true);
        let strategy = LlmExtractionStrategy::new(cfg.clone(), Arc::new(ScriptedClient::new(&["[]"])));
        let stored = strategy.config();
        assert_eq!(stored.provider, cfg.provider);
        assert_eq!(stored.api_token, "sk-test");
        assert_eq!(stored.instruction, cfg.instruction);
        assert_eq!(stored.schema, cfg.schema);
        assert_eq!(stored.chunk_token_threshold, 1000);
        assert_eq!(stored.overlap_rate, 0.0);
        assert!(stored.apply_chunking);
        assert_eq!(stored.extra_args, cfg.extra_args);
    }

    #[tokio::test]
    async fn flattens_blocks_across_chunks_and_tracks_usage() {
        let client = Arc::new(ScriptedClient::new(&[
            "<blocks>[{\"name\":\"Facial\",\"price\":100}]</blocks>",
        ]));
        let strategy = LlmExtractionStrategy::new(config(4, true), client.clone());

        let out = strategy
            .extract("https://x/1", "one two three four five six")
            .await
            .unwrap();

        assert_eq!(out.as_array().unwrap().len(), 2);
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].0.contains("<url>https://x/1</url>"));
        assert!(seen[0].0.contains("\"price\""));
        assert_eq!(seen[0].1, Some(3000));
        assert_eq!(seen[0].2, Some(0.0));
        drop(seen);

        let usage = strategy.show_usage();
        assert_eq!(usage.requests, 2);
        assert_eq!(usage.total.total_tokens, 24);
    }

    #[tokio::test]
    async fn fails_only_when_every_chunk_fails() {
        let failing = LlmExtractionStrategy::new(
            config(1000, true),
            Arc::new(ScriptedClient::new(&["!fail"])),
        );
        assert!(failing.extract("https://x/2", "some page").await.is_err());

        let partial = LlmExtractionStrategy::new(
            config(4, true),
            Arc::new(ScriptedClient::new(&["!fail", "[{\"name\":\"Peel\"}]"])),
        );
        let out = partial
            .extract("https://x/3", "a b c d e f")
            .await
            .unwrap();
        assert_eq!(out, json!([{"name": "Peel"}]));
    }

    #[tokio::test]
    async fn empty_page_skips_the_model() {
        let client = Arc::new(ScriptedClient::new(&["[]"]));
        let strategy = LlmExtractionStrategy::new(config(1000, false), client.clone());
        let out = strategy.extract("https://x/4", "  ").await.unwrap();
        assert_eq!(out, json!([]));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }
}
