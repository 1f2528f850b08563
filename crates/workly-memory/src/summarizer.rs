// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation summarization backed by an injected text generator.
//!
//! Without a generator, or when generation fails or times out, the
//! summarizer falls back to a deterministic count-and-preview summary and
//! keyword-flagged key points, so a valid batch always gets a non-empty
//! summary.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};
use workly_config::model::SummarizerConfig;
use workly_core::types::now_timestamp;
use workly_core::{Role, TextGenerator, WorklyError};

use crate::extractor::{contains_keyword, tokenize};
use crate::types::{ChatMessage, SummaryResult};

const SUMMARY_PROMPT: &str = "<|system|>
Tu es un assistant qui génère des résumés concis de conversations.
Ton résumé doit capturer l'essentiel en 3-5 phrases maximum.
Mentionne les sujets principaux, décisions prises, et questions importantes.</|system|>
<|user|>
Voici une conversation à résumer :

{conversation}

Génère un résumé concis (3-5 phrases) de cette conversation.</|user|>
<|assistant|>
";

const KEYPOINTS_PROMPT: &str = "<|system|>
Tu es un assistant qui identifie les points clés d'une conversation.
Liste uniquement les éléments importants : décisions, questions, actions, faits.</|system|>
<|user|>
Conversation :

{conversation}

Liste les points clés sous forme de puces (maximum 5 points).</|user|>
<|assistant|>
";

/// Error marker for batches below the minimum size.
pub const NOT_ENOUGH_MESSAGES: &str = "Pas assez de messages pour générer un résumé";

/// Reason recorded for conversations skipped by [`ConversationSummarizer::summarize_batch`].
pub const TOO_FEW_MESSAGES: &str = "Trop peu de messages";

const DEFAULT_AUTO_THRESHOLD: usize = 20;
const FIRST_MESSAGE_PREVIEW_CHARS: usize = 50;
const KEYPOINT_SNIPPET_CHARS: usize = 80;

const IMPORTANT_KEYWORDS: &[&str] = &[
    "important", "décision", "problème", "question", "objectif", "projet", "urgent", "attention",
];

const KEY_POINT_INDICATORS: &[(KeyPoint, &[&str])] = &[
    (KeyPoint::Decision, &["décidé", "choisi", "opté pour", "conclusion"]),
    (KeyPoint::Question, &["comment", "pourquoi", "est-ce que"]),
    (KeyPoint::Action, &["vais faire", "dois", "faut", "besoin de"]),
    (KeyPoint::Problem, &["problème", "bug", "erreur", "souci", "difficulté"]),
    (KeyPoint::Goal, &["objectif", "but", "veux", "souhaite", "projet"]),
];

static PROMPT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|.*?\|>").expect("marker pattern is valid"));

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•]|\d+\.)\s+").expect("bullet pattern is valid"));

/// Kind of notable content detected in a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPoint {
    Decision,
    Question,
    Action,
    Problem,
    Goal,
}

impl KeyPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyPoint::Decision => "decision",
            KeyPoint::Question => "question",
            KeyPoint::Action => "action",
            KeyPoint::Problem => "problem",
            KeyPoint::Goal => "goal",
        }
    }
}

/// Summarizes closed batches of conversation turns.
pub struct ConversationSummarizer {
    config: SummarizerConfig,
    auto_threshold: usize,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl ConversationSummarizer {
    pub fn new(config: SummarizerConfig, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            config,
            auto_threshold: DEFAULT_AUTO_THRESHOLD,
            generator,
        }
    }

    /// Override the buffer size at which [`should_summarize`](Self::should_summarize) fires.
    pub fn with_auto_threshold(mut self, threshold: usize) -> Self {
        self.auto_threshold = threshold;
        self
    }

    pub fn min_messages(&self) -> usize {
        self.config.min_messages
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// True once the open buffer has reached the auto-summarize threshold.
    pub fn should_summarize(&self, message_count: usize) -> bool {
        message_count >= self.auto_threshold
    }

    /// Summarize a batch of messages.
    ///
    /// Batches shorter than `min_messages` return a result with an error
    /// marker and an empty summary.
    pub async fn summarize(&self, messages: &[ChatMessage], include_keypoints: bool) -> SummaryResult {
        let timestamp = now_timestamp();
        if messages.is_empty() || messages.len() < self.config.min_messages {
            return SummaryResult::failed(messages.len(), timestamp, NOT_ENOUGH_MESSAGES);
        }

        let conversation = format_conversation(messages);
        let generated = self
            .generate(&SUMMARY_PROMPT.replace("{conversation}", &conversation))
            .await
            .map(|raw| clean_summary(&raw, self.config.max_summary_chars))
            .filter(|summary| !summary.is_empty());
        let summary = generated.unwrap_or_else(|| basic_summary(messages));

        let keypoints = if include_keypoints {
            Some(self.keypoints(messages, &conversation).await)
        } else {
            None
        };

        debug!(
            message_count = messages.len(),
            summary_chars = summary.chars().count(),
            "conversation summarized"
        );

        SummaryResult {
            summary,
            message_count: messages.len(),
            timestamp,
            start_timestamp: messages.first().and_then(|m| m.timestamp.clone()),
            end_timestamp: messages.last().and_then(|m| m.timestamp.clone()),
            keypoints,
            error: None,
            skipped: false,
        }
    }

    /// Summarize several conversations, marking short ones as skipped.
    pub async fn summarize_batch(&self, conversations: &[Vec<ChatMessage>]) -> Vec<SummaryResult> {
        let mut results = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            if conversation.len() >= self.config.min_messages {
                results.push(self.summarize(conversation, true).await);
            } else {
                let mut skipped =
                    SummaryResult::failed(conversation.len(), now_timestamp(), TOO_FEW_MESSAGES);
                skipped.skipped = true;
                results.push(skipped);
            }
        }
        results
    }

    /// Tags for the notable content of a single message.
    pub fn detect_key_points(&self, message: &str) -> Vec<KeyPoint> {
        let tokens = tokenize(message);
        KEY_POINT_INDICATORS
            .iter()
            .filter(|(kind, indicators)| {
                (*kind == KeyPoint::Question && message.contains('?'))
                    || indicators.iter().any(|i| contains_keyword(&tokens, i))
            })
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Run the generator under the configured timeout.
    ///
    /// Returns `None` when there is no generator or it failed.
    async fn generate(&self, prompt: &str) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let limit = Duration::from_secs(self.config.generation_timeout_secs);
        match tokio::time::timeout(limit, generator.generate(prompt)).await {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                warn!(error = %e, generator = generator.name(), "text generation failed, using fallback");
                None
            }
            Err(_) => {
                let e = WorklyError::Timeout { duration: limit };
                warn!(error = %e, generator = generator.name(), "text generation timed out, using fallback");
                None
            }
        }
    }

    async fn keypoints(&self, messages: &[ChatMessage], conversation: &str) -> Vec<String> {
        let parsed = self
            .generate(&KEYPOINTS_PROMPT.replace("{conversation}", conversation))
            .await
            .map(|text| parse_bullets(&text))
            .filter(|points| !points.is_empty());
        let mut points = parsed.unwrap_or_else(|| heuristic_keypoints(messages));
        points.truncate(self.config.max_keypoints);
        points
    }
}

/// Render a summary for inclusion in a prompt. Empty summaries render empty.
pub fn format_summary_for_context(summary: &str, message_count: usize, keypoints: &[String]) -> String {
    if summary.is_empty() {
        return String::new();
    }
    let mut out = format!("[Résumé conversation précédente ({message_count} messages)]\n{summary}");
    if !keypoints.is_empty() {
        out.push_str("\n\nPoints clés :\n");
        for (i, point) in keypoints.iter().enumerate() {
            out.push_str(&format!("{}. {point}\n", i + 1));
        }
    }
    out
}

fn role_prefix(role: Role) -> &'static str {
    match role {
        Role::User => "Utilisateur:",
        Role::Assistant => "Assistant:",
        Role::System => "Système:",
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Role-prefixed, whitespace-normalised lines joined by newlines.
pub fn format_conversation(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{} {}", role_prefix(m.role), collapse_whitespace(&m.content)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip prompt markers, collapse whitespace and cap the length.
///
/// When the text is cut, it is shortened further to the last full stop
/// inside the budget if there is one.
pub fn clean_summary(raw: &str, max_chars: usize) -> String {
    let stripped = PROMPT_MARKER.replace_all(raw, "");
    let summary = collapse_whitespace(&stripped);

    let Some((cut, _)) = summary.char_indices().nth(max_chars) else {
        return summary;
    };
    let truncated = &summary[..cut];
    match truncated.rfind('.') {
        Some(period) if period > 0 => truncated[..=period].to_string(),
        _ => truncated.to_string(),
    }
}

fn basic_summary(messages: &[ChatMessage]) -> String {
    let user: Vec<&ChatMessage> = messages.iter().filter(|m| m.role == Role::User).collect();
    let assistant = messages.iter().filter(|m| m.role == Role::Assistant).count();

    let mut summary = format!(
        "Conversation de {} messages ({} de l'utilisateur, {} de l'assistant).",
        messages.len(),
        user.len(),
        assistant
    );
    if let Some(first) = user.first() {
        let opening: String = first.content.chars().take(FIRST_MESSAGE_PREVIEW_CHARS).collect();
        summary.push_str(&format!(" Premier message: '{opening}...'."));
    }
    summary
}

fn parse_bullets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| BULLET.is_match(line))
        .map(|line| BULLET.replace(line, "").trim().to_string())
        .filter(|point| !point.is_empty())
        .collect()
}

fn heuristic_keypoints(messages: &[ChatMessage]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| {
            let lower = m.content.to_lowercase();
            IMPORTANT_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|m| {
            let snippet: String = m.content.chars().take(KEYPOINT_SNIPPET_CHARS).collect();
            format!("{snippet}...")
        })
        .collect()
}
