// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `workly context` command implementation.

use workly_config::WorklyConfig;
use workly_core::WorklyError;

use crate::stack;

/// Print the context blob the companion would prepend to its prompt.
pub async fn run_context(
    config: &WorklyConfig,
    query: &str,
    max_tokens: Option<usize>,
    include_facts: bool,
) -> Result<(), WorklyError> {
    let db = stack::open_database(config).await?;
    let manager = stack::memory_manager(config, db).await?;
    let max_tokens = max_tokens.unwrap_or(config.memory.context_max_tokens);

    let context = manager
        .get_context_for_prompt(query, include_facts, true, max_tokens)
        .await?;
    if context.is_empty() {
        eprintln!("(no memory context for this query)");
    } else {
        println!("{context}");
    }
    Ok(())
}
