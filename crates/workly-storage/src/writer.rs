// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-writer discipline for the shared store.
//!
//! The desktop UI and the chat-bot bridge may share one database file. Every
//! write goes through the single `tokio-rusqlite` connection owned by
//! [`Database`](crate::Database); query modules take `&Database` and run their
//! statements inside `Database::call`. Writes that touch several rows open an
//! explicit transaction inside that closure, so no other writer can observe a
//! half-applied change.
//!
//! **Do NOT open additional `rusqlite::Connection`s for writes.**

use rusqlite::Transaction;

/// Run `f` inside an immediate transaction, committing on success.
///
/// `IMMEDIATE` takes the write lock up front, so a second process sharing the
/// file waits on `busy_timeout` instead of failing mid-transaction.
pub fn with_transaction<R>(
    conn: &mut rusqlite::Connection,
    f: impl FnOnce(&Transaction<'_>) -> Result<R, rusqlite::Error>,
) -> Result<R, rusqlite::Error> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}
