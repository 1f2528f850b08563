// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed async operations, one module per table.
//!
//! Every function takes `&Database` and runs its statements on the shared
//! connection thread through [`Database::call`](crate::Database::call).

pub mod conversations;
pub mod embeddings;
pub mod emotions;
pub mod facts;
pub mod personality;
pub mod segments;
