// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end memory scenarios over a real SQLite file.

use workly_core::{EmotionSource, Role};
use workly_memory::Trend;
use workly_test_utils::TestHarness;

async fn chat(harness: &TestHarness, pairs: usize) {
    for i in 0..pairs {
        harness
            .manager
            .add_message(Role::User, "Hier j'ai rencontré Marie et Thomas au café.")
            .await
            .unwrap();
        harness
            .manager
            .add_message(Role::Assistant, &format!("Réponse numéro {i}."))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn segments_and_entities_survive_restart() {
    let harness = TestHarness::builder().build().await.unwrap();
    chat(&harness, 25).await;

    let before = harness.manager.get_stats().await.unwrap();
    assert_eq!(before.turn_count, 50);
    assert_eq!(before.segment_count, 2);
    assert_eq!(before.open_buffer_length, 10);
    assert!(before.entity_count >= 2);

    let harness = harness.reopen().await.unwrap();
    let after = harness.manager.get_stats().await.unwrap();
    assert_eq!(after.segment_count, before.segment_count);
    assert_eq!(after.entity_count, before.entity_count);
    assert_eq!(after.turn_count, 50);
    assert_eq!(after.open_buffer_length, 0);
}

#[tokio::test]
async fn threshold_turn_closes_the_segment() {
    let harness = TestHarness::builder().build().await.unwrap();
    for i in 0..19 {
        harness.manager.add_message(Role::User, &format!("Question {i} ?")).await.unwrap();
    }
    let stats = harness.manager.get_stats().await.unwrap();
    assert_eq!(stats.segment_count, 0);
    assert_eq!(stats.open_buffer_length, 19);

    let added = harness.manager.add_message(Role::Assistant, "Voilà.").await.unwrap();
    assert!(added.segment.is_some_and(|s| s.is_created()));
    let stats = harness.manager.get_stats().await.unwrap();
    assert_eq!(stats.segment_count, 1);
    assert_eq!(stats.open_buffer_length, 0);
}

#[tokio::test]
async fn search_without_embeddings_falls_back_to_recent_segments() {
    let harness = TestHarness::builder().with_threshold(5).build().await.unwrap();
    chat(&harness, 9).await;

    let hits = harness.manager.search_relevant_context("Python", 2, 0.3).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| (h.similarity - 1.0).abs() < f32::EPSILON));
    assert!(hits.iter().all(|h| h.segment_id.is_some()));
}

#[tokio::test]
async fn semantic_search_prefers_matching_segment() {
    let harness = TestHarness::builder()
        .with_embedder()
        .with_threshold(100)
        .with_mock_responses(vec![
            "Python bibliothèques.".into(),
            "- Python".into(),
            "Cuisine tomates recette.".into(),
            "- Cuisine".into(),
        ])
        .build()
        .await
        .unwrap();

    for topic in ["python", "cuisine"] {
        for i in 0..6 {
            harness
                .manager
                .add_message(Role::User, &format!("Parlons de {topic}, message {i}."))
                .await
                .unwrap();
        }
        assert!(harness.manager.force_segment_creation().await.unwrap().is_created());
    }

    let stats = harness.manager.get_stats().await.unwrap();
    assert_eq!(stats.segment_count, 2);
    assert_eq!(stats.embedding_count, 2);
    assert_eq!(stats.embedding_model, "mock-embedder");

    let hits = harness
        .manager
        .search_relevant_context("python bibliothèques", 2, 0.5)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].similarity > 0.99);
    assert!(hits[0].text_preview.contains("Python"));

    let prompts = harness.generator.as_ref().unwrap().prompts().await;
    assert_eq!(prompts.len(), 4);
}

#[tokio::test]
async fn failing_generator_still_produces_segments() {
    let harness = TestHarness::builder()
        .with_failing_generator()
        .with_threshold(6)
        .build()
        .await
        .unwrap();
    chat(&harness, 3).await;

    let stats = harness.manager.get_stats().await.unwrap();
    assert_eq!(stats.segment_count, 1);
    let context = harness
        .manager
        .get_context_for_prompt("café", false, true, 1000)
        .await
        .unwrap();
    assert!(context.contains("Conversation de 6 messages"));
}

#[tokio::test]
async fn companion_state_shares_one_store() {
    let harness = TestHarness::builder().build().await.unwrap();

    let emotions = harness.emotions();
    for (emotion, intensity) in [("sorrow", 60.0), ("neutral", 50.0), ("joy", 70.0), ("fun", 90.0)] {
        emotions
            .record(emotion, intensity, 90.0, EmotionSource::User, "", None)
            .await
            .unwrap();
    }
    assert_eq!(emotions.trend(2).await.unwrap(), Trend::Improving);

    let mut personality = harness.personality().await.unwrap();
    let before = personality.trait_score("humor");
    assert!(personality.update_trait("humor", 0.1, "test").await.unwrap());

    let reloaded = harness.personality().await.unwrap();
    assert!((reloaded.trait_score("humor") - (before + 0.1)).abs() < 1e-6);
    let history = reloaded.evolution_history("humor", 10).await.unwrap();
    assert_eq!(history[0].reason.as_deref(), Some("test"));
}
