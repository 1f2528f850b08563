// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Evolving personality of the assistant.
//!
//! Base trait scores persist in `personality_traits`, every change leaves a
//! row in `personality_evolution`. Context modifiers are in-memory only and
//! shift the effective score for the current conversation.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info, warn};
use workly_core::WorklyError;
use workly_core::types::now_timestamp;
use workly_storage::queries::personality;
use workly_storage::{Database, PersonalityTrait, TraitEvolution};

/// Smallest score change that is persisted.
const MIN_CHANGE: f64 = 0.01;
const MAX_MODIFIER: f64 = 0.5;
/// Effective score of a trait the engine does not know.
const UNKNOWN_TRAIT_SCORE: f64 = 0.5;

const DEFAULT_TRAITS: &[(&str, f64, &str)] = &[
    ("kindness", 0.8, "Niveau de chaleur et bienveillance dans les interactions"),
    ("humor", 0.6, "Fréquence et intensité des blagues et références amusantes"),
    ("formality", 0.3, "Niveau de formalité vs casual dans le langage"),
    ("enthusiasm", 0.7, "Niveau d'énergie et d'excitation dans les réponses"),
    ("empathy", 0.8, "Capacité à comprendre et répondre aux émotions"),
    ("creativity", 0.6, "Originalité et imagination dans les réponses"),
];

const POSITIVE_FEEDBACK: &[&str] = &["merci", "génial", "super", "excellent", "parfait", "cool", "top"];
const NEGATIVE_FEEDBACK: &[&str] = &["arrête", "trop", "moins", "sérieux", "calme", "stop"];
const HUMOR_MENTIONS: &[&str] = &["drôle", "marrant"];
const CALM_REQUESTS: &[&str] = &["calme", "trop excité"];

/// Coarse time of day used to adapt the tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Bucket a 0-23 hour.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            18..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

/// One trait as reported by [`PersonalityEngine::summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitSummary {
    pub base_score: f64,
    pub current_score: f64,
    pub modifier: f64,
    pub description: Option<String>,
    pub last_updated: String,
    pub evolution_count: usize,
}

/// Trait scores of the assistant plus per-conversation modifiers.
pub struct PersonalityEngine {
    db: Database,
    traits: BTreeMap<String, PersonalityTrait>,
    modifiers: HashMap<String, f64>,
}

impl PersonalityEngine {
    /// Load the traits, seeding any missing default.
    pub async fn load(db: Database) -> Result<Self, WorklyError> {
        let mut traits: BTreeMap<String, PersonalityTrait> = personality::list_traits(&db)
            .await?
            .into_iter()
            .map(|t| (t.trait_name.clone(), t))
            .collect();

        let timestamp = now_timestamp();
        for (name, score, description) in DEFAULT_TRAITS {
            if traits.contains_key(*name) {
                continue;
            }
            let seeded = PersonalityTrait {
                trait_name: name.to_string(),
                score: *score,
                description: Some(description.to_string()),
                last_updated: timestamp.clone(),
            };
            personality::upsert_trait(&db, &seeded).await?;
            personality::record_evolution(&db, name, *score, *score, Some("Initialisation"), &timestamp)
                .await?;
            debug!(trait_name = name, score, "personality trait seeded");
            traits.insert(name.to_string(), seeded);
        }

        Ok(Self {
            db,
            traits,
            modifiers: HashMap::new(),
        })
    }

    pub fn trait_names(&self) -> impl Iterator<Item = &str> {
        self.traits.keys().map(String::as_str)
    }

    /// Base score plus context modifier, clamped to 0..=1.
    pub fn trait_score(&self, name: &str) -> f64 {
        let Some(t) = self.traits.get(name) else {
            return UNKNOWN_TRAIT_SCORE;
        };
        let modifier = self.modifiers.get(name).copied().unwrap_or(0.0);
        (t.score + modifier).clamp(0.0, 1.0)
    }

    /// Shift a base score by `delta`.
    ///
    /// Returns whether the change was large enough to be persisted. Unknown
    /// traits are ignored.
    pub async fn update_trait(&mut self, name: &str, delta: f64, reason: &str) -> Result<bool, WorklyError> {
        let Some(current) = self.traits.get_mut(name) else {
            warn!(trait_name = name, "unknown personality trait, update ignored");
            return Ok(false);
        };
        let old = current.score;
        let new = (old + delta).clamp(0.0, 1.0);
        if (new - old).abs() <= MIN_CHANGE {
            return Ok(false);
        }

        let timestamp = now_timestamp();
        personality::update_trait_score(&self.db, name, new, Some(reason), &timestamp).await?;
        current.score = new;
        current.last_updated = timestamp;
        debug!(trait_name = name, old, new, reason, "personality trait updated");
        Ok(true)
    }

    /// Temporary shift applied on top of the base score, clamped to ±0.5.
    pub fn set_context_modifier(&mut self, name: &str, modifier: f64) {
        self.modifiers
            .insert(name.to_string(), modifier.clamp(-MAX_MODIFIER, MAX_MODIFIER));
    }

    pub fn clear_context_modifiers(&mut self) {
        self.modifiers.clear();
    }

    /// Replace the context modifiers for the current conversation.
    pub fn adapt_to_context(
        &mut self,
        time_of_day: Option<TimeOfDay>,
        conversation_length: usize,
        prefers_formal: bool,
        likes_humor: bool,
    ) {
        self.clear_context_modifiers();

        match time_of_day {
            Some(TimeOfDay::Morning) => self.set_context_modifier("enthusiasm", 0.1),
            Some(TimeOfDay::Night) => {
                self.set_context_modifier("enthusiasm", -0.1);
                self.set_context_modifier("formality", -0.1);
            }
            _ => {}
        }

        if conversation_length > 20 {
            self.set_context_modifier("formality", -0.1);
            self.set_context_modifier("empathy", 0.1);
        }
        if prefers_formal {
            self.set_context_modifier("formality", 0.2);
        }
        if likes_humor {
            self.set_context_modifier("humor", 0.15);
        }
    }

    /// Nudge traits from what the user just said.
    pub async fn analyze_feedback(&mut self, message: &str, emotion: Option<&str>) -> Result<(), WorklyError> {
        let lower = message.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        let positive = mentions(POSITIVE_FEEDBACK);
        let negative = mentions(NEGATIVE_FEEDBACK);

        if mentions(HUMOR_MENTIONS) {
            if positive {
                self.update_trait("humor", 0.05, "Feedback positif sur humour").await?;
            } else if negative {
                self.update_trait("humor", -0.05, "Demande de réduction humour").await?;
            }
        }

        if mentions(CALM_REQUESTS) {
            self.update_trait("enthusiasm", -0.05, "Demande de réduction enthousiasme")
                .await?;
        }

        if let Some(emotion @ ("sorrow" | "angry")) = emotion {
            self.update_trait("empathy", 0.03, &format!("Réponse à émotion {emotion}"))
                .await?;
        }

        if positive && !negative {
            for name in ["kindness", "enthusiasm"] {
                self.update_trait(name, 0.02, "Feedback général positif").await?;
            }
        }
        Ok(())
    }

    /// System prompt fragment describing the current personality.
    pub fn personality_prompt(&self) -> String {
        let mut traits: Vec<&str> = Vec::new();

        let kindness = self.trait_score("kindness");
        traits.push(if kindness > 0.7 {
            "très chaleureux et bienveillant"
        } else if kindness > 0.5 {
            "aimable et attentionné"
        } else {
            "professionnel et direct"
        });

        let humor = self.trait_score("humor");
        if humor > 0.7 {
            traits.push("avec un bon sens de l'humour et des références amusantes");
        } else if humor > 0.5 {
            traits.push("avec des touches d'humour occasionnelles");
        }

        let formality = self.trait_score("formality");
        if formality < 0.4 {
            traits.push("dans un style décontracté et accessible");
        } else if formality > 0.6 {
            traits.push("dans un style formel et structuré");
        }

        let enthusiasm = self.trait_score("enthusiasm");
        if enthusiasm > 0.7 {
            traits.push("énergique et passionné");
        } else if enthusiasm < 0.4 {
            traits.push("calme et posé");
        }

        if self.trait_score("empathy") > 0.7 {
            traits.push("très à l'écoute des émotions");
        }
        if self.trait_score("creativity") > 0.7 {
            traits.push("créatif dans tes explications");
        }

        let (head, rest) = traits.split_at(traits.len().min(3));
        let mut prompt = format!("Tu es {}.", head.join(", "));
        if !rest.is_empty() {
            prompt.push_str(&format!(" {}.", rest.join(", ")));
        }
        prompt
    }

    pub async fn summary(&self) -> Result<BTreeMap<String, TraitSummary>, WorklyError> {
        let mut summary = BTreeMap::new();
        for (name, t) in &self.traits {
            let evolution_count = personality::evolution_history(&self.db, Some(name.as_str()), None)
                .await?
                .len();
            summary.insert(
                name.clone(),
                TraitSummary {
                    base_score: t.score,
                    current_score: self.trait_score(name),
                    modifier: self.modifiers.get(name).copied().unwrap_or(0.0),
                    description: t.description.clone(),
                    last_updated: t.last_updated.clone(),
                    evolution_count,
                },
            );
        }
        Ok(summary)
    }

    /// Put every default trait back to its default score and drop modifiers.
    pub async fn reset_to_defaults(&mut self) -> Result<(), WorklyError> {
        let timestamp = now_timestamp();
        for (name, score, description) in DEFAULT_TRAITS {
            let unchanged = self
                .traits
                .get(*name)
                .is_some_and(|t| (t.score - score).abs() < f64::EPSILON);
            if unchanged {
                continue;
            }
            if self.traits.contains_key(*name) {
                personality::update_trait_score(&self.db, name, *score, Some("Réinitialisation"), &timestamp)
                    .await?;
            } else {
                personality::upsert_trait(
                    &self.db,
                    &PersonalityTrait {
                        trait_name: name.to_string(),
                        score: *score,
                        description: Some(description.to_string()),
                        last_updated: timestamp.clone(),
                    },
                )
                .await?;
            }
            self.traits.insert(
                name.to_string(),
                PersonalityTrait {
                    trait_name: name.to_string(),
                    score: *score,
                    description: Some(description.to_string()),
                    last_updated: timestamp.clone(),
                },
            );
        }
        self.clear_context_modifiers();
        info!("personality reset to defaults");
        Ok(())
    }

    /// Latest changes of one trait, newest first. Unknown traits have none.
    pub async fn evolution_history(&self, name: &str, limit: usize) -> Result<Vec<TraitEvolution>, WorklyError> {
        if !self.traits.contains_key(name) {
            return Ok(Vec::new());
        }
        personality::evolution_history(&self.db, Some(name), Some(limit as i64)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn engine() -> PersonalityEngine {
        PersonalityEngine::load(Database::open_in_memory().await.unwrap())
            .await
            .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[tokio::test]
    async fn load_seeds_defaults() {
        let engine = engine().await;
        assert_eq!(engine.trait_names().count(), 6);
        assert!(close(engine.trait_score("kindness"), 0.8));
        assert!(close(engine.trait_score("formality"), 0.3));
        assert!(close(engine.trait_score("wit"), 0.5));

        let history = engine.evolution_history("humor", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason.as_deref(), Some("Initialisation"));
    }

    #[tokio::test]
    async fn load_keeps_persisted_scores() {
        let db = Database::open_in_memory().await.unwrap();
        let mut engine = PersonalityEngine::load(db.clone()).await.unwrap();
        engine.update_trait("humor", 0.2, "test").await.unwrap();

        let reloaded = PersonalityEngine::load(db).await.unwrap();
        assert!(close(reloaded.trait_score("humor"), 0.8));
        assert_eq!(reloaded.evolution_history("humor", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn tiny_updates_are_not_persisted() {
        let mut engine = engine().await;
        assert!(!engine.update_trait("humor", 0.005, "bruit").await.unwrap());
        assert!(close(engine.trait_score("humor"), 0.6));
        assert_eq!(engine.evolution_history("humor", 10).await.unwrap().len(), 1);

        assert!(engine.update_trait("humor", 0.1, "blague appréciée").await.unwrap());
        let history = engine.evolution_history("humor", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].reason.as_deref(), Some("blague appréciée"));
        assert!(close(history[0].old_score, 0.6));
        assert!(close(history[0].new_score, 0.7));
    }

    #[tokio::test]
    async fn updates_clamp_and_ignore_unknown() {
        let mut engine = engine().await;
        engine.update_trait("kindness", 0.5, "test").await.unwrap();
        assert!(close(engine.trait_score("kindness"), 1.0));
        assert!(!engine.update_trait("kindness", 0.5, "test").await.unwrap());
        assert!(!engine.update_trait("wit", 0.3, "test").await.unwrap());
        assert!(engine.evolution_history("wit", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn modifiers_clamp() {
        let mut engine = engine().await;
        engine.set_context_modifier("humor", 0.9);
        assert!(close(engine.trait_score("humor"), 1.0));
        engine.set_context_modifier("humor", -0.9);
        assert!(close(engine.trait_score("humor"), 0.1));
        engine.clear_context_modifiers();
        assert!(close(engine.trait_score("humor"), 0.6));
    }

    #[tokio::test]
    async fn adapt_to_late_long_formal_conversation() {
        let mut engine = engine().await;
        engine.adapt_to_context(Some(TimeOfDay::Night), 25, true, false);
        assert!(close(engine.trait_score("enthusiasm"), 0.6));
        assert!(close(engine.trait_score("formality"), 0.5));
        assert!(close(engine.trait_score("empathy"), 0.9));
        assert!(close(engine.trait_score("humor"), 0.6));

        engine.adapt_to_context(Some(TimeOfDay::Morning), 0, false, true);
        assert!(close(engine.trait_score("enthusiasm"), 0.8));
        assert!(close(engine.trait_score("formality"), 0.3));
        assert!(close(engine.trait_score("humor"), 0.75));
    }

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_hour(7), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(14), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(2), TimeOfDay::Night);
    }

    #[tokio::test]
    async fn positive_feedback_on_humor() {
        let mut engine = engine().await;
        engine
            .analyze_feedback("Merci, c'est super drôle !", None)
            .await
            .unwrap();
        assert!(close(engine.trait_score("humor"), 0.65));
        assert!(close(engine.trait_score("kindness"), 0.82));
        assert!(close(engine.trait_score("enthusiasm"), 0.72));
    }

    #[tokio::test]
    async fn calm_request_and_sad_user() {
        let mut engine = engine().await;
        engine
            .analyze_feedback("Tu peux être plus calme ?", Some("sorrow"))
            .await
            .unwrap();
        assert!(close(engine.trait_score("enthusiasm"), 0.65));
        assert!(close(engine.trait_score("empathy"), 0.83));
        assert!(close(engine.trait_score("kindness"), 0.8));
    }

    #[tokio::test]
    async fn default_prompt() {
        let engine = engine().await;
        assert_eq!(
            engine.personality_prompt(),
            "Tu es très chaleureux et bienveillant, avec des touches d'humour occasionnelles, \
             dans un style décontracté et accessible. très à l'écoute des émotions."
        );
    }

    #[tokio::test]
    async fn prompt_follows_modifiers() {
        let mut engine = engine().await;
        engine.set_context_modifier("kindness", -0.4);
        engine.set_context_modifier("humor", -0.3);
        engine.set_context_modifier("formality", 0.4);
        engine.set_context_modifier("enthusiasm", -0.4);
        engine.set_context_modifier("empathy", -0.3);
        assert_eq!(
            engine.personality_prompt(),
            "Tu es professionnel et direct, dans un style formel et structuré, calme et posé."
        );
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let mut engine = engine().await;
        engine.update_trait("humor", 0.3, "test").await.unwrap();
        engine.set_context_modifier("empathy", 0.2);
        engine.reset_to_defaults().await.unwrap();

        assert!(close(engine.trait_score("humor"), 0.6));
        assert!(close(engine.trait_score("empathy"), 0.8));
        let history = engine.evolution_history("humor", 1).await.unwrap();
        assert_eq!(history[0].reason.as_deref(), Some("Réinitialisation"));
    }

    #[tokio::test]
    async fn summary_reports_modifiers() {
        let mut engine = engine().await;
        engine.set_context_modifier("humor", 0.1);
        let summary = engine.summary().await.unwrap();
        let humor = &summary["humor"];
        assert!(close(humor.base_score, 0.6));
        assert!(close(humor.current_score, 0.7));
        assert!(close(humor.modifier, 0.1));
        assert_eq!(humor.evolution_count, 1);
        assert_eq!(summary.len(), 6);
    }
}
