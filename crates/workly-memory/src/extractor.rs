// SPDX-FileCopyrightText: 2026 Workly Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic fact extraction from French user messages.
//!
//! Entities come from regular expressions; preferences, events and
//! relationships come from keyword tables. Keywords are matched against word
//! tokens, so `"aime"` never fires inside `"aimerais"` and multi-word
//! keywords such as `"n'aime pas"` match token sequences. The final token of
//! a keyword also matches its plural (`brocoli` / `brocolis`).
//!
//! Extraction is pure: the same message and timestamp always produce the
//! same facts.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use workly_core::WorklyError;
use workly_core::types::{now_timestamp, preview};

use crate::types::{
    Entity, EntityType, Event, EventType, ExtractedFacts, Preference, Relationship, Sentiment,
};

/// Category name paired with its trigger keywords.
type KeywordTable = &'static [(&'static str, &'static [&'static str])];

const POSITIVE_KEYWORDS: &[&str] = &[
    "aime", "adore", "préfère", "apprécie", "raffole", "fan de", "passionné", "favori",
    "excellent", "génial", "j'aime", "je préfère", "c'est super", "c'est bien",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "déteste", "n'aime pas", "horreur de", "pas fan", "je n'aime pas", "c'est nul",
    "c'est mauvais", "insupportable", "horrible", "désagréable",
];

const STRONG_POSITIVE: &[&str] = &["adore", "raffole"];
const STRONG_NEGATIVE: &[&str] = &["déteste", "horreur"];

const PREFERENCE_CATEGORIES: KeywordTable = &[
    (
        "food",
        &[
            "pizza", "burger", "salade", "viande", "poisson", "végétarien", "chocolat", "gâteau",
            "cuisine", "restaurant", "plat", "nourriture", "brocoli", "légume",
        ],
    ),
    (
        "hobby",
        &[
            "sport", "lecture", "jeux vidéo", "musique", "film", "série", "voyage", "randonnée",
            "natation", "football", "basket", "tennis",
        ],
    ),
    (
        "music",
        &[
            "rock", "pop", "jazz", "classique", "rap", "électro", "métal", "chanson", "artiste",
            "groupe", "concert", "album",
        ],
    ),
    (
        "work",
        &[
            "programmation", "développement", "design", "marketing", "gestion", "projet",
            "équipe", "bureau", "réunion",
        ],
    ),
    (
        "color",
        &[
            "rouge", "bleu", "vert", "jaune", "noir", "blanc", "rose", "violet", "orange", "gris",
            "couleur",
        ],
    ),
];

const EVENT_KEYWORDS: &[(EventType, &[&str])] = &[
    (
        EventType::PastAction,
        &[
            "ai fait", "j'ai", "était", "hier", "la semaine dernière", "le mois dernier", "il y a",
            "c'était", "avais",
        ],
    ),
    (
        EventType::CurrentProject,
        &["actuellement", "en ce moment", "travaille sur", "suis en train de", "occupe de", "fais"],
    ),
    (
        EventType::FutureGoal,
        &[
            "veux", "voudrais", "compte", "projet de", "prévois", "envisage", "demain", "bientôt",
            "plus tard", "va",
        ],
    ),
];

const RELATIONSHIP_KEYWORDS: KeywordTable = &[
    (
        "family",
        &[
            "père", "mère", "frère", "sœur", "fils", "fille", "cousin", "oncle", "tante",
            "grand-père", "grand-mère", "parent", "famille",
        ],
    ),
    ("friend", &["ami", "amie", "copain", "copine", "pote", "meilleur ami"]),
    ("colleague", &["collègue", "patron", "chef", "manager", "équipe", "travaille avec"]),
    ("owns", &["a un", "a une", "possède", "propriétaire de"]),
    ("works_at", &["travaille à", "travaille chez", "employé de", "chez"]),
];

const ENTITY_INDICATORS: &[(EntityType, &[&str])] = &[
    (EntityType::Person, &["rencontré", "parlé avec", "ami", "collègue"]),
    (EntityType::Location, &["visité", "habite", "voyage", "ville"]),
    (EntityType::Organization, &["travaille", "entreprise", "société", "boîte"]),
];

/// Capitalised words that open sentences far more often than they name people.
const SENTENCE_STARTERS: &[&str] = &[
    "Hier", "Aujourd", "Demain", "Je", "Tu", "Il", "Elle", "On", "Nous", "Vous", "Ils", "Elles",
    "Mon", "Ma", "Mes", "Ton", "Ta", "Tes", "Son", "Sa", "Ses", "Notre", "Votre", "Le", "La",
    "Les", "Un", "Une", "Ce", "Cette", "Et", "Mais", "Donc", "Alors", "Quand", "Comment",
    "Pourquoi", "Depuis", "Bonjour", "Salut", "Merci", "Oui", "Non", "Voilà",
];

const ENTITY_BASE_CONFIDENCE: f64 = 0.5;
const ENTITY_CONFIDENCE_STEP: f64 = 0.1;
const RELATIONSHIP_CONFIDENCE: f64 = 0.7;
const STRONG_INTENSITY: f64 = 0.7;
const MODERATE_INTENSITY: f64 = 0.6;
const EVENT_DESCRIPTION_CHARS: usize = 100;

const CAPITALIZED: &str = r"\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+)*";

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

static PERSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b{CAPITALIZED}\b")).expect("person pattern is valid")
});

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?i:à|en|dans|vers)\s+({CAPITALIZED})\b"))
        .expect("location pattern is valid")
});

static ORGANIZATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?i:chez|pour)\s+({CAPITALIZED})\b"))
        .expect("organization pattern is valid")
});

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:\d{1,2}[-/]\d{1,2}[-/]\d{2,4}|lundi|mardi|mercredi|jeudi|vendredi|samedi|dimanche|hier|aujourd'hui|demain|la semaine prochaine|le mois prochain)\b",
    )
    .expect("date pattern is valid")
});

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?;:\n]+").expect("sentence pattern is valid"));

static CLAUSE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|\bet\b|\bmais\b").expect("clause pattern is valid"));

/// Source of structured facts for the memory manager.
///
/// [`FactExtractor`] is the production implementation; tests substitute
/// failing or canned implementations.
pub trait FactExtraction: Send + Sync {
    fn extract_facts(&self, message: &str, timestamp: &str) -> Result<ExtractedFacts, WorklyError>;
}

/// Keyword and regex based extractor for French conversation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactExtractor;

impl FactExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every fact category, stamped with the current time.
    pub fn extract(&self, message: &str) -> ExtractedFacts {
        self.extract_at(message, &now_timestamp())
    }

    /// Extract every fact category with an explicit timestamp.
    pub fn extract_at(&self, message: &str, timestamp: &str) -> ExtractedFacts {
        if message.trim().is_empty() {
            return ExtractedFacts::default();
        }
        ExtractedFacts {
            entities: self.extract_entities(message, timestamp),
            preferences: self.extract_preferences(message, timestamp),
            events: self.extract_events(message, timestamp),
            relationships: self.extract_relationships(message, timestamp),
        }
    }

    /// Named people, places, organisations and dates.
    pub fn extract_entities(&self, message: &str, timestamp: &str) -> Vec<Entity> {
        let tokens = tokenize(message);
        let candidates = entity_candidates(message);
        let mut seen = HashSet::new();

        candidates
            .into_iter()
            .filter(|(_, value)| value.chars().count() >= 2)
            .filter(|(entity_type, value)| seen.insert((*entity_type, value.to_lowercase())))
            .map(|(entity_type, value)| Entity {
                confidence: entity_confidence(entity_type, &value, &tokens),
                entity_type,
                value,
                context: message.to_string(),
                first_seen: timestamp.to_string(),
                occurrences: 1,
            })
            .collect()
    }

    /// Likes and dislikes, evaluated clause by clause.
    ///
    /// A clause without its own sentiment keyword inherits the sentiment of
    /// the previous clause in the same sentence, unless it follows `mais`.
    pub fn extract_preferences(&self, message: &str, timestamp: &str) -> Vec<Preference> {
        let mut preferences = Vec::new();

        for sentence in SENTENCE_BREAK.split(message) {
            let mut carried: Option<(Sentiment, f64)> = None;
            for (clause, after_contrast) in clauses(sentence) {
                let tokens = tokenize(clause);
                if tokens.is_empty() {
                    continue;
                }
                let sentiment = match clause_sentiment(&tokens) {
                    Some(found) => Some(found),
                    None if !after_contrast => carried,
                    None => None,
                };
                let Some((sentiment, intensity)) = sentiment else {
                    carried = None;
                    continue;
                };
                carried = Some((sentiment, intensity));

                // First category in table order wins.
                let matched = PREFERENCE_CATEGORIES.iter().find_map(|(category, keywords)| {
                    keywords
                        .iter()
                        .find(|k| contains_keyword(&tokens, k))
                        .map(|subject| (*category, *subject))
                });
                if let Some((category, subject)) = matched {
                    preferences.push(Preference {
                        category: category.to_string(),
                        subject: subject.to_string(),
                        sentiment,
                        intensity,
                        context: message.to_string(),
                        timestamp: timestamp.to_string(),
                    });
                }
            }
        }
        preferences
    }

    /// At most one event: the first tense class whose indicators appear.
    pub fn extract_events(&self, message: &str, timestamp: &str) -> Vec<Event> {
        let tokens = tokenize(message);
        let Some(event_type) = EVENT_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| contains_keyword(&tokens, k)))
            .map(|(event_type, _)| *event_type)
        else {
            return Vec::new();
        };

        let candidates = entity_candidates(message);
        let first_of = |wanted: EntityType| {
            candidates
                .iter()
                .find(|(entity_type, _)| *entity_type == wanted)
                .map(|(_, value)| value.clone())
        };

        vec![Event {
            event_type,
            description: preview(message, EVENT_DESCRIPTION_CHARS),
            participants: candidates
                .iter()
                .filter(|(entity_type, _)| *entity_type == EntityType::Person)
                .map(|(_, value)| value.clone())
                .collect(),
            location: first_of(EntityType::Location),
            time_reference: first_of(EntityType::Date),
            status: event_type.status(),
            context: message.to_string(),
            timestamp: timestamp.to_string(),
        }]
    }

    /// `subject relation object` triples around relation keywords.
    ///
    /// The word right before the keyword is the subject and the word right
    /// after is the object. Keywords at either edge of the message are
    /// skipped in favour of the next keyword of the same relation.
    pub fn extract_relationships(&self, message: &str, timestamp: &str) -> Vec<Relationship> {
        let tokens = tokenize(message);
        let mut relationships = Vec::new();

        for (relation_type, keywords) in RELATIONSHIP_KEYWORDS {
            let Some(span) = keywords
                .iter()
                .filter_map(|k| find_keyword(&tokens, k))
                .find(|span| span.start > 0 && span.end < tokens.len())
            else {
                continue;
            };
            relationships.push(Relationship {
                subject: tokens[span.start - 1].text.to_string(),
                relation_type: (*relation_type).to_string(),
                object: tokens[span.end].text.to_string(),
                context: message.to_string(),
                confidence: RELATIONSHIP_CONFIDENCE,
                timestamp: timestamp.to_string(),
            });
        }
        relationships
    }
}

impl FactExtraction for FactExtractor {
    fn extract_facts(&self, message: &str, timestamp: &str) -> Result<ExtractedFacts, WorklyError> {
        Ok(self.extract_at(message, timestamp))
    }
}

/// One word of a message.
#[derive(Debug)]
pub(crate) struct Token<'a> {
    text: &'a str,
    lower: String,
}

pub(crate) fn tokenize(text: &str) -> Vec<Token<'_>> {
    WORD.find_iter(text)
        .map(|m| Token {
            text: m.as_str(),
            lower: m.as_str().to_lowercase(),
        })
        .collect()
}

/// Token range of the first occurrence of `keyword`.
fn find_keyword(tokens: &[Token<'_>], keyword: &str) -> Option<Range<usize>> {
    let parts: Vec<String> = WORD
        .find_iter(keyword)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    if parts.is_empty() || parts.len() > tokens.len() {
        return None;
    }
    let last = parts.len() - 1;

    (0..=tokens.len() - parts.len())
        .find(|&start| {
            parts.iter().enumerate().all(|(offset, part)| {
                let token = tokens[start + offset].lower.as_str();
                token == part.as_str() || (offset == last && is_plural_of(token, part))
            })
        })
        .map(|start| start..start + parts.len())
}

fn is_plural_of(token: &str, singular: &str) -> bool {
    token.strip_suffix('s') == Some(singular)
}

pub(crate) fn contains_keyword(tokens: &[Token<'_>], keyword: &str) -> bool {
    find_keyword(tokens, keyword).is_some()
}

fn clause_sentiment(tokens: &[Token<'_>]) -> Option<(Sentiment, f64)> {
    let intensity = |strong: &[&str]| {
        if strong.iter().any(|k| contains_keyword(tokens, k)) {
            STRONG_INTENSITY
        } else {
            MODERATE_INTENSITY
        }
    };
    if NEGATIVE_KEYWORDS.iter().any(|k| contains_keyword(tokens, k)) {
        return Some((Sentiment::Negative, intensity(STRONG_NEGATIVE)));
    }
    if POSITIVE_KEYWORDS.iter().any(|k| contains_keyword(tokens, k)) {
        return Some((Sentiment::Positive, intensity(STRONG_POSITIVE)));
    }
    None
}

/// Split a sentence on commas, `et` and `mais`.
///
/// Each clause is paired with whether it directly follows `mais`.
fn clauses(sentence: &str) -> Vec<(&str, bool)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut after_contrast = false;
    for m in CLAUSE_BREAK.find_iter(sentence) {
        out.push((&sentence[start..m.start()], after_contrast));
        after_contrast = m.as_str().eq_ignore_ascii_case("mais");
        start = m.end();
    }
    out.push((&sentence[start..], after_contrast));
    out
}

/// Raw `(type, value)` candidates in message order, before dedup.
fn entity_candidates(message: &str) -> Vec<(EntityType, String)> {
    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut found: Vec<(usize, EntityType, String)> = Vec::new();

    for (pattern, entity_type) in [
        (&*LOCATION, EntityType::Location),
        (&*ORGANIZATION, EntityType::Organization),
    ] {
        for caps in pattern.captures_iter(message) {
            if let Some(m) = caps.get(1) {
                claimed.push(m.range());
                found.push((m.start(), entity_type, m.as_str().to_string()));
            }
        }
    }
    for m in DATE.find_iter(message) {
        claimed.push(m.range());
        found.push((m.start(), EntityType::Date, m.as_str().to_string()));
    }
    for m in PERSON.find_iter(message) {
        let Some((offset, name)) = strip_sentence_starters(m.as_str()) else {
            continue;
        };
        let range = m.start() + offset..m.end();
        let overlaps = claimed
            .iter()
            .any(|c| c.start < range.end && range.start < c.end);
        if !overlaps {
            found.push((range.start, EntityType::Person, name.to_string()));
        }
    }

    found.sort_by_key(|(start, _, _)| *start);
    found
        .into_iter()
        .map(|(_, entity_type, value)| (entity_type, value))
        .collect()
}

/// Drop leading sentence-starter words; returns the byte offset of the rest.
fn strip_sentence_starters(candidate: &str) -> Option<(usize, &str)> {
    let mut rest = candidate;
    loop {
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if !SENTENCE_STARTERS.contains(&&rest[..word_end]) {
            break;
        }
        rest = rest[word_end..].trim_start();
        if rest.is_empty() {
            return None;
        }
    }
    Some((candidate.len() - rest.len(), rest))
}

fn entity_confidence(entity_type: EntityType, value: &str, tokens: &[Token<'_>]) -> f64 {
    let mut confidence = ENTITY_BASE_CONFIDENCE;
    if value.chars().next().is_some_and(char::is_uppercase) {
        confidence += ENTITY_CONFIDENCE_STEP;
    }
    if value.contains(' ') {
        confidence += ENTITY_CONFIDENCE_STEP;
    }
    let indicated = ENTITY_INDICATORS
        .iter()
        .filter(|(kind, _)| *kind == entity_type)
        .flat_map(|(_, words)| words.iter())
        .any(|w| contains_keyword(tokens, w));
    if indicated {
        confidence += ENTITY_CONFIDENCE_STEP;
    }
    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TS: &str = "2026-01-01T00:00:00.000Z";

    fn extractor() -> FactExtractor {
        FactExtractor::new()
    }

    fn of_type(entities: &[Entity], entity_type: EntityType) -> Vec<&Entity> {
        entities.iter().filter(|e| e.entity_type == entity_type).collect()
    }

    // --- entities ---

    #[test]
    fn entities_person() {
        let entities = extractor().extract_entities("Hier j'ai rencontré Marie et Thomas au café.", TS);
        let people: Vec<_> = of_type(&entities, EntityType::Person)
            .iter()
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(people, vec!["Marie", "Thomas"]);
    }

    #[test]
    fn entities_location() {
        let entities = extractor().extract_entities("Je suis allé à Paris pour visiter le Louvre.", TS);
        let places = of_type(&entities, EntityType::Location);
        assert!(places.iter().any(|e| e.value == "Paris"));
        assert!(!of_type(&entities, EntityType::Person).iter().any(|e| e.value == "Paris"));
    }

    #[test]
    fn entities_organization() {
        let entities = extractor().extract_entities("Marie travaille chez Google depuis 2020.", TS);
        let orgs = of_type(&entities, EntityType::Organization);
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].value, "Google");
    }

    #[test]
    fn entities_date() {
        for msg in ["Rendez-vous lundi prochain.", "On se voit demain à 14h.", "C'était hier soir.", "Le 12/03/2026 ça marche"] {
            let entities = extractor().extract_entities(msg, TS);
            assert!(
                !of_type(&entities, EntityType::Date).is_empty(),
                "no date found in {msg:?}"
            );
        }
    }

    #[test]
    fn entities_confidence_bounded_and_boosted() {
        let entities = extractor().extract_entities("Marie travaille chez Google depuis 2020.", TS);
        for entity in &entities {
            assert!((0.0..=1.0).contains(&entity.confidence));
        }
        // "travaille" is an organization indicator, "Google" is capitalised.
        let google = entities.iter().find(|e| e.value == "Google").unwrap();
        let marie = entities.iter().find(|e| e.value == "Marie").unwrap();
        assert!(google.confidence > marie.confidence);

        let multi = extractor().extract_entities("J'ai rencontré Jean Dupont.", TS);
        let jean = multi.iter().find(|e| e.value == "Jean Dupont").unwrap();
        assert!(jean.confidence > marie.confidence);
    }

    #[test]
    fn entities_are_deduplicated_within_a_message() {
        let entities = extractor().extract_entities("Marie a appelé. Marie arrive.", TS);
        assert_eq!(of_type(&entities, EntityType::Person).len(), 1);
    }

    #[test]
    fn sentence_starters_are_not_people() {
        let entities = extractor().extract_entities("Bonjour Marie, Je pense que Mon idée tient.", TS);
        let people: Vec<_> = of_type(&entities, EntityType::Person)
            .iter()
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(people, vec!["Marie"]);
    }

    // --- preferences ---

    #[test]
    fn preferences_positive() {
        for msg in [
            "J'adore la pizza !",
            "J'aime beaucoup la programmation Python.",
            "Je préfère le jazz à la pop.",
        ] {
            let prefs = extractor().extract_preferences(msg, TS);
            assert!(!prefs.is_empty(), "no preference in {msg:?}");
            assert!(prefs.iter().all(|p| p.sentiment == Sentiment::Positive));
        }
    }

    #[test]
    fn preferences_negative() {
        let prefs = extractor().extract_preferences("Je n'aime pas du tout la musique rap.", TS);
        assert!(!prefs.is_empty());
        assert!(prefs.iter().all(|p| p.sentiment == Sentiment::Negative));
    }

    #[test]
    fn preferences_categories() {
        for (msg, expected) in [
            ("J'adore la pizza", "food"),
            ("J'aime le rock", "music"),
            ("Je préfère le bleu", "color"),
            ("J'aime la programmation", "work"),
        ] {
            let prefs = extractor().extract_preferences(msg, TS);
            assert!(
                prefs.iter().any(|p| p.category == expected),
                "{msg:?} should yield {expected}"
            );
        }
    }

    #[test]
    fn one_preference_per_clause() {
        let jazz = extractor().extract_preferences("J'aime la musique jazz", TS);
        assert_eq!(jazz.len(), 1);
        assert_eq!(jazz[0].category, "hobby");
        assert_eq!(jazz[0].subject, "musique");

        let rock = extractor().extract_preferences("J'adore le rock en voyage", TS);
        assert_eq!(rock.len(), 1);
        assert_eq!(rock[0].category, "hobby");
        assert_eq!(rock[0].subject, "voyage");
    }

    #[test]
    fn preferences_intensity() {
        let strong = extractor().extract_preferences("J'adore vraiment le chocolat !", TS);
        assert_eq!(strong.len(), 1);
        assert!((strong[0].intensity - 0.7).abs() < f64::EPSILON);

        let mild = extractor().extract_preferences("J'aime le chocolat", TS);
        assert!((mild[0].intensity - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn preferences_split_by_clause() {
        let prefs = extractor().extract_preferences("J'adore la pizza et je déteste les brocolis.", TS);
        assert_eq!(prefs.len(), 2);

        assert_eq!(prefs[0].category, "food");
        assert_eq!(prefs[0].subject, "pizza");
        assert_eq!(prefs[0].sentiment, Sentiment::Positive);

        assert_eq!(prefs[1].category, "food");
        assert_eq!(prefs[1].subject, "brocoli");
        assert_eq!(prefs[1].sentiment, Sentiment::Negative);

        assert!(prefs.iter().all(|p| p.intensity >= 0.6));
    }

    #[test]
    fn preference_sentiment_carries_across_et_but_not_mais() {
        let carried = extractor().extract_preferences("J'aime la pizza et les burgers.", TS);
        assert_eq!(carried.len(), 2);
        assert!(carried.iter().all(|p| p.sentiment == Sentiment::Positive));

        let contrast = extractor().extract_preferences("J'aime la pizza mais pas les burgers.", TS);
        assert_eq!(contrast.len(), 1);
        assert_eq!(contrast[0].subject, "pizza");
    }

    #[test]
    fn preferences_require_sentiment_and_category() {
        assert!(extractor().extract_preferences("La pizza est chaude.", TS).is_empty());
        assert!(extractor().extract_preferences("J'adore ça.", TS).is_empty());
    }

    #[test]
    fn keywords_do_not_match_inside_words() {
        // "aime" must not fire inside "aimerais".
        assert!(extractor().extract_preferences("J'aimerais une pizza.", TS).is_empty());
    }

    // --- events ---

    #[test]
    fn events_past() {
        let events = extractor().extract_events("Hier j'ai terminé le projet avec l'équipe.", TS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::PastAction);
        assert_eq!(events[0].status, crate::types::EventStatus::Completed);
        assert_eq!(events[0].time_reference.as_deref(), Some("Hier"));
    }

    #[test]
    fn events_current() {
        let events = extractor().extract_events("Je travaille actuellement sur une nouvelle fonctionnalité.", TS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::CurrentProject);
        assert_eq!(events[0].status, crate::types::EventStatus::Ongoing);
    }

    #[test]
    fn events_future() {
        let events = extractor().extract_events("Je veux apprendre le machine learning l'année prochaine.", TS);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::FutureGoal);
        assert_eq!(events[0].status, crate::types::EventStatus::Planned);
    }

    #[test]
    fn events_participants_and_location() {
        let events = extractor().extract_events("J'ai rencontré Alice et Bob à Lyon pour discuter du projet.", TS);
        assert_eq!(events[0].participants, vec!["Alice", "Bob"]);
        assert_eq!(events[0].location.as_deref(), Some("Lyon"));
    }

    #[test]
    fn event_description_is_truncated() {
        let long = format!("Hier j'ai {}", "marché ".repeat(40));
        let events = extractor().extract_events(&long, TS);
        assert_eq!(events[0].description.chars().count(), 103);
        assert!(events[0].description.ends_with("..."));
    }

    // --- relationships ---

    #[test]
    fn relationships_family() {
        let rels = extractor().extract_relationships("Mon frère Pierre travaille à Paris.", TS);
        let family = rels.iter().find(|r| r.relation_type == "family").unwrap();
        assert_eq!(family.subject, "Mon");
        assert_eq!(family.object, "Pierre");
        let work = rels.iter().find(|r| r.relation_type == "works_at").unwrap();
        assert_eq!(work.subject, "Pierre");
        assert_eq!(work.object, "Paris");
        assert!(rels.iter().all(|r| (r.confidence - 0.7).abs() < f64::EPSILON));
    }

    #[test]
    fn relationships_work() {
        let rels = extractor().extract_relationships("Marie travaille chez Google.", TS);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relation_type, "works_at");
        assert_eq!(rels[0].subject, "Marie");
        assert_eq!(rels[0].object, "Google");
    }

    #[test]
    fn relationship_at_message_edge_is_discarded() {
        assert!(extractor().extract_relationships("frère", TS).is_empty());
        assert!(extractor().extract_relationships("C'est mon frère", TS).is_empty());
    }

    #[test]
    fn relationship_tries_next_keyword_after_edge_match() {
        // "ami" opens the message, "copine" sits between two words.
        let rels = extractor().extract_relationships("Ami de longue date, ma copine Julie habite ici.", TS);
        let friend = rels.iter().find(|r| r.relation_type == "friend").unwrap();
        assert_eq!(friend.subject, "ma");
        assert_eq!(friend.object, "Julie");
    }

    // --- whole message ---

    #[test]
    fn extract_comprehensive() {
        let facts = extractor().extract(
            "Hier j'ai rencontré Marie à Paris. Elle m'a dit qu'elle adore la programmation Python. \
             Nous avons discuté de notre projet actuel.",
        );
        assert!(!facts.entities.is_empty());
        assert!(!facts.preferences.is_empty());
        assert!(!facts.events.is_empty());
        assert!(facts.len() > 0);
    }

    #[test]
    fn extract_empty_message() {
        assert!(extractor().extract("").is_empty());
        assert!(extractor().extract("   \n\t").is_empty());
    }

    #[test]
    fn extract_no_keywords() {
        let facts = extractor().extract_at("voilà.", TS);
        assert!(facts.is_empty());
    }

    #[test]
    fn extract_is_deterministic() {
        let msg = "Mon ami Paul adore le jazz et habite à Nantes.";
        assert_eq!(extractor().extract_at(msg, TS), extractor().extract_at(msg, TS));
    }

    #[test]
    fn extract_unicode_and_special_characters() {
        let facts = extractor().extract_at("😀 J'adore le café ☕ à Zürich !!! @#$%^&*() 日本語", TS);
        assert!(facts.entities.iter().any(|e| e.value == "Zürich"));
        let facts = extractor().extract_at("Привет мир, 你好", TS);
        assert!(facts.preferences.is_empty());
    }

    #[test]
    fn extract_very_long_message() {
        let msg = "J'adore la pizza. ".repeat(5_000);
        let facts = extractor().extract_at(&msg, TS);
        assert_eq!(facts.preferences.len(), 5_000);
    }

    proptest! {
        #[test]
        fn extraction_never_panics(msg in "\\PC{0,200}") {
            let facts = extractor().extract_at(&msg, TS);
            for entity in &facts.entities {
                prop_assert!((0.0..=1.0).contains(&entity.confidence));
            }
        }
    }
}
