//! Goal-to-tag matching for the advisory chat.
//!
//! Every goal owns one product tag and a set of trigger keywords. Free text
//! is tokenised and matched against the keywords; the resulting tags drive
//! product filtering. Replies without an LLM are rendered from templates.

use std::collections::HashSet;

/// Appended to every template reply.
pub const DISCLAIMER: &str =
    "These suggestions are not medical advice. Please consult a healthcare professional \
     before starting any new supplement.";

/// Default number of recommended products.
pub const DEFAULT_RECOMMENDATION_LIMIT: i64 = 6;

/// Upper bound on recommended products per request.
pub const MAX_RECOMMENDATION_LIMIT: i64 = 20;

/// Longest accepted chat message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A wellness goal and the words that signal it.
#[derive(Debug)]
pub struct Goal {
    /// Short goal name a client may send directly (e.g. `"sleep"`).
    pub name: &'static str,
    /// Product tag the goal maps to.
    pub tag: &'static str,
    /// Human phrase used in replies.
    pub label: &'static str,
    /// Lowercase keywords; entries containing a space match as phrases.
    pub keywords: &'static [&'static str],
}

/// The goal table, in the order tags are reported.
pub const GOALS: &[Goal] = &[
    Goal {
        name: "sleep",
        tag: "sleep",
        label: "better sleep",
        keywords: &["sleep", "sleeping", "insomnia", "melatonin", "restless", "bedtime", "fall asleep"],
    },
    Goal {
        name: "energy",
        tag: "energy",
        label: "more energy",
        keywords: &["energy", "tired", "fatigue", "fatigued", "exhausted", "stamina", "vitality"],
    },
    Goal {
        name: "immunity",
        tag: "immunity",
        label: "immune support",
        keywords: &["immune", "immunity", "cold", "colds", "flu", "sick", "immune system"],
    },
    Goal {
        name: "muscle",
        tag: "muscle",
        label: "muscle and recovery",
        keywords: &["muscle", "muscles", "protein", "gym", "workout", "strength", "recovery", "build muscle"],
    },
    Goal {
        name: "joints",
        tag: "joints",
        label: "joint comfort",
        keywords: &["joint", "joints", "knee", "knees", "arthritis", "stiffness", "cartilage"],
    },
    Goal {
        name: "stress",
        tag: "stress",
        label: "stress relief",
        keywords: &["stress", "stressed", "anxiety", "anxious", "calm", "relax", "relaxation"],
    },
    Goal {
        name: "focus",
        tag: "focus",
        label: "focus and memory",
        keywords: &["focus", "concentration", "concentrate", "memory", "brain", "cognitive", "brain fog"],
    },
    Goal {
        name: "heart",
        tag: "heart-health",
        label: "heart health",
        keywords: &["heart", "cholesterol", "cardiovascular", "omega", "blood pressure"],
    },
    Goal {
        name: "digestion",
        tag: "digestion",
        label: "digestive health",
        keywords: &["digestion", "digestive", "gut", "bloating", "probiotic", "probiotics", "stomach"],
    },
    Goal {
        name: "skin",
        tag: "skin-hair-nails",
        label: "skin, hair and nails",
        keywords: &["skin", "hair", "nails", "collagen", "wrinkles", "acne"],
    },
    Goal {
        name: "weight",
        tag: "weight-management",
        label: "weight management",
        keywords: &["weight", "metabolism", "appetite", "slimming", "lose weight"],
    },
    Goal {
        name: "bones",
        tag: "bone-health",
        label: "bone health",
        keywords: &["bone", "bones", "calcium", "osteoporosis"],
    },
];

/// Lowercase words of `text`, split on anything that is not alphanumeric.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn goal_matches(goal: &Goal, words: &HashSet<&str>, phrase_text: &str) -> bool {
    goal.keywords.iter().any(|kw| {
        if kw.contains(' ') {
            phrase_text.contains(&format!(" {kw} "))
        } else {
            words.contains(kw)
        }
    })
}

/// Extract product tags from free text, in goal-table order.
pub fn extract_tags(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Vec::new();
    }
    let words: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    let phrase_text = format!(" {} ", tokens.join(" "));

    GOALS
        .iter()
        .filter(|goal| goal_matches(goal, &words, &phrase_text))
        .map(|goal| goal.tag.to_string())
        .collect()
}

/// Map explicitly selected goals to tags.
///
/// Each entry may be a goal name, a tag, or free text; free text falls back
/// to keyword extraction. Duplicates are dropped, first occurrence wins.
pub fn tags_for_goals(goals: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in goals {
        let goal_text = raw.trim().to_lowercase();
        let direct = GOALS
            .iter()
            .find(|g| g.name == goal_text || g.tag == goal_text)
            .map(|g| vec![g.tag.to_string()]);
        for tag in direct.unwrap_or_else(|| extract_tags(&goal_text)) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

/// Merge `new` tags into `existing`, keeping order and uniqueness.
pub fn merge_tags(existing: &[String], new: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();
    for tag in new {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Human label for a tag, or the tag itself when unknown.
pub fn label_for_tag(tag: &str) -> &str {
    GOALS
        .iter()
        .find(|g| g.tag == tag)
        .map_or(tag, |g| g.label)
}

fn join_human(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

/// Template reply for a recommendation.
pub fn recommendation_message(tags: &[String], product_names: &[String]) -> String {
    if tags.is_empty() {
        return format!(
            "I couldn't match that to a specific goal yet. Tell me what you'd like to \
             improve, for example sleep, energy, immunity or focus. {DISCLAIMER}"
        );
    }

    let labels: Vec<&str> = tags.iter().map(|t| label_for_tag(t)).collect();
    let interest = join_human(&labels);

    if product_names.is_empty() {
        return format!(
            "Based on your interest in {interest}, we don't have matching products in stock \
             right now. Please check back soon. {DISCLAIMER}"
        );
    }

    let names: Vec<&str> = product_names.iter().map(String::as_str).collect();
    format!(
        "Based on your interest in {interest}, you might like: {}. {DISCLAIMER}",
        names.join(", ")
    )
}

/// System prompt sent to the LLM for advisory chat.
pub fn system_prompt(tags: &[String], product_names: &[String]) -> String {
    let mut prompt = String::from(
        "You are a friendly supplement advisor for an online health supplement store. \
         Answer in at most four short sentences. Suggest product categories rather than \
         doses, never diagnose conditions, and remind the customer to consult a \
         healthcare professional for medical concerns.",
    );
    if !tags.is_empty() {
        let labels: Vec<&str> = tags.iter().map(|t| label_for_tag(t)).collect();
        prompt.push_str(&format!(
            " The customer's goals appear to be: {}.",
            join_human(&labels)
        ));
    }
    if !product_names.is_empty() {
        prompt.push_str(&format!(
            " Products available in the store for these goals: {}. Only recommend products \
             from this list.",
            product_names.join(", ")
        ));
    }
    prompt
}
