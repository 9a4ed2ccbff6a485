use serde_json::{json, Value};

use techquest_backend::progression::types::{ContentItem, Difficulty};
use techquest_backend::store::Store;

pub fn content_item(id: &str, title: &str, category: &str, source: &str) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        tags: Default::default(),
        difficulty: Difficulty::Beginner,
        source: source.to_string(),
        description: None,
        url: None,
    }
}

/// Ten items across categories; exactly one mentions "Rust".
pub fn sample_catalog() -> Vec<ContentItem> {
    vec![
        content_item("c1", "React Server Components", "Web Development", "reddit"),
        content_item("c2", "Intro to Transformers", "AI", "hackernews"),
        content_item("c3", "Kubernetes Operators", "DevOps", "hackernews"),
        content_item("c4", "Ownership in Rust", "Systems", "reddit"),
        content_item("c5", "CSS Container Queries", "Web Development", "producthunt"),
        content_item("c6", "Vector Databases", "Data", "producthunt"),
        content_item("c7", "Passkeys and WebAuthn", "Security", "hackernews"),
        content_item("c8", "Edge Functions", "Cloud", "reddit"),
        content_item("c9", "Prompt Engineering", "AI", "reddit"),
        content_item("c10", "WebAssembly Outside the Browser", "Runtime", "hackernews"),
    ]
}

pub fn sample_catalog_json() -> Value {
    json!(sample_catalog())
}

pub fn seed_catalog(store: &Store) -> Vec<ContentItem> {
    let items = sample_catalog();
    store.replace_catalog(&items).expect("seed catalog");
    items
}

pub fn quiz(id: &str, correct: u32, total: u32) -> Value {
    json!({
        "quizId": id,
        "correctAnswers": correct,
        "totalQuestions": total,
    })
}

pub fn flashcard(id: &str) -> Value {
    json!({ "flashcardId": id })
}
