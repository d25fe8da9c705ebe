use uuid::Uuid;

use crate::store::Store;

/// At most this many notes and this many events are injected per turn to keep
/// the prompt (which travels as a URL path segment) short.
const CONTEXT_ITEM_LIMIT: usize = 3;

pub const SYSTEM_INSTRUCTION: &str = "System: You are a helpful assistant. \
    To create a note, start reply with: [ACTION:NOTE|Title|Content]. \
    To create an event, start reply with: [ACTION:EVENT|Title|Time Description]. \
    Otherwise, just reply normally.";

/// Fetches the caller's recent notes and events and renders them as the
/// context block. A store failure degrades to an empty block rather than
/// failing the chat turn.
///
/// Events are deliberately unordered here; ordering is applied only on the
/// GET /events listing.
pub async fn assemble_context(store: &Store, user_id: Uuid) -> String {
    let notes = match store
        .select_by_owner("notes", user_id, "title,content", None, Some(CONTEXT_ITEM_LIMIT))
        .await
    {
        Ok(notes) => notes,
        Err(e) => {
            log::debug!("Error fetching notes context: {}", e);
            Vec::new()
        }
    };

    let events = match store
        .select_by_owner("events", user_id, "title,start_time", None, Some(CONTEXT_ITEM_LIMIT))
        .await
    {
        Ok(events) => events,
        Err(e) => {
            log::debug!("Error fetching events context: {}", e);
            Vec::new()
        }
    };

    render_context(&notes, &events)
}

fn field<'a>(row: &'a serde_json::Value, key: &str, fallback: &'a str) -> &'a str {
    row.get(key).and_then(|v| v.as_str()).unwrap_or(fallback)
}

pub fn render_context(notes: &[serde_json::Value], events: &[serde_json::Value]) -> String {
    let mut context = String::new();

    if !notes.is_empty() {
        context.push_str("User Notes:\n");
        for note in notes.iter().take(CONTEXT_ITEM_LIMIT) {
            let title = field(note, "title", "Untitled");
            let content = field(note, "content", "");
            context.push_str(&format!("- {}: {}\n", title, content));
        }
    }

    if !events.is_empty() {
        context.push_str("\nUpcoming Events:\n");
        for event in events.iter().take(CONTEXT_ITEM_LIMIT) {
            let title = field(event, "title", "Untitled");
            let start = field(event, "start_time", "Unknown time");
            context.push_str(&format!("- {} at {}\n", title, start));
        }
    }

    context
}

/// Deterministic concatenation of instruction, context and user message. User
/// content is not escaped against the instruction boundary; the directive
/// grammar is only as trustworthy as the model output it comes back in.
pub fn build_prompt(context: &str, message: &str) -> String {
    format!(
        "{}\nContext:\n{}\nUser: {}\nAssistant:",
        SYSTEM_INSTRUCTION, context, message
    )
}
