use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::StoreError;
use crate::timeparse::TimeParser;

const ACTION_SENTINEL: &str = "[ACTION:";
const ACTION_FAILED_REPLY: &str = "⚠️ I tried to perform that action but something went wrong.";

/// Result of inspecting one raw completion. The model is untrusted input:
/// anything that is not an exactly well-formed directive is passed through as
/// conversational text instead of being guessed at.
#[derive(Debug, PartialEq, Eq)]
pub enum ParsedCompletion {
    /// No directive; the text is the reply, verbatim.
    Plain(String),
    Note {
        title: String,
        content: String,
    },
    Event {
        title: String,
        time_expr: String,
    },
    /// Started like a directive but violated the grammar. Discarded without
    /// side effects; the raw text becomes the reply.
    Malformed {
        raw: String,
        reason: &'static str,
    },
}

/// Parses the directive micro-grammar:
/// `[ACTION:NOTE|<title>|<content>]` or `[ACTION:EVENT|<title>|<time>]`.
///
/// The grammar has no delimiter escaping, so a literal `|` or a missing `]`
/// makes a directive unrecoverable; those parse as Malformed rather than
/// silently truncating a field.
pub fn parse_completion(text: &str) -> ParsedCompletion {
    let text = text.trim();
    if !text.starts_with(ACTION_SENTINEL) {
        return ParsedCompletion::Plain(text.to_string());
    }

    let malformed = |reason| ParsedCompletion::Malformed {
        raw: text.to_string(),
        reason,
    };

    let Some(body) = text[1..].strip_suffix(']') else {
        return malformed("missing closing bracket");
    };

    let parts: Vec<&str> = body.split('|').collect();

    let mut head = parts[0].split(':');
    let kind = match (head.next(), head.next(), head.next()) {
        (Some("ACTION"), Some(kind), None) => kind,
        _ => return malformed("malformed action header"),
    };

    match kind {
        "NOTE" => match parts.len() {
            3 => ParsedCompletion::Note {
                title: parts[1].to_string(),
                content: parts[2].to_string(),
            },
            0..=2 => malformed("NOTE directive is missing fields"),
            _ => malformed("unescaped delimiter in NOTE field"),
        },
        "EVENT" => match parts.len() {
            3 => ParsedCompletion::Event {
                title: parts[1].to_string(),
                time_expr: parts[2].to_string(),
            },
            0..=2 => malformed("EVENT directive is missing fields"),
            _ => malformed("unescaped delimiter in EVENT field"),
        },
        _ => malformed("unknown action kind"),
    }
}

/// Write operations a directive may trigger. Implemented by the store
/// gateway; test doubles record instead of writing.
#[async_trait]
pub trait DirectiveSink: Send + Sync {
    async fn create_note(
        &self,
        user_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<(), StoreError>;

    async fn create_event(
        &self,
        user_id: Uuid,
        title: &str,
        description: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Turns one raw completion into the user-facing reply, committing at most
/// one store write. Failures past this point never escape as errors: the
/// caller always gets a reply string.
pub async fn dispatch_completion(
    text: &str,
    user_id: Uuid,
    sink: &dyn DirectiveSink,
    time_parser: &dyn TimeParser,
    now: DateTime<Utc>,
) -> String {
    match parse_completion(text) {
        ParsedCompletion::Plain(reply) => reply,

        ParsedCompletion::Malformed { raw, reason } => {
            log::warn!("Discarding malformed action directive: {}", reason);
            raw
        }

        ParsedCompletion::Note { title, content } => {
            match sink.create_note(user_id, &title, &content).await {
                Ok(()) => format!("✅ I've created the note: '{}'.", title),
                Err(e) => {
                    log::debug!("Action failed: {}", e);
                    ACTION_FAILED_REPLY.to_string()
                }
            }
        }

        ParsedCompletion::Event { title, time_expr } => {
            let Some(start) = time_parser.parse(&time_expr, now) else {
                return format!(
                    "⚠️ I understood you wanted an event, but I couldn't understand the time '{}'.",
                    time_expr
                );
            };

            // Fixed one-hour duration; no conflict detection against
            // existing events.
            let end = start + chrono::Duration::hours(1);
            let description = format!("Scheduled via AI: {}", time_expr);

            match sink
                .create_event(user_id, &title, &description, start, end)
                .await
            {
                Ok(()) => format!(
                    "✅ Scheduled '{}' for {}.",
                    title,
                    start.format("%b %d at %I:%M %p")
                ),
                Err(e) => {
                    log::debug!("Action failed: {}", e);
                    ACTION_FAILED_REPLY.to_string()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[test]
    fn plain_text_round_trips() {
        let reply = "Sure, here's a summary of your notes.";
        assert_eq!(
            parse_completion(reply),
            ParsedCompletion::Plain(reply.to_string())
        );
        // Surrounding whitespace is stripped, matching the reply contract.
        assert_eq!(
            parse_completion("  hello \n"),
            ParsedCompletion::Plain("hello".to_string())
        );
    }

    #[test]
    fn sentinel_mid_text_is_plain() {
        let reply = "You could send [ACTION:NOTE|a|b] to create a note.";
        assert_eq!(
            parse_completion(reply),
            ParsedCompletion::Plain(reply.to_string())
        );
    }

    #[test]
    fn well_formed_note_directive() {
        assert_eq!(
            parse_completion("[ACTION:NOTE|Groceries|Buy milk]"),
            ParsedCompletion::Note {
                title: "Groceries".to_string(),
                content: "Buy milk".to_string(),
            }
        );
    }

    #[test]
    fn well_formed_event_directive() {
        assert_eq!(
            parse_completion("[ACTION:EVENT|Standup|tomorrow at 9am]"),
            ParsedCompletion::Event {
                title: "Standup".to_string(),
                time_expr: "tomorrow at 9am".to_string(),
            }
        );
    }

    #[test]
    fn empty_fields_are_allowed() {
        assert_eq!(
            parse_completion("[ACTION:NOTE||]"),
            ParsedCompletion::Note {
                title: String::new(),
                content: String::new(),
            }
        );
    }

    fn assert_malformed(text: &str, expected_reason: &str) {
        match parse_completion(text) {
            ParsedCompletion::Malformed { raw, reason } => {
                assert_eq!(raw, text);
                assert_eq!(reason, expected_reason);
            }
            other => panic!("expected Malformed for {:?}, got {:?}", text, other),
        }
    }

    #[test]
    fn structural_violations_are_malformed() {
        assert_malformed("[ACTION:NOTE|OnlyTitle]", "NOTE directive is missing fields");
        assert_malformed(
            "[ACTION:NOTE|Title|a|b]",
            "unescaped delimiter in NOTE field",
        );
        assert_malformed("[ACTION:EVENT|Standup]", "EVENT directive is missing fields");
        assert_malformed("[ACTION:NOTE|a|b", "missing closing bracket");
        assert_malformed("[ACTION:DELETE|x|y]", "unknown action kind");
        // Kind comparison is case-sensitive.
        assert_malformed("[ACTION:note|a|b]", "unknown action kind");
        assert_malformed("[ACTION:NOTE:extra|a|b]", "malformed action header");
    }

    #[derive(Default)]
    struct RecordingSink {
        fail: bool,
        notes: Mutex<Vec<(Uuid, String, String)>>,
        events: Mutex<Vec<(Uuid, String, String, DateTime<Utc>, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl DirectiveSink for RecordingSink {
        async fn create_note(
            &self,
            user_id: Uuid,
            title: &str,
            content: &str,
        ) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::EmptyResponse);
            }
            self.notes
                .lock()
                .unwrap()
                .push((user_id, title.to_string(), content.to_string()));
            Ok(())
        }

        async fn create_event(
            &self,
            user_id: Uuid,
            title: &str,
            description: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::EmptyResponse);
            }
            self.events.lock().unwrap().push((
                user_id,
                title.to_string(),
                description.to_string(),
                start,
                end,
            ));
            Ok(())
        }
    }

    struct FixedTimeParser(Option<DateTime<Utc>>);

    impl TimeParser for FixedTimeParser {
        fn parse(&self, _expr: &str, _now: DateTime<Utc>) -> Option<DateTime<Utc>> {
            self.0
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap()
    }

    fn user() -> Uuid {
        Uuid::parse_str("6e9fefb2-29d6-4648-9a3a-93db4e9e6ef9").unwrap()
    }

    #[tokio::test]
    async fn note_directive_creates_one_note() {
        let sink = RecordingSink::default();
        let parser = FixedTimeParser(None);

        let reply = dispatch_completion(
            "[ACTION:NOTE|Groceries|Buy milk]",
            user(),
            &sink,
            &parser,
            now(),
        )
        .await;

        assert!(reply.contains("Groceries"));
        let notes = sink.notes.lock().unwrap();
        assert_eq!(
            *notes,
            vec![(user(), "Groceries".to_string(), "Buy milk".to_string())]
        );
    }

    #[tokio::test]
    async fn event_directive_schedules_one_hour() {
        let sink = RecordingSink::default();
        let start = Utc.with_ymd_and_hms(2026, 8, 8, 9, 0, 0).unwrap();
        let parser = FixedTimeParser(Some(start));

        let reply = dispatch_completion(
            "[ACTION:EVENT|Standup|tomorrow at 9am]",
            user(),
            &sink,
            &parser,
            now(),
        )
        .await;

        assert_eq!(reply, "✅ Scheduled 'Standup' for Aug 08 at 09:00 AM.");
        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        let (owner, title, description, got_start, got_end) = &events[0];
        assert_eq!(*owner, user());
        assert_eq!(title, "Standup");
        assert_eq!(description, "Scheduled via AI: tomorrow at 9am");
        assert_eq!(*got_start, start);
        assert_eq!(*got_end, start + chrono::Duration::hours(1));
    }

    #[tokio::test]
    async fn unparseable_time_writes_nothing() {
        let sink = RecordingSink::default();
        let parser = FixedTimeParser(None);

        let reply = dispatch_completion(
            "[ACTION:EVENT|Standup|zzzznotatime]",
            user(),
            &sink,
            &parser,
            now(),
        )
        .await;

        assert!(reply.contains("couldn't understand the time 'zzzznotatime'"));
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_directive_writes_nothing() {
        let sink = RecordingSink::default();
        let parser = FixedTimeParser(None);

        let reply = dispatch_completion(
            "[ACTION:NOTE|OnlyTitle]",
            user(),
            &sink,
            &parser,
            now(),
        )
        .await;

        assert_eq!(reply, "[ACTION:NOTE|OnlyTitle]");
        assert!(sink.notes.lock().unwrap().is_empty());
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sink_failure_degrades_to_apology() {
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let parser = FixedTimeParser(None);

        let reply = dispatch_completion(
            "[ACTION:NOTE|Groceries|Buy milk]",
            user(),
            &sink,
            &parser,
            now(),
        )
        .await;

        assert_eq!(reply, ACTION_FAILED_REPLY);
    }

    #[tokio::test]
    async fn plain_reply_passes_through_untouched() {
        let sink = RecordingSink::default();
        let parser = FixedTimeParser(None);

        let reply =
            dispatch_completion("Here's what I found.", user(), &sink, &parser, now()).await;

        assert_eq!(reply, "Here's what I found.");
        assert!(sink.notes.lock().unwrap().is_empty());
        assert!(sink.events.lock().unwrap().is_empty());
    }
}
