use std::io::{ self, Write };

use crate::history::view::{ ConversationsList, HISTORY_HEADING };
use crate::ui::layout::{ footer, navbar };

/// Prints the conversation list and, if `selected` is given, that
/// conversation's messages.
pub async fn run_history<W: Write>(
    view: &mut ConversationsList,
    selected: Option<&str>,
    out: &mut W
) -> io::Result<()> {
    navbar(out)?;
    writeln!(out, "{}", HISTORY_HEADING)?;

    view.load().await;
    let titles = view.titles().await;
    for (entry, title) in view.render_sidebar().iter().zip(&titles) {
        if *entry == title.title {
            writeln!(out, "  {}", entry)?;
        } else {
            writeln!(out, "  {}  {}", entry, title.title)?;
        }
    }
    writeln!(out)?;

    if let Some(id) = selected {
        view.select(id).await;
    }
    for line in view.render_main() {
        writeln!(out, "{}", line)?;
    }

    footer(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ HistoryStore, MemoryHistoryStore };
    use crate::models::chat::Message;
    use std::sync::Arc;

    #[tokio::test]
    async fn lists_titles_and_selected_messages() {
        let store = Arc::new(MemoryHistoryStore::new());
        store.insert_conversation("c1").await.unwrap();
        store.insert_message("c1", &Message::user("Plan a trip")).await.unwrap();
        store.insert_message("c1", &Message::assistant("Where to?")).await.unwrap();
        store.insert_conversation("c2").await.unwrap();

        let mut view = ConversationsList::new(store);
        let mut out = Vec::new();
        run_history(&mut view, Some("c1"), &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Your chat history:"));
        assert!(text.contains("  Conversation c1  Plan a trip\n"));
        assert!(text.contains("  Conversation c2\n"));
        assert!(text.contains("Messages for Conversation c1\nPlan a trip\nWhere to?\n"));
    }

    #[tokio::test]
    async fn without_selection_prompts_to_select() {
        let mut view = ConversationsList::new(Arc::new(MemoryHistoryStore::new()));
        let mut out = Vec::new();
        run_history(&mut view, None, &mut out).await.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Select a conversation to view messages."));
    }
}
