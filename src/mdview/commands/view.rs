//! Read-only actions on the open document: rendering, find, copying code
//! blocks and producing share links.

use crate::clipboard::Clipboard;
use crate::commands::{CmdMessage, CmdResult};
use crate::find::FindState;
use crate::render;
use crate::session::Session;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub fn render(session: &Session) -> CmdResult {
    let rendered = render::render(session.text(), None);
    let mut result = CmdResult::default();
    if rendered.fallback {
        result.add_message(CmdMessage::warning(
            "Could not render markdown, showing plain text",
        ));
    }
    result.with_rendered(rendered)
}

/// Render with every hit of `keyword` highlighted and move `state` to the
/// first one. A blank keyword clears the search and renders plainly.
pub fn find(session: &Session, keyword: &str, state: &mut FindState) -> CmdResult {
    let rendered = render::render(session.text(), Some(keyword));
    state.apply(keyword, rendered.hits);

    let message = match (state.keyword(), rendered.hits) {
        (None, _) => CmdMessage::info("Find cleared"),
        (Some(k), 0) => CmdMessage::warning(format!("Find: no results for '{}'", k)),
        (Some(_), 1) => CmdMessage::success("Find: 1 match"),
        (Some(_), n) => CmdMessage::success(format!("Find: {} matches", n)),
    };
    CmdResult::default()
        .with_rendered(rendered)
        .with_message(message)
}

/// Copy the `number`th code block (1-based). When the clipboard refuses,
/// the text is handed back for copying by hand.
pub fn copy_code_block<C: Clipboard>(
    session: &Session,
    number: usize,
    clipboard: &mut C,
) -> CmdResult {
    let rendered = render::render(session.text(), None);
    let count = rendered.code_blocks.len();
    let Some(block) = number
        .checked_sub(1)
        .and_then(|i| rendered.code_blocks.get(i))
    else {
        return CmdResult::default().with_message(CmdMessage::error(format!(
            "No code block {} (document has {})",
            number, count
        )));
    };
    copy_or_hand_back(clipboard, &block.text, "Code block copied")
}

/// A link that reopens the current remote document: `<base>#<encoded url>`.
/// Only documents loaded from a URL can be shared.
pub fn share_link<C: Clipboard>(session: &Session, base: &str, clipboard: &mut C) -> CmdResult {
    let Some(url) = session.source().url() else {
        return CmdResult::default().with_message(CmdMessage::error(
            "Only documents opened from a URL have a share link",
        ));
    };
    let base = base.split('#').next().unwrap_or_default();
    let link = format!("{}#{}", base, encode_component(url));
    let mut result = copy_or_hand_back(clipboard, &link, "Share link copied");
    result.link = Some(link);
    result
}

fn copy_or_hand_back<C: Clipboard>(clipboard: &mut C, text: &str, done: &str) -> CmdResult {
    match clipboard.copy(text) {
        Ok(()) => CmdResult::default().with_message(CmdMessage::success(done)),
        Err(e) => {
            let mut result = CmdResult::default().with_message(CmdMessage::warning(format!(
                "Clipboard unavailable ({}), copy the text below",
                e
            )));
            result.manual_copy = Some(text.to_string());
            result
        }
    }
}

/// Everything outside `A-Z a-z 0-9 - _ . ! ~ * ' ( )` gets percent-encoded,
/// the same set a browser's `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::testing::MemoryClipboard;
    use crate::commands::MessageLevel;
    use crate::model::DocumentSource;
    use crate::session::LoadedDocument;

    fn session(text: &str, source: DocumentSource) -> Session {
        let mut s = Session::new();
        s.replace(LoadedDocument {
            text: text.to_string(),
            source,
            display_name: None,
            descriptor: "pasted".to_string(),
        });
        s
    }

    #[test]
    fn render_returns_body_and_toc() {
        let s = session("# Title\n\nbody", DocumentSource::Unsourced);
        let result = render(&s);
        let rendered = result.rendered.unwrap();
        assert!(rendered.html.contains("<h1 id=\"title\">"));
        assert_eq!(rendered.toc.len(), 1);
        assert!(result.messages.is_empty());
    }

    #[test]
    fn find_counts_and_reports() {
        let s = session("cat Cat CAT", DocumentSource::Unsourced);
        let mut state = FindState::default();
        let result = find(&s, "cat", &mut state);
        assert_eq!(result.rendered.unwrap().hits, 3);
        assert_eq!(result.messages[0].content, "Find: 3 matches");
        assert_eq!(state.current(), Some(0));
    }

    #[test]
    fn find_without_hits_warns() {
        let s = session("nothing here", DocumentSource::Unsourced);
        let mut state = FindState::default();
        let result = find(&s, "zebra", &mut state);
        assert_eq!(result.messages[0].level, MessageLevel::Warning);
        assert_eq!(state.current(), None);
    }

    #[test]
    fn blank_find_clears_previous_search() {
        let s = session("cat", DocumentSource::Unsourced);
        let mut state = FindState::default();
        find(&s, "cat", &mut state);
        let result = find(&s, " ", &mut state);
        assert_eq!(result.messages[0].content, "Find cleared");
        assert!(!result.rendered.unwrap().html.contains("<mark>"));
        assert_eq!(state.keyword(), None);
    }

    #[test]
    fn copies_selected_code_block() {
        let s = session("```\none\n```\n\n```\ntwo\n```", DocumentSource::Unsourced);
        let mut clip = MemoryClipboard::default();
        let result = copy_code_block(&s, 2, &mut clip);
        assert!(!result.has_errors());
        assert_eq!(clip.copied, vec!["two\n".to_string()]);
    }

    #[test]
    fn clipboard_failure_hands_text_back() {
        let s = session("```\none\n```", DocumentSource::Unsourced);
        let mut clip = MemoryClipboard {
            fail: true,
            ..Default::default()
        };
        let result = copy_code_block(&s, 1, &mut clip);
        assert_eq!(result.manual_copy.as_deref(), Some("one\n"));
        assert_eq!(result.messages[0].level, MessageLevel::Warning);
    }

    #[test]
    fn out_of_range_code_block_is_an_error() {
        let s = session("no code", DocumentSource::Unsourced);
        let mut clip = MemoryClipboard::default();
        assert!(copy_code_block(&s, 1, &mut clip).has_errors());
        assert!(copy_code_block(&s, 0, &mut clip).has_errors());
    }

    #[test]
    fn share_link_encodes_url() {
        let s = session(
            "x",
            DocumentSource::Remote {
                url: "https://example.org/a b.md?x=1&y=2".to_string(),
            },
        );
        let mut clip = MemoryClipboard::default();
        let result = share_link(&s, "https://viewer.example/index.html#old", &mut clip);
        let expected =
            "https://viewer.example/index.html#https%3A%2F%2Fexample.org%2Fa%20b.md%3Fx%3D1%26y%3D2";
        assert_eq!(result.link.as_deref(), Some(expected));
        assert_eq!(clip.copied, vec![expected.to_string()]);
    }

    #[test]
    fn share_link_needs_a_url_source() {
        let s = session(
            "x",
            DocumentSource::LocalReadOnly {
                file_name: "a.md".to_string(),
            },
        );
        let mut clip = MemoryClipboard::default();
        let result = share_link(&s, "https://viewer.example/", &mut clip);
        assert!(result.has_errors());
        assert!(result.link.is_none());
        assert!(clip.copied.is_empty());
    }

    #[test]
    fn encode_component_keeps_unreserved() {
        assert_eq!(encode_component("a-b_c.d!~*'()"), "a-b_c.d!~*'()");
        assert_eq!(encode_component("é"), "%C3%A9");
        assert_eq!(
            encode_component("https://a.org/x y.md?v=1&w=#top"),
            "https%3A%2F%2Fa.org%2Fx%20y.md%3Fv%3D1%26w%3D%23top"
        );
    }
}
