//! Text renderings of a session: a two-column terminal transcript and a
//! markdown export.

use chrono::Local;

use crate::session::{Message, Role, Session};

const GUTTER: usize = 2;

/// Two equal columns: user messages on the left, assistant on the right.
pub fn terminal(session: &Session, width: usize) -> String {
    let mut out = String::new();

    if let Some(image) = session.current_image() {
        out.push_str(&format!(
            "[image] {} ({}x{}, {})\n\n",
            image.name,
            image.width,
            image.height,
            image.media_type()
        ));
    }

    out.push_str("### Chat History\n");
    out.push_str(&messages(session.conversation(), width));
    out
}

/// Lay out `messages` in two columns without the session header.
pub fn messages(messages: &[Message], width: usize) -> String {
    let width = width.max(20);
    let column = (width - GUTTER) / 2;
    let mut out = String::new();

    for message in messages {
        out.push('\n');
        let (header, indent) = match message.role {
            Role::User => ("📝 User", 0),
            Role::Assistant => ("🤖 Assistant", column + GUTTER),
        };
        let pad = " ".repeat(indent);
        out.push_str(&format!("{}{}\n", pad, header));
        for line in wrap(&message.content, column) {
            out.push_str(&pad);
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}

pub fn markdown(session: &Session) -> String {
    let mut out = format!(
        "# Chat with Gemini Vision\n\n_Exported {}_\n\n",
        Local::now().format("%Y-%m-%d %H:%M")
    );
    if let Some(image) = session.current_image() {
        out.push_str(&format!("Image: `{}`\n\n", image.name));
    }
    for message in session.conversation() {
        let who = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        out.push_str(&format!("**{}:**\n\n{}\n\n", who, message.content));
    }
    out
}

/// Greedy word wrap by character count. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut line_len = 0;

        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > width {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let rest = chars.split_off(width);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }
            let word_len = chars.len();
            let needed = if line_len == 0 { word_len } else { line_len + 1 + word_len };
            if needed > width {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.extend(chars);
            line_len += word_len;
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{tests::png_bytes, UploadedImage};

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("a cat on a mat", 5), vec!["a cat", "on a", "mat"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("one\n\ntwo", 10), vec!["one", "", "two"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn test_terminal_columns() {
        let mut session = Session::new();
        session.set_image(Some(UploadedImage::from_bytes("cat.png", png_bytes(8, 6)).unwrap()));
        session.append_message(Message::user("What is in this image?"));
        session.append_message(Message::assistant("A cat."));

        let out = terminal(&session, 60);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "[image] cat.png (8x6, image/png)");
        assert!(lines.contains(&"📝 User"));
        assert!(lines.contains(&"What is in this image?"));
        // Assistant column starts after the left column and gutter
        let indent = " ".repeat(31);
        assert!(lines.contains(&format!("{}🤖 Assistant", indent).as_str()));
        assert!(lines.contains(&format!("{}A cat.", indent).as_str()));

        let user_at = out.find("📝 User").unwrap();
        let assistant_at = out.find("🤖 Assistant").unwrap();
        assert!(user_at < assistant_at);
    }

    #[test]
    fn test_markdown_export() {
        let mut session = Session::new();
        session.append_message(Message::user("Describe"));
        session.append_message(Message::assistant("A dog."));
        let md = markdown(&session);
        assert!(md.starts_with("# Chat with Gemini Vision"));
        assert!(md.contains("**User:**\n\nDescribe"));
        assert!(md.contains("**Assistant:**\n\nA dog."));
    }
}
