//! 消息格式化 - 将 (分类, 条目) 渲染为各渠道的消息文本
//!
//! 两种渲染都是一行一个字段：
//! ```text
//! 📣 New Latest Announcements!      （分类）
//! Exam Postponed                    （标题）
//! 🔗 /x                             （链接）
//! 🗓 2024-01-01                     （仅当日期和作者都存在）
//! 👤 Admin
//! ```

use super::channel::ChannelKind;
use crate::model::{Category, Item};
use crate::parser::clean_text;

/// 消息中使用的固定符号
pub mod msg {
    pub const TELEGRAM_MARKER: &str = "📣";
    pub const WHATSAPP_MARKER: &str = "📢";
    pub const LINK: &str = "🔗";
    pub const DATE: &str = "🗓";
    pub const AUTHOR: &str = "👤";
}

/// 等宽代码内只有反引号和反斜杠需要转义
fn escape_code(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '`' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 消息格式化器
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFormatter;

impl MessageFormatter {
    pub fn new() -> Self {
        Self
    }

    /// 按渠道类型渲染
    pub fn format(&self, category: Category, item: &Item, kind: ChannelKind) -> String {
        match kind {
            ChannelKind::Telegram => Self::format_telegram(category, item),
            ChannelKind::WhatsApp => Self::format_whatsapp(category, item),
        }
    }

    /// MarkdownV2：分类、标题、日期、作者都转义；链接放在等宽代码中，只转义反引号和反斜杠
    fn format_telegram(category: Category, item: &Item) -> String {
        let section = clean_text(category.label(), true);
        let title = clean_text(&item.title, true);

        let mut message = format!(
            "{} New {}\\!\n\n{}\n{} `{}`",
            msg::TELEGRAM_MARKER,
            section,
            title,
            msg::LINK,
            escape_code(&item.link)
        );
        if let Some((date, author)) = item.byline() {
            message.push_str(&format!(
                "\n{} {}\n{} {}",
                msg::DATE,
                clean_text(date, true),
                msg::AUTHOR,
                clean_text(author, true)
            ));
        }
        message
    }

    /// 纯文本
    fn format_whatsapp(category: Category, item: &Item) -> String {
        let mut message = format!(
            "{} New {} Alert!\n{}\n{} {}",
            msg::WHATSAPP_MARKER,
            category.label(),
            clean_text(&item.title, false),
            msg::LINK,
            item.link
        );
        if let Some((date, author)) = item.byline() {
            message.push_str(&format!(
                "\n{} {}\n{} {}",
                msg::DATE,
                clean_text(date, false),
                msg::AUTHOR,
                clean_text(author, false)
            ));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rich_item() -> Item {
        Item::new("Exam Postponed", "/x").with_byline("2024-01-01", "Admin")
    }

    #[test]
    fn test_whatsapp_rich_item() {
        let text = MessageFormatter::new().format(
            Category::LatestAnnouncements,
            &rich_item(),
            ChannelKind::WhatsApp,
        );
        assert_eq!(
            text,
            "📢 New Latest Announcements Alert!\nExam Postponed\n🔗 /x\n🗓 2024-01-01\n👤 Admin"
        );
    }

    #[test]
    fn test_telegram_rich_item_is_escaped() {
        let text = MessageFormatter::new().format(
            Category::LatestAnnouncements,
            &rich_item(),
            ChannelKind::Telegram,
        );
        assert_eq!(
            text,
            "📣 New Latest Announcements\\!\n\nExam Postponed\n🔗 `/x`\n🗓 2024\\-01\\-01\n👤 Admin"
        );
    }

    #[test]
    fn test_link_is_not_escaped() {
        let item = Item::new("Fee v2.0", "https://example.edu/a_b.pdf");
        let formatter = MessageFormatter::new();

        let telegram = formatter.format(Category::OfficeNotifications, &item, ChannelKind::Telegram);
        assert!(telegram.contains("Fee v2\\.0"));
        assert!(telegram.contains("`https://example.edu/a_b.pdf`"));

        let whatsapp = formatter.format(Category::OfficeNotifications, &item, ChannelKind::WhatsApp);
        assert!(whatsapp.contains("Fee v2.0"));
        assert!(whatsapp.contains("🔗 https://example.edu/a_b.pdf"));
    }

    #[test]
    fn test_link_code_span_escapes_backtick_and_backslash() {
        let item = Item::new("Circular", "https://example.edu/a`b\\c_d.pdf");
        let telegram =
            MessageFormatter::new().format(Category::OfficeNotifications, &item, ChannelKind::Telegram);
        assert!(telegram.ends_with("🔗 `https://example.edu/a\\`b\\\\c_d.pdf`"));
    }

    #[test]
    fn test_category_label_escaped_for_telegram() {
        let item = Item::new("Seminar", "/s");
        let text = MessageFormatter::new().format(Category::IeeeCsi, &item, ChannelKind::Telegram);
        assert!(text.starts_with("📣 New IEEE & CSI\\!"));
    }

    #[test]
    fn test_partial_byline_is_omitted() {
        let mut item = Item::new("Notice", "/n");
        item.author = Some("Admin".to_string());
        let formatter = MessageFormatter::new();

        for kind in [ChannelKind::Telegram, ChannelKind::WhatsApp] {
            let text = formatter.format(Category::LatestAnnouncements, &item, kind);
            assert!(!text.contains(msg::DATE), "{}", kind);
            assert!(!text.contains(msg::AUTHOR), "{}", kind);
            assert_eq!(text.lines().count(), if kind.is_markdown() { 4 } else { 3 });
        }
    }
}
