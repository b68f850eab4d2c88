//! 页面解析 - 从公告页面 HTML 中提取分类条目
//!
//! 页面结构：
//! ```text
//! <section class="block">
//!   <h2>Exam Notifications</h2>
//!   <div class="content"> <a href=...>...</a> | <li><a href=...>...</a></li> </div>
//! </section>
//! ```
//! `Latest announcements` 区块的条目是 `<li class="post">`，每条必须包含
//! 链接、`div.date` 和 `div.name`。

use crate::model::{Category, Item, ItemProfile, Snapshot};
use anyhow::{anyhow, Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// MarkdownV2 需要转义的字符
pub const MARKDOWN_CHARS: [char; 18] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// 文本规范化
///
/// 合并所有空白（包括换行）为单个空格并去掉首尾空白。
/// `for_markdown` 为 true 时转义 [`MARKDOWN_CHARS`]，否则删除原文中的反斜杠。
pub fn clean_text(text: &str, for_markdown: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if for_markdown {
            if MARKDOWN_CHARS.contains(&ch) {
                escaped.push('\\');
            }
            escaped.push(ch);
        } else if ch != '\\' {
            escaped.push(ch);
        }
    }
    escaped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 元素下所有文本节点拼接后规范化
fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>(), false)
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector `{}`: {}", css, e))
}

/// 公告页面解析器
pub struct ContentParser {
    block: Selector,
    heading: Selector,
    body: Selector,
    anchor: Selector,
    post: Selector,
    date: Selector,
    author: Selector,
    simple_entry: Selector,
}

impl ContentParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            block: parse_selector("section.block")?,
            heading: parse_selector("h2")?,
            body: parse_selector("div.content")?,
            anchor: parse_selector("a")?,
            post: parse_selector("li.post")?,
            date: parse_selector("div.date")?,
            author: parse_selector("div.name")?,
            simple_entry: parse_selector("a, li")?,
        })
    }

    /// 解析页面，返回包含全部分类的快照
    ///
    /// 单个区块或条目的问题只记录日志，不会中断解析。
    pub fn parse(&self, raw_content: &str) -> Snapshot {
        let document = Html::parse_document(raw_content);
        let mut sections: BTreeMap<Category, Vec<Item>> = BTreeMap::new();

        for block in document.select(&self.block) {
            let Some(heading) = block.select(&self.heading).next() else {
                continue;
            };

            let heading_text = element_text(heading);
            let Some(category) = Category::from_heading(&heading_text) else {
                warn!(heading = %heading_text, "Skipping unknown section");
                continue;
            };

            let Some(body) = block.select(&self.body).next() else {
                debug!(category = %category, "Section has no content block");
                continue;
            };

            let items = sections.entry(category).or_default();
            match category.profile() {
                ItemProfile::Rich => self.collect_rich(category, body, items),
                ItemProfile::Simple => self.collect_simple(category, body, items),
            }
        }

        Snapshot::from_map(sections)
    }

    fn collect_rich(&self, category: Category, body: ElementRef<'_>, items: &mut Vec<Item>) {
        for post in body.select(&self.post) {
            match self.extract_rich(post) {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(e) => warn!(category = %category, error = %e, "Skipping malformed entry"),
            }
        }
    }

    fn collect_simple(&self, category: Category, body: ElementRef<'_>, items: &mut Vec<Item>) {
        for entry in body.select(&self.simple_entry) {
            match self.extract_simple(entry) {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(e) => warn!(category = %category, error = %e, "Skipping malformed entry"),
            }
        }
    }

    /// `<li class="post">`：链接、日期、作者缺一不可
    fn extract_rich(&self, post: ElementRef<'_>) -> Result<Option<Item>> {
        let Some(anchor) = post.select(&self.anchor).next() else {
            return Ok(None);
        };
        let link = href(anchor)?;
        let title = non_empty_title(element_text(anchor))?;

        let date = post
            .select(&self.date)
            .next()
            .map(element_text)
            .context("missing date")?;
        let author = post
            .select(&self.author)
            .next()
            .map(element_text)
            .context("missing author")?;

        Ok(Some(Item::new(title, link).with_byline(date, author)))
    }

    /// `<a>` 直接作为条目，`<li>` 则取其中第一个链接
    fn extract_simple(&self, entry: ElementRef<'_>) -> Result<Option<Item>> {
        match entry.value().name() {
            "a" => {
                let link = href(entry)?;
                let title = non_empty_title(element_text(entry))?;
                Ok(Some(Item::new(title, link)))
            }
            "li" => {
                let Some(anchor) = entry.select(&self.anchor).next() else {
                    return Ok(None);
                };
                let link = href(anchor)?;
                let title = non_empty_title(element_text(entry))?;
                Ok(Some(Item::new(title, link)))
            }
            _ => Ok(None),
        }
    }
}

fn href(anchor: ElementRef<'_>) -> Result<String> {
    anchor
        .value()
        .attr("href")
        .map(str::to_string)
        .context("anchor has no href")
}

fn non_empty_title(title: String) -> Result<String> {
    if title.is_empty() {
        Err(anyhow!("empty title"))
    } else {
        Ok(title)
    }
}
