//! 数据模型 - 公告分类、条目、快照与增量

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 条目字段要求
///
/// `Rich` 分类必须同时具备标题/链接、日期和作者；
/// `Simple` 分类只要求标题和链接。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemProfile {
    Rich,
    Simple,
}

/// 公告分类（封闭集合）
///
/// 声明顺序即分发顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    LatestAnnouncements,
    ExamNotifications,
    OfficeNotifications,
    ScholarshipSection,
    ApplicationFormats,
    CulturalEvents,
    TechnicalClubs,
    IeeeCsi,
}

/// 页面标题 → 分类 查找表（精确匹配）
const HEADINGS: [(&str, Category); 8] = [
    ("Latest announcements", Category::LatestAnnouncements),
    ("Exam Notifications", Category::ExamNotifications),
    ("Office Notifications", Category::OfficeNotifications),
    ("Scholarship Section", Category::ScholarshipSection),
    ("Application Formats", Category::ApplicationFormats),
    ("Cultural Events", Category::CulturalEvents),
    ("Technical Clubs", Category::TechnicalClubs),
    ("IEEE & CSI", Category::IeeeCsi),
];

impl Category {
    /// 所有分类，按分发顺序
    pub const ALL: [Category; 8] = [
        Category::LatestAnnouncements,
        Category::ExamNotifications,
        Category::OfficeNotifications,
        Category::ScholarshipSection,
        Category::ApplicationFormats,
        Category::CulturalEvents,
        Category::TechnicalClubs,
        Category::IeeeCsi,
    ];

    /// 显示名称（也是持久化时使用的键）
    pub fn label(self) -> &'static str {
        match self {
            Category::LatestAnnouncements => "Latest Announcements",
            Category::ExamNotifications => "Exam Notifications",
            Category::OfficeNotifications => "Office Notifications",
            Category::ScholarshipSection => "Scholarship Section",
            Category::ApplicationFormats => "Application Formats",
            Category::CulturalEvents => "Cultural Events",
            Category::TechnicalClubs => "Technical Clubs",
            Category::IeeeCsi => "IEEE & CSI",
        }
    }

    pub fn profile(self) -> ItemProfile {
        match self {
            Category::LatestAnnouncements => ItemProfile::Rich,
            _ => ItemProfile::Simple,
        }
    }

    /// 根据页面区块标题查找分类
    pub fn from_heading(heading: &str) -> Option<Category> {
        HEADINGS
            .iter()
            .find(|(h, _)| *h == heading)
            .map(|(_, c)| *c)
    }

    /// 根据显示名称查找分类
    pub fn from_label(label: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 单条公告
///
/// 相等性是结构化的：缺少 `date`/`author` 的条目与带有它们的条目永远不相等。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Item {
    /// 创建只有标题和链接的条目
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            date: None,
            author: None,
        }
    }

    /// 设置日期和作者
    pub fn with_byline(mut self, date: impl Into<String>, author: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self.author = Some(author.into());
        self
    }

    /// 同时具有日期和作者时返回二者
    pub fn byline(&self) -> Option<(&str, &str)> {
        match (&self.date, &self.author) {
            (Some(d), Some(a)) => Some((d.as_str(), a.as_str())),
            _ => None,
        }
    }
}

type CategoryMap = BTreeMap<Category, Vec<Item>>;

fn complete(mut map: CategoryMap) -> CategoryMap {
    for category in Category::ALL {
        map.entry(category).or_default();
    }
    map
}

/// 一次轮询得到的完整快照
///
/// 键集合总是等于全部分类；构造后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, Vec<Item>>", from = "BTreeMap<String, Vec<Item>>")]
pub struct Snapshot {
    sections: CategoryMap,
}

impl Snapshot {
    /// 所有分类均为空
    pub fn empty() -> Self {
        Self::from_map(BTreeMap::new())
    }

    /// 从分类映射构造，缺失的分类补为空序列
    pub fn from_map(map: CategoryMap) -> Self {
        Self {
            sections: complete(map),
        }
    }

    /// 某分类下的条目
    pub fn items(&self, category: Category) -> &[Item] {
        self.sections.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 按分类顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[Item])> {
        self.sections.iter().map(|(c, items)| (*c, items.as_slice()))
    }

    pub fn total_items(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.sections.keys().copied()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Snapshot> for BTreeMap<String, Vec<Item>> {
    fn from(snapshot: Snapshot) -> Self {
        snapshot
            .sections
            .into_iter()
            .map(|(c, items)| (c.label().to_string(), items))
            .collect()
    }
}

impl From<BTreeMap<String, Vec<Item>>> for Snapshot {
    fn from(raw: BTreeMap<String, Vec<Item>>) -> Self {
        let map = raw
            .into_iter()
            .filter_map(|(label, items)| Category::from_label(&label).map(|c| (c, items)))
            .collect();
        Self::from_map(map)
    }
}

/// 当前快照相对上次快照的新增条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    sections: CategoryMap,
}

impl Delta {
    pub(crate) fn from_map(map: CategoryMap) -> Self {
        Self {
            sections: complete(map),
        }
    }

    pub fn items(&self, category: Category) -> &[Item] {
        self.sections.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 按分类顺序、分类内按条目顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[Item])> {
        self.sections.iter().map(|(c, items)| (*c, items.as_slice()))
    }

    /// 展开为 (分类, 条目) 序列
    pub fn entries(&self) -> impl Iterator<Item = (Category, &Item)> {
        self.sections
            .iter()
            .flat_map(|(c, items)| items.iter().map(move |item| (*c, item)))
    }

    /// 所有分类都没有新增
    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }

    pub fn total_items(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.sections.keys().copied()
    }
}
