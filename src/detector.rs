//! 变化检测 - 计算新快照相对上次快照的新增条目

use crate::model::{Delta, Snapshot};
use std::collections::BTreeMap;

/// 返回 `current` 中每个分类下、在 `previous` 同分类中找不到结构相等条目的那些条目
///
/// 保持 `current` 中的顺序；`previous` 中没有的分类视为空。
pub fn diff(current: &Snapshot, previous: &Snapshot) -> Delta {
    let sections = current
        .iter()
        .map(|(category, items)| {
            let seen = previous.items(category);
            let fresh = items
                .iter()
                .filter(|item| !seen.contains(item))
                .cloned()
                .collect::<Vec<_>>();
            (category, fresh)
        })
        .collect::<BTreeMap<_, _>>();

    Delta::from_map(sections)
}
