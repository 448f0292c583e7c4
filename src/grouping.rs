//! Multi-level grouping
//!
//! Rows are partitioned by the value of one field per grouping level, building
//! a tree of groups that is then flattened, header first, into the list a
//! grouped table renders. Every row lands in exactly one group per level:
//! missing or blank values go to [`UNCATEGORIZED`].
//!
//! Groups are identified by their [`GroupKey`], the ordered values along the
//! path from the top level down to the group. Collapsing a group hides its
//! descendants from the flattened list but keeps its full membership in
//! `items`, so footers still summarise everything underneath.
//!
//! # Examples
//!
//! ```
//! use dbview::{create_multi_level_groups, Field, FieldType, GroupingConfig, Row};
//! use std::collections::HashSet;
//!
//! let fields = vec![Field::new("status", "Status", FieldType::Status)];
//! let rows = vec![
//!     Row::new("1", "").with("status", "Done"),
//!     Row::new("2", "").with("status", "Todo"),
//!     Row::new("3", ""),
//! ];
//! let config = GroupingConfig::by(["status"]);
//!
//! let groups = create_multi_level_groups(&rows, &fields, &config, &HashSet::new());
//! let values: Vec<&str> = groups.iter().map(|g| g.group_value.as_str()).collect();
//! assert_eq!(values, vec!["Done", "Todo", "Uncategorized"]);
//! ```

use crate::field::{Field, FieldIndex};
use crate::row::Row;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Group value for rows with no value at a level.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Default cap on grouping depth.
pub const DEFAULT_MAX_LEVELS: usize = 3;

/// Separator of the encoded key form.
const KEY_SEPARATOR: char = '|';
const KEY_ESCAPE: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingLevel {
    pub field_id: String,
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Primary level first
    #[serde(default)]
    pub levels: Vec<GroupingLevel>,
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
}

fn default_max_levels() -> usize {
    DEFAULT_MAX_LEVELS
}

impl Default for GroupingConfig {
    fn default() -> Self {
        GroupingConfig {
            levels: Vec::new(),
            max_levels: DEFAULT_MAX_LEVELS,
        }
    }
}

impl GroupingConfig {
    /// Group by the given fields, primary first.
    pub fn by<I, S>(field_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let levels = field_ids
            .into_iter()
            .enumerate()
            .map(|(level, field_id)| GroupingLevel {
                field_id: field_id.into(),
                level,
            })
            .collect();
        GroupingConfig {
            levels,
            ..GroupingConfig::default()
        }
    }

    /// True when at least one level survives the `max_levels` cap.
    pub fn is_active(&self) -> bool {
        !self.effective_levels().is_empty()
    }

    /// Levels in use, primary first, capped at `max_levels`.
    pub fn effective_levels(&self) -> &[GroupingLevel] {
        let take = self.levels.len().min(self.max_levels);
        &self.levels[..take]
    }
}

/// Identity of a group: the group values from the top level down.
///
/// Collapse state is stored against these keys. The structured form compares
/// segment by segment, so values containing the separator cannot collide.
/// Keys serialize as a list of segments and also deserialize from the
/// encoded string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupKey(Vec<String>);

impl<'de> Deserialize<'de> for GroupKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Segments(Vec<String>),
            Encoded(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Segments(segments) => GroupKey(segments),
            Repr::Encoded(encoded) => GroupKey::decode(&encoded),
        })
    }
}

impl GroupKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GroupKey(segments.into_iter().map(Into::into).collect())
    }

    pub fn root() -> Self {
        GroupKey(Vec::new())
    }

    /// Key of a direct child group.
    pub fn child(&self, value: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(value.to_string());
        GroupKey(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// `|`-joined form with `|` and `\` escaped, for string-keyed storage.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(KEY_SEPARATOR);
            }
            for c in segment.chars() {
                if c == KEY_SEPARATOR || c == KEY_ESCAPE {
                    out.push(KEY_ESCAPE);
                }
                out.push(c);
            }
        }
        out
    }

    /// Inverse of [`GroupKey::encode`]. Plain `a|b` strings decode the same way.
    pub fn decode(encoded: &str) -> Self {
        if encoded.is_empty() {
            return GroupKey::root();
        }
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = encoded.chars();
        while let Some(c) = chars.next() {
            match c {
                KEY_ESCAPE => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                KEY_SEPARATOR => segments.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        segments.push(current);
        GroupKey(segments)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Transient tree node built during one grouping pass.
#[derive(Debug)]
struct GroupNode<'a> {
    value: String,
    items: Vec<&'a Row>,
    children: IndexMap<String, GroupNode<'a>>,
    level: usize,
    field_id: String,
}

/// One group header of the flattened, render-ready list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedGroup<'a> {
    pub group_path: GroupKey,
    pub group_value: String,
    pub level: usize,
    pub field_id: String,
    /// Every row under this group, in input order.
    pub items: Vec<&'a Row>,
    pub is_collapsed: bool,
    /// False for the deepest level.
    pub has_children: bool,
}

/// Build the grouped, flattened view of `items`.
///
/// Returns an empty list when no levels are configured. Groups appear in the
/// order their first row appears in `items`; grouping does not sort, so sort
/// the rows first when both are wanted.
pub fn create_multi_level_groups<'a, I>(
    items: I,
    fields: &[Field],
    config: &GroupingConfig,
    collapsed_groups: &HashSet<GroupKey>,
) -> Vec<FlattenedGroup<'a>>
where
    I: IntoIterator<Item = &'a Row>,
{
    if !config.is_active() {
        return Vec::new();
    }
    if config.levels.len() > config.max_levels {
        log::debug!(
            "grouping has {} levels, using the first {}",
            config.levels.len(),
            config.max_levels
        );
    }

    let index = FieldIndex::new(fields);
    let levels = config.effective_levels();
    let items: Vec<&'a Row> = items.into_iter().collect();
    let tree = build_level(&items, levels, 0, &index);

    let mut flattened = Vec::new();
    flatten_nodes(tree, &GroupKey::root(), collapsed_groups, &mut flattened);
    flattened
}

/// Partition `items` by the value of `levels[depth]` and recurse.
fn build_level<'a>(
    items: &[&'a Row],
    levels: &[GroupingLevel],
    depth: usize,
    fields: &FieldIndex<'_>,
) -> IndexMap<String, GroupNode<'a>> {
    let Some(level) = levels.get(depth) else {
        return IndexMap::new();
    };
    let known_field = fields.get(&level.field_id).is_some();
    if !known_field {
        log::debug!("grouping level {} uses unknown field '{}'", depth, level.field_id);
    }

    let mut nodes: IndexMap<String, GroupNode<'a>> = IndexMap::new();
    for &row in items {
        let value = if known_field { group_value(row, &level.field_id) } else { UNCATEGORIZED };
        nodes
            .entry(value.to_string())
            .or_insert_with(|| GroupNode {
                value: value.to_string(),
                items: Vec::new(),
                children: IndexMap::new(),
                level: depth,
                field_id: level.field_id.clone(),
            })
            .items
            .push(row);
    }

    for node in nodes.values_mut() {
        node.children = build_level(&node.items, levels, depth + 1, fields);
    }
    nodes
}

/// Surrounding whitespace is not part of a group value.
fn group_value<'r>(row: &'r Row, field_id: &str) -> &'r str {
    if row.is_blank(field_id) {
        UNCATEGORIZED
    } else {
        row.value(field_id).trim()
    }
}

/// Pre-order walk: each header is followed by its subtree unless collapsed.
fn flatten_nodes<'a>(
    nodes: IndexMap<String, GroupNode<'a>>,
    parent: &GroupKey,
    collapsed_groups: &HashSet<GroupKey>,
    out: &mut Vec<FlattenedGroup<'a>>,
) {
    for (_, node) in nodes {
        let key = parent.child(&node.value);
        let is_collapsed = collapsed_groups.contains(&key);
        let has_children = !node.children.is_empty();

        out.push(FlattenedGroup {
            group_path: key.clone(),
            group_value: node.value,
            level: node.level,
            field_id: node.field_id,
            items: node.items,
            is_collapsed,
            has_children,
        });

        if !is_collapsed {
            flatten_nodes(node.children, &key, collapsed_groups, out);
        }
    }
}
