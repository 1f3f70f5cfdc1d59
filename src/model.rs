use std::collections::BTreeMap;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::commentary::DEFAULT_CONTEXT_WINDOW;
use crate::reference::DEFAULT_OPEN_RANGE_LIMIT;
use crate::title::TitleMatch;

#[derive(Debug, Clone, Default)]
pub struct OutlineDocument {
    pub sections: Vec<SectionNode>,
    pub verse_to_path: BTreeMap<String, Vec<BreadcrumbEntry>>,
}

impl OutlineDocument {
    /// Parses raw outline JSON of any nesting depth.
    pub fn from_json_slice(raw: &[u8]) -> serde_json::Result<Self> {
        let mut json = serde_json::Deserializer::from_slice(raw);
        json.disable_recursion_limit();
        let value = Value::deserialize(serde_stacker::Deserializer::new(&mut json))?;
        json.end()?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> serde_json::Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(de::Error::custom("outline document must be a JSON object"));
        };

        let sections = fields
            .remove("sections")
            .map(sections_from_value)
            .unwrap_or_default();
        let verse_to_path = fields
            .remove("verseToPath")
            .map(breadcrumb_table)
            .unwrap_or_default();

        Ok(Self {
            sections,
            verse_to_path,
        })
    }
}

impl<'de> Deserialize<'de> for OutlineDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectionNode {
    pub path: String,
    pub title: String,
    pub children: Vec<SectionNode>,
    pub verses: Vec<String>,
}

struct PendingNode {
    node: SectionNode,
    children: std::vec::IntoIter<Value>,
}

// Builds the tree bottom-up from a work-list. Children are moved out of each
// object before it is dropped, so neither building nor dropping the parsed
// value recurses.
fn sections_from_value(value: Value) -> Vec<SectionNode> {
    let mut roots = Vec::new();
    let mut top = array_items(value).into_iter();
    let mut stack: Vec<PendingNode> = Vec::new();

    loop {
        let next = match stack.last_mut() {
            Some(pending) => pending.children.next(),
            None => top.next(),
        };

        match next {
            Some(item) => {
                if let Some(pending) = pending_node(item) {
                    stack.push(pending);
                }
            }
            None => {
                let Some(done) = stack.pop() else {
                    break;
                };
                match stack.last_mut() {
                    Some(parent) => parent.node.children.push(done.node),
                    None => roots.push(done.node),
                }
            }
        }
    }

    roots
}

fn pending_node(value: Value) -> Option<PendingNode> {
    let Value::Object(mut fields) = value else {
        return None;
    };

    let children = fields.remove("children").map(array_items).unwrap_or_default();
    let node = SectionNode {
        path: field_string(&fields, "path"),
        title: field_string(&fields, "title"),
        children: Vec::new(),
        verses: fields
            .get("verses")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(scalar_to_string).collect())
            .unwrap_or_default(),
    };

    Some(PendingNode {
        node,
        children: children.into_iter(),
    })
}

fn array_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

fn field_string(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(scalar_to_string)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BreadcrumbEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: String,
}

impl BreadcrumbEntry {
    pub fn section_path(&self) -> &str {
        if self.section.is_empty() {
            &self.path
        } else {
            &self.section
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditSettings {
    pub context_window: usize,
    pub open_range_limit: u32,
    pub title_match: TitleMatch,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            open_range_limit: DEFAULT_OPEN_RANGE_LIMIT,
            title_match: TitleMatch::Lenient,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDigest {
    pub path: String,
    pub sha256: String,
}

pub const REPORT_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct ReportManifest<'a, T> {
    pub manifest_version: u32,
    pub report: &'static str,
    pub generated_at: &'a str,
    pub sources: &'a [SourceDigest],
    pub settings: &'a AuditSettings,
    #[serde(flatten)]
    pub body: T,
}

fn values_to_seq<T: DeserializeOwned>(value: Value) -> Vec<T> {
    array_items(value)
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value).unwrap_or_default())
}

fn breadcrumb_table(value: Value) -> BTreeMap<String, Vec<BreadcrumbEntry>> {
    match value {
        Value::Object(entries) => entries
            .into_iter()
            .map(|(key, breadcrumb)| (key, values_to_seq(breadcrumb)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
