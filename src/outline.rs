use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{OutlineDocument, SectionNode};
use crate::reference::VerseRef;
use crate::title::normalize_lenient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub path: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaf {
    pub path: String,
    pub title: String,
    #[serde(skip)]
    pub title_key: String,
    pub verses: Vec<String>,
    pub chain: Vec<Crumb>,
}

impl Leaf {
    pub fn ancestors(&self) -> &[Crumb] {
        match self.chain.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    pub leaves: Vec<Leaf>,
    pub canonical: BTreeMap<VerseRef, Vec<Crumb>>,
    pub current_path: BTreeMap<VerseRef, String>,
    pub skipped_keys: Vec<String>,
}

impl HierarchyIndex {
    pub fn build(document: &OutlineDocument) -> Self {
        let leaves = collect_leaves(&document.sections);
        let (canonical, skipped_keys) = build_canonical(document);

        let current_path = canonical
            .iter()
            .filter_map(|(verse_ref, breadcrumb)| {
                breadcrumb
                    .last()
                    .map(|crumb| (*verse_ref, crumb.path.clone()))
            })
            .collect();

        Self {
            leaves,
            canonical,
            current_path,
            skipped_keys,
        }
    }

    pub fn empty_leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.leaves.iter().filter(|leaf| leaf.verses.is_empty())
    }

    pub fn section_of(&self, verse_ref: &VerseRef) -> Option<&Crumb> {
        self.canonical.get(verse_ref).and_then(|chain| chain.last())
    }
}

pub fn collect_leaves(sections: &[SectionNode]) -> Vec<Leaf> {
    let mut leaves = Vec::new();
    let mut stack = sections
        .iter()
        .rev()
        .map(|node| (node, Vec::<Crumb>::new()))
        .collect::<Vec<_>>();

    while let Some((node, mut chain)) = stack.pop() {
        chain.push(Crumb {
            path: node.path.clone(),
            title: node.title.clone(),
        });

        if node.children.is_empty() {
            if node.path.is_empty() || node.title.is_empty() {
                warn!(
                    path = %node.path,
                    title = %node.title,
                    "dropping leaf without path or title"
                );
                continue;
            }

            leaves.push(Leaf {
                path: node.path.clone(),
                title: node.title.clone(),
                title_key: normalize_lenient(&node.title),
                verses: node.verses.clone(),
                chain,
            });
            continue;
        }

        for child in node.children.iter().rev() {
            stack.push((child, chain.clone()));
        }
    }

    leaves.sort_by(|left, right| compare_paths(&left.path, &right.path));
    leaves
}

fn build_canonical(document: &OutlineDocument) -> (BTreeMap<VerseRef, Vec<Crumb>>, Vec<String>) {
    let mut canonical = BTreeMap::new();
    let mut skipped = Vec::new();

    for (key, breadcrumb) in &document.verse_to_path {
        if breadcrumb.is_empty() {
            continue;
        }

        let Some(verse_ref) = VerseRef::parse(key) else {
            debug!(key = %key, "skipping canonical key that is not a verse reference");
            skipped.push(key.clone());
            continue;
        };

        let crumbs = breadcrumb
            .iter()
            .map(|entry| Crumb {
                path: entry.section_path().to_string(),
                title: entry.title.clone(),
            })
            .collect::<Vec<Crumb>>();

        if let Some(previous) = canonical.insert(verse_ref, crumbs) {
            warn!(
                key = %key,
                verse_ref = %verse_ref,
                replaced_path = %previous.last().map(|crumb| crumb.path.as_str()).unwrap_or_default(),
                "canonical key collides with an earlier spelling of the same reference"
            );
        }
    }

    (canonical, skipped)
}

/// Orders dotted section paths segment by segment, numerically where both
/// segments are numbers.
pub fn compare_paths(left: &str, right: &str) -> Ordering {
    let mut left_parts = left.split('.');
    let mut right_parts = right.split('.');

    loop {
        match (left_parts.next(), right_parts.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => {
                let ordering = match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => a.cmp(b),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
