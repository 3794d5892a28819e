//! Per-point tag sets.

use crate::metrics::Tag;
use crate::store::TagSet;

/// Copy of `base` with the dynamic `tag` added on top.
///
/// A dynamic tag overwrites a base tag of the same name. `base` itself is
/// never touched, every point gets its own set.
pub fn merge_tags(base: &TagSet, tag: Option<&Tag>) -> TagSet {
    let mut tags = base.clone();
    if let Some(tag) = tag {
        tags.insert(tag.name.clone(), tag.value.clone());
    }
    tags
}
