//! Object filter and selector over already-decoded results.
//!
//! Nothing here spawns processes. `list` can return a superset of what
//! the caller asked for (the CLI's `--search` is fuzzy and item lists mix
//! every subtype), so results are narrowed locally before the
//! single-result rule is applied.

use crate::bitwarden::command::ListFilter;
use crate::bitwarden::types::*;

/// What a required-single-result lookup is looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub object_type: ObjectType,
    pub item_type: Option<ItemType>,
    pub filter: ListFilter,
}

impl Selector {
    pub fn new(object_type: ObjectType) -> Self {
        Self { object_type, item_type: None, filter: ListFilter::default() }
    }

    pub fn with_item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    pub fn with_filter(mut self, filter: ListFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Whether a listed object satisfies this selector.
    ///
    /// The search term is left to the CLI; its matching rules are not
    /// reproduced here.
    pub fn matches(&self, object: &Object) -> bool {
        if object.object_type() != self.object_type || object.is_deleted() {
            return false;
        }
        if self.item_type.is_some() && object.item_type() != self.item_type {
            return false;
        }
        if !filter_accepts(self.filter.organization_id.as_deref(), object.organization_id.as_deref()) {
            return false;
        }
        let item = object.as_item();
        if !filter_accepts(self.filter.folder_id.as_deref(), item.and_then(|i| i.folder_id.as_deref())) {
            return false;
        }
        if let Some(collection) = self.filter.collection_id.as_deref() {
            let ids = item.map(|i| i.collection_ids.as_slice()).unwrap_or_default();
            let accepted = match collection {
                NULL_FILTER => ids.is_empty(),
                NOT_NULL_FILTER => !ids.is_empty(),
                id => ids.iter().any(|c| c == id),
            };
            if !accepted {
                return false;
            }
        }
        true
    }

    /// Keep the objects this selector accepts, in their original order.
    pub fn narrow(&self, objects: Vec<Object>) -> Vec<Object> {
        objects.into_iter().filter(|o| self.matches(o)).collect()
    }

    /// Narrow, then require exactly one survivor.
    pub fn select(&self, objects: Vec<Object>) -> BitwardenResult<Object> {
        expect_single(self.narrow(objects))
    }
}

/// `bw` filter value selecting objects without the field.
const NULL_FILTER: &str = "null";
/// `bw` filter value selecting objects with any value for the field.
const NOT_NULL_FILTER: &str = "notnull";

fn filter_accepts(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(NULL_FILTER) => actual.is_none(),
        Some(NOT_NULL_FILTER) => actual.is_some(),
        Some(id) => actual == Some(id),
    }
}

/// 0 matches is NotFound, more than one is Ambiguous.
pub fn expect_single(mut objects: Vec<Object>) -> BitwardenResult<Object> {
    match objects.len() {
        0 => Err(BitwardenError::no_match()),
        1 => Ok(objects.remove(0)),
        count => Err(BitwardenError::Ambiguous { count }),
    }
}

/// Check that a `get` returned the kind of object that was requested.
///
/// The item subtype is compared only when the request names one. A
/// trashed object counts as missing.
pub fn verify_identity(requested: &Object, returned: Object) -> BitwardenResult<Object> {
    let type_matches = requested.object_type() == returned.object_type()
        && (requested.item_type().is_none() || requested.item_type() == returned.item_type());
    if !type_matches {
        return Err(BitwardenError::TypeMismatch {
            expected: requested.type_label(),
            actual: returned.type_label(),
        });
    }
    if returned.is_deleted() {
        return Err(BitwardenError::not_found());
    }
    Ok(returned)
}
