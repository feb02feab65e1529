//! Page-based results.

use crate::entity::EntityValue;
use serde_json::{Value, json};

/// One page of a larger sequence, with the metadata an agent needs to ask
/// for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub items: Vec<EntityValue>,
    /// Page number, starting at 1.
    pub page: usize,
    pub page_size: usize,
    pub has_next: bool,
    /// Known only when the source can count cheaply.
    pub total_items: Option<usize>,
}

impl PageResult {
    pub fn new(
        items: Vec<EntityValue>,
        page: usize,
        page_size: usize,
        has_next: bool,
        total_items: Option<usize>,
    ) -> Self {
        Self {
            items,
            page,
            page_size,
            has_next,
            total_items,
        }
    }

    /// A page cut from a sequence of `total` items.
    pub fn with_total(items: Vec<EntityValue>, page: usize, page_size: usize, total: usize) -> Self {
        let has_next = page.saturating_mul(page_size) < total;
        Self::new(items, page, page_size, has_next, Some(total))
    }

    pub fn total_pages(&self) -> Option<usize> {
        match (self.total_items, self.page_size) {
            (Some(_), 0) => Some(0),
            (Some(total), size) => Some(total.div_ceil(size)),
            (None, _) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "items": self.items.iter().map(EntityValue::to_json).collect::<Vec<_>>(),
            "page": self.page,
            "page_size": self.page_size,
            "has_next": self.has_next,
            "total_items": self.total_items,
            "total_pages": self.total_pages(),
        })
    }
}
