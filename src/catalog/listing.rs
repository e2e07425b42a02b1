//! Offset pagination and the local list state kept by each view.

use super::types::{McpListing, Prompt, Rule};

const MAX_ROW_OFFSET: u64 = i64::MAX as u64;

/// Validation message for a page number whose window cannot be addressed.
pub(crate) const PAGE_OUT_OF_RANGE: &str = "Page number is out of range";

/// Fixed-size page selection translated into an inclusive row range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number.
    pub page: usize,
    /// Rows per page.
    pub size: usize,
}

impl PageWindow {
    /// Window for `page`; page 0 is treated as page 1 and size 0 as 1.
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page: page.max(1),
            size: size.max(1),
        }
    }

    /// Like [`PageWindow::new`], but `None` when the window ends past the largest
    /// offset the hosted service accepts (a signed 64-bit row number).
    pub fn checked(page: usize, size: usize) -> Option<Self> {
        let window = Self::new(page, size);
        let end = window.page.checked_mul(window.size)?;
        (u64::try_from(end).ok()? <= MAX_ROW_OFFSET).then_some(window)
    }

    /// Offset of the first row.
    pub fn from(&self) -> usize {
        (self.page - 1).saturating_mul(self.size)
    }

    /// Offset of the last row (inclusive).
    pub fn to(&self) -> usize {
        self.from().saturating_add(self.size - 1)
    }

    /// A full page suggests that another one exists.
    pub fn has_more(&self, returned: usize) -> bool {
        returned == self.size
    }

    /// Window for the following page.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            size: self.size,
        }
    }
}

/// Records addressable by a stable identifier.
pub trait Keyed {
    /// Identifier used to locate the record in a list.
    fn key(&self) -> &str;
}

impl Keyed for Prompt {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Rule {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for McpListing {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Items shown by a view plus its pagination cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    items: Vec<T>,
    page: usize,
    has_more: bool,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 0,
            has_more: false,
        }
    }
}

impl<T: Keyed> ListView<T> {
    /// Empty list with no pages loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched page: page 1 replaces the list, later pages append.
    pub fn apply_page(&mut self, page: usize, items: Vec<T>, has_more: bool) {
        if page <= 1 {
            self.items = items;
        } else {
            self.items.extend(items);
        }
        self.page = page.max(1);
        self.has_more = has_more;
    }

    /// Replace every item with an unpaginated result set.
    pub fn replace(&mut self, items: Vec<T>) {
        self.apply_page(1, items, false);
    }

    /// Drop everything and forget the cursor.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Items currently held, in display order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Last page merged into the list (0 when nothing was loaded).
    pub fn page(&self) -> usize {
        self.page
    }

    /// Whether "load more" should be offered.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Item with `id`, if present.
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.key() == id)
    }

    /// Patch the item with `id` in place; `false` when it is not in the list.
    pub fn update<F>(&mut self, id: &str, patch: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.items.iter_mut().find(|item| item.key() == id) {
            Some(item) => {
                patch(item);
                true
            }
            None => false,
        }
    }

    /// Swap in a fresh copy of an item, keeping its position.
    pub fn upsert(&mut self, item: T) {
        match self.items.iter().position(|existing| existing.key() == item.key()) {
            Some(index) => self.items[index] = item,
            None => self.items.insert(0, item),
        }
    }

    /// Remove the item with `id`; `false` when it is not in the list.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.key() != id);
        self.items.len() != before
    }

    /// Number of items held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
