//! Page windows and the normalizer that slices upstream collections.
//!
//! Upstream listings come back in three shapes: a page the server already
//! cut for us, a fully materialized collection, or a forward-only stream.
//! [`paginate`] turns all of them into the same `[offset, offset + limit)`
//! slice. Results reflect upstream state at fetch time; there is no
//! snapshot isolation across pages.

use crate::error::GatewayError;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 30;
pub const MAX_PER_PAGE: u32 = 100;

/// `offset = (page - 1) * per_page`, `limit = per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: u32,
    per_page: u32,
}

impl PageWindow {
    pub fn new(page: u32, per_page: u32) -> Result<Self, GatewayError> {
        if page < 1 {
            return Err(GatewayError::validation("page", "must be >= 1"));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(GatewayError::validation(
                "per_page",
                format!("must be between 1 and {MAX_PER_PAGE}"),
            ));
        }
        Ok(Self { page, per_page })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }

    pub fn limit(&self) -> usize {
        self.per_page as usize
    }

    /// Exclusive end position of the window.
    pub fn end(&self) -> usize {
        self.offset() + self.limit()
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// A listing as the upstream collaborator produced it.
pub enum RawCollection<T> {
    /// Upstream already served exactly the requested window.
    Window {
        items: Vec<T>,
        total_count: Option<u64>,
    },
    /// The whole ordered result set.
    Complete(Vec<T>),
    /// Forward-only iteration without random access.
    Stream {
        items: BoxStream<'static, Result<T, GatewayError>>,
        total_count: Option<u64>,
    },
}

impl<T> RawCollection<T> {
    pub fn window(items: Vec<T>) -> Self {
        Self::Window {
            items,
            total_count: None,
        }
    }
}

/// One normalized page, fully materialized and in upstream order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Slice `raw` down to `window`.
///
/// Streams are consumed for at most `window.end()` items and never drained
/// further, which caps the work done for a deep page request.
pub async fn paginate<T>(raw: RawCollection<T>, window: PageWindow) -> Result<Page<T>, GatewayError> {
    match raw {
        RawCollection::Window {
            mut items,
            total_count,
        } => {
            items.truncate(window.limit());
            Ok(Page { items, total_count })
        }
        RawCollection::Complete(items) => {
            let total = items.len() as u64;
            let items = items
                .into_iter()
                .skip(window.offset())
                .take(window.limit())
                .collect();
            Ok(Page {
                items,
                total_count: Some(total),
            })
        }
        RawCollection::Stream {
            mut items,
            total_count,
        } => {
            let mut out = Vec::with_capacity(window.limit());
            let mut position = 0usize;
            while position < window.end() {
                let Some(next) = items.next().await else {
                    break;
                };
                let item = next?;
                if position >= window.offset() {
                    out.push(item);
                }
                position += 1;
            }
            Ok(Page {
                items: out,
                total_count,
            })
        }
    }
}
