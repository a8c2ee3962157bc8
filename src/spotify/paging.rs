use std::future::Future;

use tracing::debug;

use crate::error::Result;

/// One page of an offset-paginated listing.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

/// Fetch pages at increasing offsets until the provider reports no more,
/// accumulating items in order.
pub async fn drain_pages<T, F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut offset = 0;

    loop {
        let page = fetch(offset).await?;
        debug!("Fetched page at offset {} ({} items)", offset, page.items.len());
        items.extend(page.items);

        if !page.has_more {
            break;
        }
        offset += page_size;
    }

    Ok(items)
}
