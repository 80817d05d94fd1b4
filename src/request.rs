use std::{ops::RangeInclusive, sync::Arc};

use reqwest::Client;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::debug;

use crate::{Error, Result};

/// Output of a single page task: the page number and its body (or why there is none).
pub(crate) type PageResponse = (u32, Result<Vec<u8>>);

/// Returns a `JoinSet` of all the page requests in a batch, so that they can be awaited.
/// Every task holds a permit from `limit` while its request is in flight, so no more than
/// `limit`'s permit count of requests run at once.
pub(crate) fn request_batch<F>(
    client: &Client,
    limit: Arc<Semaphore>,
    pages: RangeInclusive<u32>,
    url_for: F,
) -> JoinSet<PageResponse>
where
    F: Fn(u32) -> String,
{
    let mut task_set = JoinSet::new();
    for page_num in pages {
        task_set.spawn({
            // Client uses Arc so we can clone cheaply
            let client = client.clone();
            let limit = limit.clone();
            let url = url_for(page_num);

            async move {
                let res = match limit.acquire_owned().await {
                    Ok(_permit) => request_page(&client, &url).await,
                    Err(e) => Err(e.into()),
                };
                (page_num, res)
            }
        });
    }
    task_set
}

/// Requests a page and returns its body. Any status outside of 2xx is an error.
pub(crate) async fn request_page(client: &Client, url: &str) -> Result<Vec<u8>> {
    debug!(url, "GET");
    let res = client.get(url).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = res.bytes().await?;
    Ok(body.to_vec())
}
