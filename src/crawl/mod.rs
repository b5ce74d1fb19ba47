//! Crawler framework (C11): a `Crawler` capability producing a lazy,
//! backpressured `PageStream`, plus four concrete sources and a shared
//! robots.txt gate.

pub mod generic;
pub mod hackernews;
pub mod page;
pub mod reddit;
pub mod robots;
pub mod wikipedia;

pub use page::{Crawler, Page, PageStream};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Every concrete crawler drives its fetch loop on a spawned task and hands
/// the receiving half back as a `Stream`; channel capacity bounds how far
/// the producer can run ahead of a slow consumer (spec §9 lazy-sequence /
/// backpressure idiom).
const CHANNEL_CAPACITY: usize = 32;

pub(crate) fn page_channel() -> (mpsc::Sender<Page>, PageStream) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let stream: PageStream = Box::pin(ReceiverStream::new(rx));
    (tx, stream)
}

#[cfg(test)]
pub(crate) async fn drain_count(stream: PageStream) -> usize {
    let mut stream = stream;
    let mut n = 0;
    while stream.next().await.is_some() {
        n += 1;
    }
    n
}
