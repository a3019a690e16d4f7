//! Lazy iteration over paged collection listings.

use std::collections::VecDeque;

use tracing::debug;
use trellis_wire::Request;

use super::Client;
use crate::errors::ClientError;
use crate::proxy::{RemoteList, Reply};
use crate::resolver::RESOLVER_TARGET;
use crate::transport::Transport;

/// Items of a listing, fetched a page at a time.
///
/// The next page is requested only once the buffered items run out, so an
/// abandoned listing costs no further round trips. Iteration stops after the
/// first failure.
#[derive(Debug)]
pub struct Listing<'c, T> {
    client: &'c Client<T>,
    buffer: VecDeque<Reply>,
    next: Option<Request>,
    batch: Option<usize>,
    pages: usize,
}

impl<'c, T: Transport> Listing<'c, T> {
    pub(super) fn start(
        client: &'c Client<T>,
        request: &Request,
        batch: Option<usize>,
    ) -> Result<Self, ClientError> {
        let page = client.fetch_page(request)?;
        let mut listing = Self::resume(client, page, batch);
        listing.pages = 1;
        Ok(listing)
    }

    pub(super) fn resume(client: &'c Client<T>, page: RemoteList, batch: Option<usize>) -> Self {
        let next = page.next_action(batch);
        Self {
            client,
            buffer: page.into_items().into(),
            next,
            batch,
            pages: 0,
        }
    }

    /// Pages fetched by this listing so far.
    #[must_use]
    pub const fn pages(&self) -> usize {
        self.pages
    }

    fn advance(&mut self, request: &Request) -> Result<(), ClientError> {
        let page = self.client.fetch_page(request)?;
        self.pages = self.pages.saturating_add(1);
        debug!(
            target: RESOLVER_TARGET,
            page = self.pages,
            items = page.items().len(),
            more = page.continuation().is_some(),
            "fetched listing page"
        );
        self.next = page.next_action(self.batch);
        self.buffer.extend(page.into_items());
        Ok(())
    }
}

impl<T: Transport> Iterator for Listing<'_, T> {
    type Item = Result<Reply, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            let request = self.next.take()?;
            if let Err(error) = self.advance(&request) {
                return Some(Err(error));
            }
        }
    }
}
