// src/archive.rs
// Facade tying the client and the tag resolver together, plus the
// listing paginator.

use std::collections::VecDeque;
use std::path::Path;

use log::{debug, info};

use crate::blurb::Blurb;
use crate::dom::Page;
use crate::error::Result;
use crate::net::{ArchiveClient, ClientConfig};
use crate::tags::{tag_escape, TagResolver};

pub struct Archive {
    pub client: ArchiveClient,
    pub tags: TagResolver,
}

impl Archive {
    pub fn new(config: ClientConfig, tag_cache: Option<&Path>) -> Result<Self> {
        let client = ArchiveClient::new(config)?;
        let tags = match tag_cache {
            Some(path) => TagResolver::with_cache_file(path)?,
            None => TagResolver::new(),
        };
        Ok(Self { client, tags })
    }

    pub fn with_client(client: ArchiveClient, tags: TagResolver) -> Self {
        Self { client, tags }
    }

    /// Work search. Free-form terms become `work_search[key]=value`
    /// query parameters.
    pub fn search(&self, terms: &[(String, String)]) -> Result<Works<'_>> {
        let params: Vec<(String, String)> = terms
            .iter()
            .map(|(key, value)| (format!("work_search[{key}]"), value.clone()))
            .collect();
        debug!("searching for works with {params:?}");
        let page = self.client.fetch_page("/works/search", &params)?;
        Ok(Works::start(&self.client, page))
    }

    /// All works carrying the given tag.
    pub fn tagged_works(&self, tag: &str) -> Result<Works<'_>> {
        let page = self
            .client
            .fetch_page(&format!("/tags/{}/works", tag_escape(tag)), &[])?;
        Ok(Works::start(&self.client, page))
    }

    /// Runs `f` with tag auto-resolution switched on. The previous flag
    /// is restored and the cache is persisted afterwards, whether or not
    /// `f` succeeded: partial progress is worth keeping.
    pub fn resolve_session<R>(
        &mut self,
        f: impl FnOnce(&ArchiveClient, &mut TagResolver) -> Result<R>,
    ) -> Result<R> {
        let previous = self.tags.auto_resolve;
        self.tags.auto_resolve = true;
        let outcome = f(&self.client, &mut self.tags);
        self.tags.auto_resolve = previous;
        let saved = self.tags.save(None);
        let value = outcome?;
        saved?;
        Ok(value)
    }
}

/// Lazy walk over a chain of listing pages. Yields the current page's
/// blurbs, then follows the "next" link for more. Forward-only and
/// destructive: dropping it early stops all further fetching, and a
/// fresh traversal means re-fetching from the first page.
pub struct Works<'a> {
    client: &'a ArchiveClient,
    queue: VecDeque<Result<Blurb>>,
    next: Option<String>,
    finished: bool,
}

impl<'a> Works<'a> {
    fn start(client: &'a ArchiveClient, first: Page) -> Self {
        let page_links = first.all(".pagination a");
        if page_links.len() >= 2 {
            info!("found a total of {} pages", page_links[page_links.len() - 2].text());
        }
        let mut works = Self { client, queue: VecDeque::new(), next: None, finished: false };
        works.ingest(&first);
        works
    }

    // Pull blurbs and the next-page link out of one listing page. Even a
    // page with no entries can still carry pagination controls.
    fn ingest(&mut self, page: &Page) {
        for fragment in page.all("ol.work.index > li") {
            self.queue.push_back(Blurb::from_fragment(fragment));
        }
        self.next = page
            .first(".pagination .next a")
            .and_then(|link| link.attr("href"))
            .map(str::to_string);
    }
}

impl Iterator for Works<'_> {
    type Item = Result<Blurb>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if let Some(item) = self.queue.pop_front() {
                return Some(item);
            }
            let Some(href) = self.next.take() else {
                self.finished = true;
                return None;
            };
            match self.client.fetch_page(&href, &[]) {
                Ok(page) => self.ingest(&page),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
