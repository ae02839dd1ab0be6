// tests/common/mod.rs
//
// Scripted stand-in for the HTTP transport, plus page fixtures.
//
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use ao_scrape::error::{Error, Result};
use ao_scrape::net::{ClientConfig, Transport, TransportResponse};

#[derive(Clone)]
pub struct Canned {
    pub body: String,
    pub final_url: Option<String>,
}

impl Canned {
    pub fn body(body: &str) -> Self {
        Self { body: body.to_string(), final_url: None }
    }

    pub fn redirect(body: &str, final_url: &str) -> Self {
        Self { body: body.to_string(), final_url: Some(final_url.to_string()) }
    }
}

/// Transport double. Ordered `script` responses are served first; after
/// that, requests are answered by the first route whose path suffix
/// matches. Every request is appended to the shared log.
pub struct ScriptedTransport {
    script: RefCell<VecDeque<Canned>>,
    routes: Vec<(String, Canned)>,
    log: Rc<RefCell<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let transport = Self {
            script: RefCell::new(VecDeque::new()),
            routes: Vec::new(),
            log: Rc::clone(&log),
        };
        (transport, log)
    }

    pub fn push(mut self, canned: Canned) -> Self {
        self.script.get_mut().push_back(canned);
        self
    }

    pub fn route(mut self, path_suffix: &str, canned: Canned) -> Self {
        self.routes.push((path_suffix.to_string(), canned));
        self
    }

    fn answer(&self, method: &str, url: &str) -> Result<TransportResponse> {
        self.log.borrow_mut().push(format!("{method} {url}"));
        let canned = self
            .script
            .borrow_mut()
            .pop_front()
            .or_else(|| {
                self.routes
                    .iter()
                    .find(|(suffix, _)| url.ends_with(suffix))
                    .map(|(_, c)| c.clone())
            })
            .ok_or_else(|| Error::Transport(format!("connection refused: {url}")))?;
        Ok(TransportResponse {
            final_url: canned.final_url.unwrap_or_else(|| url.to_string()),
            body: canned.body,
        })
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, _params: &[(String, String)]) -> Result<TransportResponse> {
        self.answer("GET", url)
    }

    fn post(&self, url: &str, _form: &[(String, String)]) -> Result<TransportResponse> {
        self.answer("POST", url)
    }
}

/// Client settings tuned for tests: no inter-request wait, a cooldown
/// short enough to measure without slowing the suite down.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        root: "https://example.org".to_string(),
        fetch_interval: Duration::ZERO,
        cooldown: Duration::from_millis(25),
        ..ClientConfig::default()
    }
}

/* ---------------- page fixtures ---------------- */

pub fn blurb_li(id: u32, title: &str) -> String {
    format!(
        r#"<li class="work blurb group" id="work_{id}">
          <div class="header module">
            <h4 class="heading">
              <a href="/works/{id}">{title}</a>
              by <a rel="author" href="/users/someone">someone</a>
            </h4>
            <ul class="required-tags">
              <li><span class="rating"><span>General Audiences</span></span></li>
              <li><span class="iswip"><span>Complete Work</span></span></li>
            </ul>
          </div>
          <ul class="tags commas">
            <li class="warnings"><a class="tag">No Archive Warnings Apply</a></li>
            <li class="freeforms"><a class="tag">Fluffy</a></li>
          </ul>
          <blockquote class="summary"><p>Words happen.</p></blockquote>
          <dl class="stats">
            <dt>Language:</dt><dd class="language">English</dd>
            <dt>Words:</dt><dd class="words">1,234</dd>
          </dl>
        </li>"#
    )
}

/// A works index page: optional pagination block, then the entry list.
pub fn index_page(entries: &[String], next_href: Option<&str>) -> String {
    let pagination = match next_href {
        Some(href) => format!(
            r#"<ol class="pagination actions">
              <li><a href="/works?page=1">1</a></li>
              <li><a href="/works?page=99">99</a></li>
              <li class="next"><a href="{href}">Next</a></li>
            </ol>"#
        ),
        None => String::new(),
    };
    format!(
        r#"<html><body>
        {pagination}
        <ol class="work index group">{}</ol>
        </body></html>"#,
        entries.join("\n")
    )
}

/// Tag page for a canonical ("common") tag: has navigation actions,
/// declares the given synonyms, and optionally a merge target.
pub fn canonical_tag_page(name: &str, synonyms: &[&str], merged_into: Option<&str>) -> String {
    let synonym_block = if synonyms.is_empty() {
        String::new()
    } else {
        let items: String = synonyms
            .iter()
            .map(|s| format!(r#"<li><a class="tag" href="/tags/{s}">{s}</a></li>"#))
            .collect();
        format!(
            r#"<div class="synonym listbox group">
              <h3>Synonyms</h3><ul class="tags commas index group">{items}</ul>
            </div>"#
        )
    };
    let merger_block = match merged_into {
        Some(target) => format!(
            r#"<div class="merger module">
              <p>This tag has been merged with
                 <a class="tag" href="/tags/{target}">{target}</a>.</p>
            </div>"#
        ),
        None => String::new(),
    };
    format!(
        r#"<html><body><div class="tag home profile">
          <div class="header">
            <h2 class="heading">{name}</h2>
            <ul class="navigation actions"><li><a href="/tags/{name}/edit">Edit</a></li></ul>
          </div>
          {synonym_block}
          {merger_block}
        </div></body></html>"#
    )
}

/// Tag page for an uncurated tag: no navigation actions at all.
pub fn plain_tag_page(name: &str) -> String {
    format!(
        r#"<html><body><div class="tag home profile">
          <div class="header"><h2 class="heading">{name}</h2></div>
        </div></body></html>"#
    )
}
