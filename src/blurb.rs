// src/blurb.rs
// One work as it appears on a listing page. Fields are extracted
// eagerly into plain values; tag resolution stays with the resolver,
// which gets handed in explicitly where needed.

use crate::dom::NodeRef;
use crate::error::{Error, Result};
use crate::net::ArchiveClient;
use crate::tags::{Tag, TagResolver};

#[derive(Clone, Debug)]
pub struct Blurb {
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub language: String,
    pub status: String,
    pub complete: bool,
    pub words: u64,
    pub rating: String,
    pub summary: String,
    /// Tag names per group, exactly as spelled on the listing page.
    pub characters: Vec<String>,
    pub relationships: Vec<String>,
    pub freeforms: Vec<String>,
    pub warnings: Vec<String>,
}

impl Blurb {
    /// Extracts one blurb from its `li` fragment on an index page.
    /// A missing required field is a hard failure: it means the page
    /// structure changed underneath us.
    pub fn from_fragment(fragment: NodeRef<'_>) -> Result<Self> {
        let work_link = required(&fragment, "h4.heading a")?;
        let url = work_link
            .attr("href")
            .ok_or_else(|| Error::MissingElement("h4.heading a[href]".to_string()))?
            .to_string();
        let title = work_link.text();
        let author = fragment.first("a[rel=author]").map(|n| n.text());

        let words_text = required(&fragment, ".stats dd.words")?.text();
        let words = words_text
            .replace(',', "")
            .parse()
            .map_err(|_| Error::Malformed { field: "word count", value: words_text })?;

        let status = required(&fragment, ".required-tags .iswip span")?.text();
        Ok(Self {
            url,
            title,
            author,
            language: required(&fragment, ".stats dd.language")?.text(),
            words,
            rating: required(&fragment, ".required-tags .rating span")?.text(),
            summary: fragment
                .all(".summary p")
                .iter()
                .map(|p| p.text())
                .collect::<Vec<_>>()
                .join("\n\n"),
            characters: tag_names(&fragment, ".tags .characters a"),
            relationships: tag_names(&fragment, ".tags .relationships a"),
            freeforms: tag_names(&fragment, ".tags .freeforms a"),
            warnings: tag_names(&fragment, ".tags .warnings a"),
            complete: status == "Complete Work",
            status,
        })
    }

    /// Resolves every tag on this blurb through the given resolver.
    /// Outside an auto-resolve session this just materializes cache
    /// records; inside one it fetches what is still unknown.
    pub fn resolve_tags(
        &self,
        client: &ArchiveClient,
        resolver: &mut TagResolver,
    ) -> Result<Vec<Tag>> {
        let groups = [&self.warnings, &self.characters, &self.relationships, &self.freeforms];
        let mut tags = Vec::new();
        for name in groups.into_iter().flatten() {
            tags.push(resolver.lookup(client, name)?);
        }
        Ok(tags)
    }
}

fn required<'a>(fragment: &NodeRef<'a>, selector: &str) -> Result<NodeRef<'a>> {
    fragment
        .first(selector)
        .ok_or_else(|| Error::MissingElement(selector.to_string()))
}

fn tag_names(fragment: &NodeRef<'_>, selector: &str) -> Vec<String> {
    fragment.all(selector).iter().map(|n| n.text()).collect()
}
