// src/tags.rs
// Canonical-tag mapper. Tag pages on the archive declare whether a tag
// is "common" (curated), list its synonyms, and may point at a tag it
// was merged into. The resolver walks that graph lazily, one fetch per
// distinct tag name, and keeps everything it learns in a cache that can
// round-trip through a small JSON file.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::net::ArchiveClient;

/// Tri-state resolution status. A tag starts `Unknown` and only ever
/// gains information: once `No` or `Yes`, it never changes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Common {
    Unknown,
    No,
    Yes,
}

/// One tag as known to the resolver. `canonical` names another tag in
/// the same cache rather than referencing it directly; the cache is the
/// single owner of every record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub common: Common,
    pub canonical: Option<String>,
}

impl Tag {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), common: Common::Unknown, canonical: None }
    }

    /// The spelling this tag resolves to: its canonical tag's name if it
    /// is a synonym, otherwise its own.
    pub fn canonical_name(&self) -> &str {
        self.canonical.as_deref().unwrap_or(&self.name)
    }
}

/// Escapes characters the archive requires to be non-literal in tag URLs.
pub fn tag_escape(tag: &str) -> String {
    tag.replace('.', "*d*")
        .replace('#', "*h*")
        .replace('?', "*q*")
        .replace('/', "*s*")
}

// On-disk shape: exactly two maps. `tags` carries the common flag for
// every tag with a known state; `canon_map` carries only synonym edges.
#[derive(Serialize, Deserialize, Default)]
struct CacheFile {
    tags: BTreeMap<String, bool>,
    canon_map: BTreeMap<String, String>,
}

pub struct TagResolver {
    /// When set, `lookup` resolves unknown tags instead of returning
    /// them as-is. Flipped by `Archive::resolve_session`.
    pub auto_resolve: bool,
    cache: HashMap<String, Tag>,
    cache_file: Option<PathBuf>,
    fetches: u64,
}

impl TagResolver {
    pub fn new() -> Self {
        Self { auto_resolve: false, cache: HashMap::new(), cache_file: None, fetches: 0 }
    }

    /// Resolver backed by a cache file, loaded now. A missing or
    /// unreadable file is the caller's problem.
    pub fn with_cache_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let file: CacheFile = serde_json::from_str(&raw)?;
        let mut cache: HashMap<String, Tag> = HashMap::new();
        for (name, common) in file.tags {
            let tag = cache.entry(name.clone()).or_insert_with(|| Tag::new(&name));
            tag.common = if common { Common::Yes } else { Common::No };
        }
        for (name, canonical) in file.canon_map {
            let tag = cache.entry(name.clone()).or_insert_with(|| Tag::new(&name));
            // A synonym is common by definition, even without a `tags` entry.
            tag.common = Common::Yes;
            tag.canonical = Some(canonical);
        }
        Ok(Self {
            auto_resolve: false,
            cache,
            cache_file: Some(path.to_path_buf()),
            fetches: 0,
        })
    }

    /// Configure where `save` writes without loading anything, for a
    /// cache file that does not exist yet.
    pub fn set_cache_file(&mut self, path: &Path) {
        self.cache_file = Some(path.to_path_buf());
    }

    /// Tag record for `name`, created as unresolved if absent.
    /// Never touches the network.
    pub fn get(&mut self, name: &str) -> &Tag {
        self.cache.entry(name.to_string()).or_insert_with(|| Tag::new(name))
    }

    /// `get`, unless an auto-resolve session is active, in which case
    /// unknown tags are resolved on the spot.
    pub fn lookup(&mut self, client: &ArchiveClient, name: &str) -> Result<Tag> {
        if self.auto_resolve && self.get(name).common == Common::Unknown {
            return self.resolve(client, name);
        }
        Ok(self.get(name).clone())
    }

    /// Resolves `name` against its tag page on the archive.
    ///
    /// Already-resolved tags come straight from the cache; each distinct
    /// name costs at most one fetch per process lifetime. A merged tag's
    /// target is resolved recursively; a cycle in the merge chain is
    /// reported as [`Error::TagCycle`] instead of looping.
    pub fn resolve(&mut self, client: &ArchiveClient, name: &str) -> Result<Tag> {
        let mut visited = HashSet::new();
        self.resolve_inner(client, name, &mut visited)
    }

    fn resolve_inner(
        &mut self,
        client: &ArchiveClient,
        name: &str,
        visited: &mut HashSet<String>,
    ) -> Result<Tag> {
        if !visited.insert(name.to_string()) {
            return Err(Error::TagCycle(name.to_string()));
        }
        if let Some(tag) = self.cache.get(name) {
            if tag.common != Common::Unknown {
                return Ok(tag.clone());
            }
        }

        debug!("resolving tag {name:?}");
        self.fetches += 1;
        let page = client.fetch_page(&format!("/tags/{}", tag_escape(name)), &[])?;

        // No navigation actions: the tag exists but carries no curated
        // metadata, so there is nothing more to learn about it.
        if page.first(".tag .header .navigation.actions").is_none() {
            let tag = self.entry(name);
            tag.common = Common::No;
            return Ok(tag.clone());
        }

        // Canonical tag. Record any declared synonyms without fetching
        // their own pages; declaration is all the evidence needed. A tag
        // already resolved as non-common keeps that state: resolution only
        // adds information, it never flips a known flag.
        self.entry(name).common = Common::Yes;
        for synonym in page.all(".synonym .tags .tag") {
            let syn_name = synonym.text();
            let syn = self.entry(&syn_name);
            if syn.common == Common::No {
                debug!("ignoring declared synonym {syn_name:?}: already non-common");
                continue;
            }
            syn.common = Common::Yes;
            syn.canonical = Some(name.to_string());
            debug!("recorded synonym {syn_name:?} -> {name:?}");
        }

        // Merged tags retire in favor of another canonical tag; follow it.
        if let Some(merged) = page.first(".tag .merger a.tag") {
            self.resolve_inner(client, &merged.text(), visited)?;
        }
        Ok(self.entry(name).clone())
    }

    fn entry(&mut self, name: &str) -> &mut Tag {
        self.cache.entry(name.to_string()).or_insert_with(|| Tag::new(name))
    }

    /// Writes the cache to `path`, or the configured cache file when no
    /// path is given; a no-op when neither exists. Not transactional: the
    /// file is rewritten in place.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let Some(target) = path.or(self.cache_file.as_deref()) else {
            return Ok(()); // nothing to export
        };
        let mut file = CacheFile::default();
        for tag in self.cache.values() {
            match tag.common {
                Common::Unknown => {}
                Common::No => {
                    file.tags.insert(tag.name.clone(), false);
                }
                Common::Yes => {
                    file.tags.insert(tag.name.clone(), true);
                }
            }
            if let Some(canonical) = &tag.canonical {
                file.canon_map.insert(tag.name.clone(), canonical.clone());
            }
        }
        fs::write(target, serde_json::to_string(&file)?)?;
        Ok(())
    }

    /// Number of tag pages fetched so far by this resolver.
    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    /// Number of tag records currently cached.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for TagResolver {
    fn default() -> Self {
        Self::new()
    }
}
