// src/main.rs
use std::time::Duration;

use ao_scrape::{
    cli,
    params::{Params, Query},
    Archive, ArchiveClient, Blurb, ClientConfig, Result, TagResolver,
};

fn main() {
    env_logger::init();
    let params = match cli::parse_cli() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = run(&params) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(params: &Params) -> Result<()> {
    let config = ClientConfig {
        root: params.root.clone(),
        username: params.username.clone(),
        password: params.password.clone(),
        fetch_interval: Duration::from_millis(params.interval_ms),
        cooldown: Duration::from_secs(params.cooldown_secs),
        retry_limit: params.retry_limit,
    };

    // A cache path that does not exist yet starts an empty cache but is
    // still configured as the save target, so the resolve session can
    // persist whatever it learned even when it fails partway.
    let cache_path = params.tag_cache.as_deref();
    let mut tags = match cache_path.filter(|p| p.exists()) {
        Some(path) => TagResolver::with_cache_file(path)?,
        None => TagResolver::new(),
    };
    if let Some(path) = cache_path {
        tags.set_cache_file(path);
    }
    let mut archive = Archive::with_client(ArchiveClient::new(config)?, tags);

    let blurbs = collect(&archive, params)?;
    let mut lines = Vec::with_capacity(blurbs.len());

    if params.resolve {
        let rendered = archive.resolve_session(|client, tags| {
            let mut out = Vec::with_capacity(blurbs.len());
            for blurb in &blurbs {
                let resolved = blurb.resolve_tags(client, tags)?;
                let canon: Vec<&str> = resolved.iter().map(|t| t.canonical_name()).collect();
                out.push(format!("{}\t{}", render(blurb), canon.join(", ")));
            }
            Ok(out)
        })?;
        lines.extend(rendered);
    } else {
        lines.extend(blurbs.iter().map(render));
    }

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn collect(archive: &Archive, params: &Params) -> Result<Vec<Blurb>> {
    let works = match params.query {
        Query::Search => archive.search(&params.terms)?,
        Query::TaggedWorks => {
            let tag = params.tag.as_deref().unwrap_or_default();
            archive.tagged_works(tag)?
        }
    };
    let limit = params.limit.unwrap_or(usize::MAX);
    works.take(limit).collect()
}

fn render(blurb: &Blurb) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        blurb.title,
        blurb.author.as_deref().unwrap_or("Anonymous"),
        blurb.words,
        blurb.rating,
        blurb.url,
    )
}
