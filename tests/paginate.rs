// tests/paginate.rs
//
// Listing traversal and the rate-limit retry loop.
//
mod common;

use std::time::{Duration, Instant};

use ao_scrape::error::Error;
use ao_scrape::net::ArchiveClient;
use ao_scrape::{Archive, Blurb, TagResolver};
use common::{blurb_li, index_page, test_config, Canned, ScriptedTransport};

fn archive_with(transport: ScriptedTransport) -> Archive {
    let client = ArchiveClient::with_transport(test_config(), Box::new(transport)).unwrap();
    Archive::with_client(client, TagResolver::new())
}

#[test]
fn paginate_walks_the_chain_and_terminates() {
    let (transport, log) = ScriptedTransport::new();
    let transport = transport
        .route(
            "/works/search",
            Canned::body(&index_page(
                &[blurb_li(1, "First"), blurb_li(2, "Second")],
                Some("/works?page=2"),
            )),
        )
        .route(
            "/works?page=2",
            Canned::body(&index_page(&[blurb_li(3, "Third")], Some("/works?page=3"))),
        )
        .route("/works?page=3", Canned::body(&index_page(&[], None)));
    let archive = archive_with(transport);

    let terms = vec![("query".to_string(), "fluff".to_string())];
    let works: Vec<Blurb> = archive
        .search(&terms)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let titles: Vec<&str> = works.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["First", "Second", "Third"]);
    assert_eq!(log.borrow().len(), 3, "one fetch per page, then stop");
}

#[test]
fn dropping_the_iterator_early_stops_fetching() {
    let (transport, log) = ScriptedTransport::new();
    let transport = transport.route(
        "/works/search",
        Canned::body(&index_page(
            &[blurb_li(1, "First"), blurb_li(2, "Second")],
            Some("/works?page=2"),
        )),
    );
    let archive = archive_with(transport);

    let terms = vec![("query".to_string(), "fluff".to_string())];
    let mut works = archive.search(&terms).unwrap();
    let first = works.next().unwrap().unwrap();
    assert_eq!(first.title, "First");
    drop(works);
    assert_eq!(log.borrow().len(), 1, "the next page must not be fetched");
}

#[test]
fn entryless_page_still_follows_its_next_link() {
    let (transport, log) = ScriptedTransport::new();
    let transport = transport
        .route(
            "/tags/Fluff/works",
            Canned::body(&index_page(&[], Some("/works?page=2"))),
        )
        .route("/works?page=2", Canned::body(&index_page(&[blurb_li(9, "Only")], None)));
    let archive = archive_with(transport);

    let works: Vec<Blurb> = archive
        .tagged_works("Fluff")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(works.len(), 1);
    assert_eq!(works[0].title, "Only");
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn rate_limit_is_absorbed_by_cooldown_retries() {
    let (transport, log) = ScriptedTransport::new();
    let transport = transport
        .push(Canned::body("Retry later, you have been rate limited"))
        .push(Canned::body("Retry later, you have been rate limited"))
        .push(Canned::body(&index_page(&[blurb_li(1, "Patience")], None)));
    let archive = archive_with(transport);

    let start = Instant::now();
    let works: Vec<Blurb> = archive
        .tagged_works("Fluff")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(works.len(), 1);
    assert_eq!(works[0].title, "Patience");
    assert_eq!(log.borrow().len(), 3);
    // Two sentinel responses mean two full cooldown waits (25 ms each here).
    assert!(elapsed >= Duration::from_millis(50), "waited only {elapsed:?}");
}

#[test]
fn bounded_retries_surface_an_error() {
    let (transport, log) = ScriptedTransport::new();
    let transport = transport
        .push(Canned::body("Retry later"))
        .push(Canned::body("Retry later"))
        .push(Canned::body("Retry later"));
    let mut config = test_config();
    config.retry_limit = Some(2);
    let client = ArchiveClient::with_transport(config, Box::new(transport)).unwrap();

    match client.fetch_page("/works/search", &[]) {
        Err(Error::RateLimited { attempts }) => assert_eq!(attempts, 2),
        Err(other) => panic!("expected RateLimited, got {other:?}"),
        Ok(_) => panic!("expected RateLimited, got a page"),
    }
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn transport_errors_propagate_without_retry() {
    let (transport, log) = ScriptedTransport::new();
    let archive = archive_with(transport); // no routes: every request refused

    match archive.tagged_works("Fluff") {
        Err(Error::Transport(_)) => {}
        Err(other) => panic!("expected Transport error, got {other:?}"),
        Ok(_) => panic!("expected Transport error, got a listing"),
    }
    assert_eq!(log.borrow().len(), 1);
}
