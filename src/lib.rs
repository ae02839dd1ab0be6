// src/lib.rs

pub mod archive;
pub mod blurb;
pub mod cli;
pub mod dom;
pub mod error;
pub mod limit;
pub mod net;
pub mod params;
pub mod tags;

pub use archive::{Archive, Works};
pub use blurb::Blurb;
pub use error::{Error, Result};
pub use net::{ArchiveClient, ClientConfig};
pub use tags::{Common, Tag, TagResolver};
