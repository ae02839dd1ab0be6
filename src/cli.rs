// src/cli.rs
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::params::{Params, Query};

pub fn parse_cli() -> Result<Params> {
    let mut params = Params::new();
    let mut args = env::args().skip(1).peekable();

    if args.peek().is_none() {
        eprintln!(include_str!("cli_help.txt"));
        std::process::exit(2);
    }

    while let Some(a) = args.next() {
        match a.as_str() {
            "-s" | "--search" => {
                params.query = Query::Search;
                while let Some(next) = args.peek() {
                    let Some((key, value)) = next.split_once('=') else { break };
                    params.terms.push((key.to_string(), value.to_string()));
                    args.next();
                }
                if params.terms.is_empty() {
                    return Err(err("--search needs at least one key=value term"));
                }
            }
            "-t" | "--tag" => {
                params.query = Query::TaggedWorks;
                params.tag = Some(args.next().ok_or_else(|| err("Missing tag name"))?);
            }
            "-n" | "--limit" => {
                let v = args.next().ok_or_else(|| err("Missing value for --limit"))?;
                params.limit = Some(v.parse().map_err(|_| err("Bad value for --limit"))?);
            }
            "-r" | "--resolve" => params.resolve = true,
            "--tag-cache" => {
                let v = args.next().ok_or_else(|| err("Missing path for --tag-cache"))?;
                params.tag_cache = Some(PathBuf::from(v));
            }
            "--root" => params.root = args.next().ok_or_else(|| err("Missing value for --root"))?,
            "--interval" => {
                let v = args.next().ok_or_else(|| err("Missing value for --interval"))?;
                let secs: f64 = v.parse().map_err(|_| err("Bad value for --interval"))?;
                if !(0.0..=3600.0).contains(&secs) {
                    return Err(err("Interval out of range (0..=3600 seconds)"));
                }
                params.interval_ms = (secs * 1000.0) as u64;
            }
            "--cooldown" => {
                let v = args.next().ok_or_else(|| err("Missing value for --cooldown"))?;
                params.cooldown_secs = v.parse().map_err(|_| err("Bad value for --cooldown"))?;
            }
            "--max-retries" => {
                let v = args.next().ok_or_else(|| err("Missing value for --max-retries"))?;
                let n: u32 = v.parse().map_err(|_| err("Bad value for --max-retries"))?;
                if n == 0 {
                    return Err(err("--max-retries must be at least 1"));
                }
                params.retry_limit = Some(n);
            }
            "-u" | "--user" => {
                params.username = Some(args.next().ok_or_else(|| err("Missing user name"))?);
            }
            "-p" | "--password" => {
                params.password = Some(args.next().ok_or_else(|| err("Missing password"))?);
            }
            "-h" | "--help" => {
                eprintln!(include_str!("cli_help.txt"));
                std::process::exit(0);
            }
            other => return Err(err(&format!("Unknown arg: {other}"))),
        }
    }

    match params.query {
        Query::Search if params.terms.is_empty() => {
            Err(err("Nothing to do: give --search terms or --tag"))
        }
        Query::TaggedWorks if params.tag.is_none() => Err(err("Missing tag name")),
        _ => Ok(params),
    }
}

fn err(msg: &str) -> Error {
    Error::Config(msg.to_string())
}
