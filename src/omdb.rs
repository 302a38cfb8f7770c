//! Identifier list and OMDb metadata fetcher
use std::{fs, future::Future, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use rand::{seq::SliceRandom, Rng};
use serde_json::Value;

use crate::settings;

/// Immutable list of movie identifiers, scraped offline and loaded once.
pub struct MovieIdList(Vec<String>);

impl MovieIdList {
    /// Reads a JSON array of strings, e.g. `["tt0111161", "tt0068646"]`.
    pub fn load(path: impl AsRef<Path>) -> Result<MovieIdList> {
        let path = path.as_ref();
        let raw = fs::read(path)
            .with_context(|| format!("reading movie id list {}", path.display()))?;
        let ids: Vec<String> = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing movie id list {}", path.display()))?;
        if ids.is_empty() {
            return Err(anyhow!("movie id list {} is empty", path.display()));
        }
        Ok(MovieIdList(ids))
    }

    pub fn choose<R: Rng>(&self, rng: &mut R) -> &str {
        // list is checked non-empty at load
        self.0.choose(rng).map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Something that can turn an identifier into a raw metadata record.
/// The produce loop is generic over this so its deadline behavior can be
/// tested without the network.
pub trait MovieSource {
    fn fetch(&self, id: &str) -> impl Future<Output = Result<Value>> + Send;
}

/// OMDb API client. One GET per fetch, bounded by the configured timeout.
pub struct OmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(cfg: &settings::Api) -> Result<OmdbClient> {
        let timeout = Duration::from_secs(cfg.timeout_seconds.unwrap_or(10));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(OmdbClient {
            http,
            base_url: cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "http://www.omdbapi.com/".to_owned()),
            api_key: cfg.key.clone(),
        })
    }
}

impl MovieSource for OmdbClient {
    async fn fetch(&self, id: &str) -> Result<Value> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[("i", id), ("apikey", &self.api_key)])
            .send()
            .await
            .with_context(|| format!("fetching movie {id}"))?
            .error_for_status()
            .with_context(|| format!("fetching movie {id}"))?;
        resp.json()
            .await
            .with_context(|| format!("decoding response for movie {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn write_tmp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_id_list() {
        let path = write_tmp("reelfeed_ids.json", r#"["tt0111161", "tt0068646"]"#);
        let ids = MovieIdList::load(&path).unwrap();
        assert_eq!(ids.len(), 2);
        let picked = ids.choose(&mut rand::thread_rng());
        assert!(picked == "tt0111161" || picked == "tt0068646");
    }

    #[test]
    fn rejects_empty_list() {
        let path = write_tmp("reelfeed_ids_empty.json", "[]");
        assert!(MovieIdList::load(&path).is_err());
    }

    #[test]
    fn rejects_malformed_list() {
        let path = write_tmp("reelfeed_ids_bad.json", r#"{"not": "a list"}"#);
        assert!(MovieIdList::load(&path).is_err());
    }
}
