//! Application config
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// OMDb API access
#[derive(Deserialize)]
pub struct Api {
    /// API endpoint (default: http://www.omdbapi.com/)
    pub base_url: Option<String>,
    /// API key, usually supplied via REELFEED__API__KEY
    pub key: String,
    /// per-request timeout (default: 10s)
    pub timeout_seconds: Option<u64>,
}

#[derive(Deserialize)]
pub struct Source {
    /// JSON array of movie identifiers, produced offline, read-only
    pub movie_ids_file: String,
}

#[derive(Deserialize)]
pub struct Kafka {
    /// address of bootstrap kafka broker
    pub broker: String,
    /// topic carrying MovieRecord JSON payloads
    pub topic: String,
}

/// Settings of the scheduled produce loop
#[derive(Deserialize)]
pub struct Stream {
    /// wall-clock budget of one invocation (default: 10s)
    pub window_seconds: Option<u64>,
    /// max time a single publish may block (default: 5000ms)
    pub max_block_ms: Option<u64>,
}

/// Settings of the long-lived consumer
#[derive(Deserialize)]
pub struct Ingest {
    /// consumer group to use (default: "reelfeed")
    pub consumer_group: Option<String>,
    /// max sink write batch size (default: 500)
    pub batch_size: Option<usize>,
    /// batching timeout (default: 10s)
    pub batch_timeout_seconds: Option<u64>,
    /// kafka session timeout (default: 6000ms)
    pub session_timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
pub struct Scylla {
    /// address of one contact node
    pub node: String,
    /// keyspace to ingest into (default: "reelfeed")
    pub keyspace: Option<String>,
    /// table to ingest into (default: "movies")
    pub table: Option<String>,
}

#[derive(Deserialize)]
pub struct Settings {
    pub api: Api,
    pub source: Source,
    pub kafka: Kafka,
    pub stream: Stream,
    pub ingest: Ingest,
    pub scylla: Scylla,
}

impl Settings {
    pub fn new(cfgfile: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(cfgfile).required(true))
            .add_source(Environment::with_prefix("REELFEED").separator("__"))
            .build()?;
        let mut settings: Settings = cfg.try_deserialize()?;
        settings.apply_defaults();
        Ok(settings)
    }

    fn apply_defaults(&mut self) {
        self.api.base_url = match &self.api.base_url {
            None => Some("http://www.omdbapi.com/".to_owned()),
            Some(x) => Some(x.to_owned()),
        };
        self.api.timeout_seconds = self.api.timeout_seconds.or(Some(10));
        self.stream.window_seconds = self.stream.window_seconds.or(Some(10));
        self.stream.max_block_ms = self.stream.max_block_ms.or(Some(5000));
        self.ingest.consumer_group = match &self.ingest.consumer_group {
            None => Some("reelfeed".to_owned()),
            Some(x) => Some(x.to_owned()),
        };
        self.ingest.batch_size = self.ingest.batch_size.or(Some(500));
        self.ingest.batch_timeout_seconds = self.ingest.batch_timeout_seconds.or(Some(10));
        self.ingest.session_timeout_ms = self.ingest.session_timeout_ms.or(Some(6000));
        self.scylla.keyspace = match &self.scylla.keyspace {
            None => Some("reelfeed".to_owned()),
            Some(x) => Some(x.to_owned()),
        };
        self.scylla.table = match &self.scylla.table {
            None => Some("movies".to_owned()),
            Some(x) => Some(x.to_owned()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Settings {
        Settings {
            api: Api { base_url: None, key: "k".into(), timeout_seconds: None },
            source: Source { movie_ids_file: "data/movie_ids.json".into() },
            kafka: Kafka { broker: "localhost:9092".into(), topic: "movie_data".into() },
            stream: Stream { window_seconds: None, max_block_ms: None },
            ingest: Ingest {
                consumer_group: None,
                batch_size: None,
                batch_timeout_seconds: None,
                session_timeout_ms: None,
            },
            scylla: Scylla { node: "127.0.0.1:9042".into(), keyspace: None, table: None },
        }
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let mut s = minimal();
        s.apply_defaults();
        assert_eq!(s.api.base_url.as_deref(), Some("http://www.omdbapi.com/"));
        assert_eq!(s.stream.window_seconds, Some(10));
        assert_eq!(s.stream.max_block_ms, Some(5000));
        assert_eq!(s.ingest.consumer_group.as_deref(), Some("reelfeed"));
        assert_eq!(s.ingest.batch_size, Some(500));
        assert_eq!(s.scylla.keyspace.as_deref(), Some("reelfeed"));
        assert_eq!(s.scylla.table.as_deref(), Some("movies"));
    }

    #[test]
    fn defaults_keep_explicit_values() {
        let mut s = minimal();
        s.stream.window_seconds = Some(30);
        s.ingest.consumer_group = Some("staging".into());
        s.apply_defaults();
        assert_eq!(s.stream.window_seconds, Some(30));
        assert_eq!(s.ingest.consumer_group.as_deref(), Some("staging"));
    }
}
