//! ## reelfeed
//! Streaming pipeline that feeds OMDb movie metadata through Kafka into ScyllaDB.
//!
//! ## Shape
//! Two processes share one binary:
//! * `reelfeed stream` runs one bounded produce window: for a fixed number of
//!   seconds it picks random ids from a pre-scraped list, fetches metadata
//!   from OMDb, normalizes it into [MovieRecord] and publishes the JSON
//!   encoding to a Kafka topic. Meant to be invoked on a schedule (cron,
//!   Airflow, a systemd timer). A failed iteration is logged and the loop
//!   moves on, so one bad fetch never aborts the window.
//! * `reelfeed ingest` is a long-lived consumer that reads the topic from the
//!   earliest uncommitted offset, batches records and upserts them into a
//!   scylla table keyed by `(title, year)`. Offsets are committed only after
//!   the batch has been written, giving at-least-once delivery on top of an
//!   idempotent upsert.
//!
//! ## Configuration
//! Example config:
//! ```toml
//! [api]
//! key = "changeme"              # or REELFEED__API__KEY
//!
//! [source]
//! movie_ids_file = "data/movie_ids.json"
//!
//! [kafka]
//! broker = "localhost:9092"
//! topic = "movie_data"
//!
//! [stream]
//! window_seconds = 10
//!
//! [ingest]
//! batch_size = 500
//!
//! [scylla]
//! node = "127.0.0.1:9042"
//! keyspace = "reelfeed"
//! table = "movies"
//! ```
//!
//! [MovieRecord]: record::MovieRecord

pub mod ingester;
pub mod omdb;
pub mod publisher;
pub mod record;
pub mod settings;
pub mod sink;
pub mod stream;
