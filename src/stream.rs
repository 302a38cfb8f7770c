//! Scheduled produce loop: fetch -> normalize -> publish until the deadline
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    omdb::{MovieIdList, MovieSource, OmdbClient},
    publisher::{KafkaPublisher, Publish},
    record::MovieRecord,
    settings::Settings,
};

/// Outcome of one produce window, reported to the logs when the loop ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub published: usize,
    pub failed: usize,
}

/// Runs fetch->normalize->publish iterations until `window` has elapsed.
/// A failed iteration is logged and counted, never aborts the run, so the
/// loop always returns at the deadline even if every fetch fails.
pub async fn run<S, P>(
    ids: &MovieIdList,
    source: &S,
    publisher: &P,
    window: Duration,
) -> StreamStats
where
    S: MovieSource,
    P: Publish,
{
    let deadline = Instant::now() + window;
    let mut stats = StreamStats::default();
    while Instant::now() < deadline {
        let id = {
            let mut rng = rand::thread_rng();
            ids.choose(&mut rng).to_owned()
        };
        match iteration(&id, source, publisher).await {
            Ok(record) => {
                info!(%id, title = %record.title, "published record");
                stats.published += 1;
            }
            Err(e) => {
                warn!(%id, "iteration failed: {e:#}");
                stats.failed += 1;
            }
        }
    }
    stats
}

async fn iteration<S, P>(id: &str, source: &S, publisher: &P) -> Result<MovieRecord>
where
    S: MovieSource,
    P: Publish,
{
    let raw = source.fetch(id).await?;
    let record = MovieRecord::from_raw(&raw);
    publisher.publish(&record).await?;
    Ok(record)
}

/// Entry point of the `stream` subcommand, one bounded produce window.
pub async fn run_stream(settings: &Settings) -> Result<()> {
    let ids = MovieIdList::load(&settings.source.movie_ids_file)?;
    let source = OmdbClient::new(&settings.api)?;
    let max_block_ms = settings.stream.max_block_ms.unwrap_or(5000);
    let publisher = KafkaPublisher::new(&settings.kafka, max_block_ms)?;
    let window = Duration::from_secs(settings.stream.window_seconds.unwrap_or(10));

    info!(
        ids = ids.len(),
        topic = %settings.kafka.topic,
        window_seconds = window.as_secs(),
        "starting produce window"
    );
    let stats = run(&ids, &source, &publisher, window).await;
    publisher.flush().context("draining producer")?;
    info!(
        published = stats.published,
        failed = stats.failed,
        "produce window finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct FailingSource;

    impl MovieSource for FailingSource {
        async fn fetch(&self, _id: &str) -> Result<Value> {
            Err(anyhow!("api is down"))
        }
    }

    struct FixedSource(Value);

    impl MovieSource for FixedSource {
        async fn fetch(&self, _id: &str) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<MovieRecord>>,
    }

    impl Publish for RecordingPublisher {
        async fn publish(&self, record: &MovieRecord) -> Result<()> {
            self.sent.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct RejectingPublisher;

    impl Publish for RejectingPublisher {
        async fn publish(&self, _record: &MovieRecord) -> Result<()> {
            Err(anyhow!("broker unreachable"))
        }
    }

    fn id_list() -> MovieIdList {
        let path = std::env::temp_dir().join("reelfeed_stream_ids.json");
        std::fs::write(&path, r#"["tt0111161"]"#).unwrap();
        MovieIdList::load(&path).unwrap()
    }

    #[tokio::test]
    async fn terminates_at_deadline_when_every_fetch_fails() {
        let ids = id_list();
        let window = Duration::from_millis(50);
        let started = Instant::now();
        let stats = run(&ids, &FailingSource, &RecordingPublisher::default(), window).await;
        assert!(started.elapsed() >= window);
        assert_eq!(stats.published, 0);
        assert!(stats.failed > 0);
    }

    #[tokio::test]
    async fn publishes_normalized_records() {
        let ids = id_list();
        let source = FixedSource(json!({
            "Title": "The Shawshank Redemption",
            "Year": "1994",
            "Ratings": [{"Source": "Internet Movie Database", "Value": "9.3/10"}]
        }));
        let publisher = RecordingPublisher::default();
        let stats = run(&ids, &source, &publisher, Duration::from_millis(20)).await;
        assert!(stats.published > 0);
        assert_eq!(stats.failed, 0);
        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent[0].title, "The Shawshank Redemption");
        assert_eq!(sent[0].director, crate::record::NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn publish_failures_are_counted_not_fatal() {
        let ids = id_list();
        let source = FixedSource(json!({"Title": "Heat", "Year": "1995"}));
        let stats = run(&ids, &source, &RejectingPublisher, Duration::from_millis(20)).await;
        assert_eq!(stats.published, 0);
        assert!(stats.failed > 0);
    }
}
