//! Long-lived consumer: Kafka topic -> MovieRecord batches -> scylla sink
use std::{collections::HashMap, time::Duration};

use anyhow::{Context, Result};
use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    ClientConfig, Message, Offset, TopicPartitionList,
};
use tracing::{info, warn};

use crate::{record::MovieRecord, settings::Settings, sink::MovieSink};

pub struct Ingester {
    batch: Vec<MovieRecord>,
    batch_size: usize,
    batch_timeout: Duration,
    sink: MovieSink,
    consumer: StreamConsumer,
}

impl Ingester {
    /// Creates the consumer and the sink. Either connection failing is a
    /// startup error, the process reports it and exits without streaming.
    pub async fn new(settings: &Settings) -> Result<Ingester> {
        let group = settings.ingest.consumer_group.as_deref().unwrap_or("reelfeed");
        let session_timeout_ms = settings.ingest.session_timeout_ms.unwrap_or(6000);
        // offsets are the checkpoint: auto-commit is off, we commit after
        // the batch has been written to the sink
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &settings.kafka.broker)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", session_timeout_ms.to_string())
            .set("auto.offset.reset", "earliest")
            .create()
            .context("creating kafka consumer")?;
        consumer
            .subscribe(&[&settings.kafka.topic])
            .with_context(|| format!("subscribing to {}", settings.kafka.topic))?;

        let sink = MovieSink::connect(&settings.scylla).await?;

        info!(
            topic = %settings.kafka.topic,
            group,
            "ingester ready, consuming from earliest uncommitted offset"
        );
        Ok(Ingester {
            batch: Vec::new(),
            batch_size: settings.ingest.batch_size.unwrap_or(500),
            batch_timeout: Duration::from_secs(
                settings.ingest.batch_timeout_seconds.unwrap_or(10),
            ),
            sink,
            consumer,
        })
    }

    /// Runs until externally terminated.
    pub async fn run(&mut self) {
        loop {
            let tpl = self.next_batch().await;
            if tpl.count() + self.batch.len() == 0 {
                continue;
            }
            self.flush_batch(tpl).await;
        }
    }

    /// Writes the pending batch row by row, then commits offsets. A record
    /// the sink rejects is logged and skipped, the stream keeps going; its
    /// offset is still committed, so the record is lost (at-least-once with
    /// per-record drop, not a dead-letter queue).
    async fn flush_batch(&mut self, tpl: TopicPartitionList) {
        let mut written = 0usize;
        for record in self.batch.drain(..) {
            match self.sink.insert(&record).await {
                Ok(()) => written += 1,
                Err(e) => warn!(
                    title = %record.title,
                    year = %record.year,
                    "skipping record the sink rejected: {e:#}"
                ),
            }
        }
        info!(written, "batch written");
        self.consumer
            .commit(&tpl, rdkafka::consumer::CommitMode::Sync)
            .unwrap_or_else(|e| warn!("failed to commit offsets: {e}"));
    }

    /// Accumulates up to `batch_size` records or until `batch_timeout`,
    /// tracking the next offset to commit per partition. A message that
    /// does not parse as a MovieRecord is dropped with a warning.
    async fn next_batch(&mut self) -> TopicPartitionList {
        let mut next_offsets: HashMap<(String, i32), i64> = HashMap::new();
        while self.batch.len() < self.batch_size {
            match tokio::time::timeout(self.batch_timeout, self.consumer.recv()).await {
                Err(_) => {
                    break;
                }
                Ok(Err(e)) => {
                    warn!("error receiving message: {e}");
                    break;
                }
                Ok(Ok(msg)) => {
                    let k = (msg.topic().to_string(), msg.partition());
                    // commit the _next_ message's offset, per rdkafka's
                    // Consumer::commit contract
                    let next = msg.offset() + 1;
                    let entry = next_offsets.entry(k).or_insert(next);
                    if *entry < next {
                        *entry = next;
                    }
                    let payload = msg.payload().unwrap_or_default();
                    match decode_record(payload) {
                        Ok(record) => self.batch.push(record),
                        Err(e) => warn!(
                            offset = msg.offset(),
                            partition = msg.partition(),
                            "dropping undecodable message: {e}"
                        ),
                    };
                }
            }
        }
        let topic_map = next_offsets
            .into_iter()
            .map(|(k, next)| (k, Offset::from_raw(next)))
            .collect();
        TopicPartitionList::from_topic_map(&topic_map).unwrap_or_else(|e| {
            warn!("building offset list: {e}");
            TopicPartitionList::new()
        })
    }
}

fn decode_record(payload: &[u8]) -> Result<MovieRecord, serde_json::Error> {
    serde_json::from_slice(payload)
}

/// Entry point of the `ingest` subcommand.
pub async fn run_ingest(settings: &Settings) -> Result<()> {
    let mut ingester = Ingester::new(settings).await?;
    ingester.run().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_topic_payload() {
        let payload = br#"{
            "Title": "The Shawshank Redemption",
            "Year": "1994",
            "Director": "Frank Darabont",
            "Actors": "Tim Robbins, Morgan Freeman",
            "Plot": "Two imprisoned men bond over a number of years.",
            "Ratings": [{"Source": "Internet Movie Database", "Value": "9.3/10"}],
            "BoxOffice": "$28,884,232"
        }"#;
        let record = decode_record(payload).unwrap();
        assert_eq!(record.title, "The Shawshank Redemption");
        assert_eq!(record.ratings_map()["Internet Movie Database"], "9.3/10");
    }

    #[test]
    fn rejects_payload_missing_schema_fields() {
        assert!(decode_record(br#"{"Title": "incomplete"}"#).is_err());
        assert!(decode_record(b"not json").is_err());
        assert!(decode_record(b"").is_err());
    }
}
