//! Kafka publisher for normalized records
use std::{future::Future, time::Duration};

use anyhow::{anyhow, Context, Result};
use rdkafka::{
    producer::{FutureProducer, FutureRecord, Producer},
    ClientConfig,
};

use crate::{record::MovieRecord, settings};

/// Something that can put a record onto the message channel.
pub trait Publish {
    fn publish(&self, record: &MovieRecord) -> impl Future<Output = Result<()>> + Send;
}

pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(cfg: &settings::Kafka, max_block_ms: u64) -> Result<KafkaPublisher> {
        // message.timeout.ms bounds how long a record may sit undelivered,
        // so a broker outage fails the iteration instead of hanging the loop
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &cfg.broker)
            .set("message.timeout.ms", max_block_ms.to_string())
            .create()
            .context("creating kafka producer")?;
        Ok(KafkaPublisher {
            producer,
            topic: cfg.topic.clone(),
            send_timeout: Duration::from_millis(max_block_ms),
        })
    }

    /// Drains buffered messages at the end of a produce window.
    pub fn flush(&self) -> Result<()> {
        self.producer
            .flush(self.send_timeout)
            .context("flushing kafka producer")
    }
}

impl Publish for KafkaPublisher {
    async fn publish(&self, record: &MovieRecord) -> Result<()> {
        let payload = serde_json::to_vec(record).context("encoding record")?;
        // no key: partition assignment is left to the producer (round-robin)
        let rec = FutureRecord::<str, [u8]>::to(&self.topic).payload(payload.as_slice());
        self.producer
            .send(rec, self.send_timeout)
            .await
            .map_err(|(e, _)| anyhow!("publishing to {}: {e}", self.topic))?;
        Ok(())
    }
}
