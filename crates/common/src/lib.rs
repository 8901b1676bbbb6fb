pub mod clickhouse;
pub mod domain;
pub mod nats;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockEnvelopeProducer;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockLogIdGenerator;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockLogRecordRepository;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockJetStreamConsumer;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockJetStreamPublisher;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockMessageAcker;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockPullConsumer;
