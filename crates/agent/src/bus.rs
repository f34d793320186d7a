//! Message-bus publish seam.
//!
//! The MQTT client is owned by the wider agent process and shared with other
//! subsystems; the detector only needs publish. Implementations must be safe
//! for concurrent publish.

use anyhow::Result;

/// Quality-of-service level for a publish.
pub type Qos = u8;

pub trait MessageBus: Send + Sync {
    fn publish(&self, topic: &str, qos: Qos, retained: bool, payload: &[u8]) -> Result<()>;
}
