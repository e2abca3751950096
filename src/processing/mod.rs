//! Processing module - pluggable reduction strategies over reading windows

mod average;
mod registry;
mod rolling_average;
mod summary;
mod window;

pub use average::AverageProcessor;
pub use registry::ProcessorRegistry;
pub use rolling_average::RollingAverageProcessor;
pub use summary::{round2, ChannelSummary};
pub use window::TimeWindow;

use serde::{Deserialize, Serialize};

use crate::error::ProcessError;
use crate::sensors::ReadingSample;

/// Open-ended metrics map produced by a processor
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Name, version and description of a registered processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// A reduction algorithm from a window of readings to a metrics payload.
///
/// Implementations must be pure: no I/O, no retained state between calls. Adding
/// a variant only needs an implementation and a registry entry.
pub trait Processor: Send + Sync {
    /// Registry key and the name recorded on results
    fn name(&self) -> &'static str;

    /// Semantic version recorded on results
    fn version(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn info(&self) -> ProcessorInfo {
        ProcessorInfo {
            name: self.name().to_string(),
            version: self.version().to_string(),
            description: self.description().to_string(),
        }
    }

    /// Reduce `readings` selected for `window`.
    ///
    /// An empty slice is a normal input and yields `null` averages with a zero count.
    fn process(
        &self,
        readings: &[ReadingSample],
        window: &TimeWindow,
        sensor_type: &str,
        device_id: Option<&str>,
    ) -> Result<Payload, ProcessError>;
}
