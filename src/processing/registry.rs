// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Name-to-processor lookup table

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{AverageProcessor, Processor, ProcessorInfo, RollingAverageProcessor};
use crate::error::AggregationError;

/// Processors by name. Built once at startup, then shared read-only behind an `Arc`.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<&'static str, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `average` and `rolling_average` processors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AverageProcessor));
        registry.register(Arc::new(RollingAverageProcessor));
        registry
    }

    /// Add a processor under its own name, replacing any previous entry
    pub fn register(&mut self, processor: Arc<dyn Processor>) {
        debug!("Registered processor '{}' v{}", processor.name(), processor.version());
        self.processors.insert(processor.name(), processor);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Processor>, AggregationError> {
        self.processors
            .get(name)
            .cloned()
            .ok_or_else(|| AggregationError::UnknownProcessor(name.to_string()))
    }

    /// Processor descriptions sorted by name
    pub fn list(&self) -> Vec<ProcessorInfo> {
        let mut infos: Vec<ProcessorInfo> = self.processors.values().map(|p| p.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessError;
    use crate::processing::{Payload, TimeWindow};
    use crate::sensors::ReadingSample;

    struct CountOnly;

    impl Processor for CountOnly {
        fn name(&self) -> &'static str {
            "count"
        }

        fn version(&self) -> &'static str {
            "0.1.0"
        }

        fn description(&self) -> &'static str {
            "Count readings"
        }

        fn process(
            &self,
            readings: &[ReadingSample],
            _window: &TimeWindow,
            _sensor_type: &str,
            _device_id: Option<&str>,
        ) -> Result<Payload, ProcessError> {
            let mut payload = Payload::new();
            payload.insert("count".into(), readings.len().into());
            Ok(payload)
        }
    }

    #[test]
    fn test_defaults_are_listed_by_name() {
        let registry = ProcessorRegistry::with_defaults();
        let names: Vec<String> = registry.list().into_iter().map(|i| i.name).collect();

        assert_eq!(names, vec!["average", "rolling_average"]);
        assert_eq!(registry.get("average").unwrap().version(), "1.0.0");
    }

    #[test]
    fn test_unknown_name_is_a_client_error() {
        let registry = ProcessorRegistry::with_defaults();

        let err = registry.get("median").err().unwrap();
        assert!(matches!(err, AggregationError::UnknownProcessor(ref name) if name == "median"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_register_custom_processor() {
        let mut registry = ProcessorRegistry::with_defaults();
        registry.register(Arc::new(CountOnly));

        let names: Vec<String> = registry.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["average", "count", "rolling_average"]);
        assert_eq!(registry.get("count").unwrap().description(), "Count readings");
    }
}
