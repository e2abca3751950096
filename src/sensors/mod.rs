//! Sensor readings - records, ingestion validation and the demo simulator

mod reading;
mod simulator;

pub use reading::{
    Metadata, NewReading, Reading, ReadingSample, HUMIDITY_RANGE, MAX_DEVICE_ID_LEN,
    PRESSURE_RANGE, TEMPERATURE_RANGE,
};
pub use simulator::ReadingSimulator;
