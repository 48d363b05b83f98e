pub mod builder;
pub mod serialiser;
pub mod types;

pub use builder::{BuildOutcome, RecordBuilder};
pub use serialiser::{ArtifactHeader, LayoutSerialiser};
pub use types::{ConfigRecord, DeviceConfig, ManufacturerBlock};
