pub mod driver;
pub mod single;
pub mod table;

pub use driver::{BatchDriver, BatchOptions, BatchSummary, WrittenArtifact};
pub use single::SingleDevice;
pub use table::{DeviceRow, DeviceTable};
