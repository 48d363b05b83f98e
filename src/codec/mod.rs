pub mod checksum;
pub mod field;

pub use checksum::{install_code_crc, record_crc, verify_install_code};
pub use field::{encode, encode_text, pack, Extent, FieldSpec, Scalar};
