//! Attribution code handling: validation, embedding and test stubs

pub mod code;
pub mod fixture;
pub mod writer;

pub use code::{AttributionCode, MAX_RAW_CODE_LEN, REQUIRED_KEYS, validate};
pub use fixture::{Bitness, generate_stub};
pub use writer::{
    attribute, read_attribution, read_payload, write_attribution, write_payload,
};
