//! # docstore codec
//!
//! Document values and their canonical CBOR form.
//!
//! This crate provides:
//! - [`Value`], the dynamic value stored in document fields
//! - [`FieldPath`], dotted paths into nested maps (`meta.owner`)
//! - canonical CBOR encoding used by the persistent change log
//!
//! ## Canonical rules
//!
//! - Map keys are sorted length-first, then bytewise
//! - Integers use the shortest encoding
//! - Floats and tags are rejected
//!
//! ```
//! use docstore_codec::{from_cbor, to_canonical_cbor, Value};
//!
//! let doc = Value::text_map([("titulo", Value::from("Acta"))]);
//! let bytes = to_canonical_cbor(&doc).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), doc);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod path;
mod value;

pub use cbor::{from_cbor, to_canonical_cbor};
pub use error::{CodecError, CodecResult};
pub use path::FieldPath;
pub use value::Value;

/// Types with a canonical CBOR encoding.
pub trait Encode {
    /// Encode to canonical CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Types decodable from CBOR bytes.
pub trait Decode: Sized {
    /// Decode from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_canonical_cbor(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}
