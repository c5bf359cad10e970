//! A MessagePack encoder/decoder: a dynamic `Value` tree, a registry for
//! mapping host types onto ext ids, and in-memory/file-backed streaming
//! handles for incremental encode/decode.

mod buffer;
mod cursor;
mod decode;
mod encode;
mod error;
mod ext;
mod file_stream;
mod stream;
mod tag;
mod value;

pub use decode::DecodeOptions;
pub use decode::decode;
pub use decode::decode_host_value;
pub use encode::EncodeOptions;
pub use encode::encode;
pub use encode::encode_host_value;
pub use error::Error;
pub use error::Result;
pub use ext::ExtValue;
pub use ext::Extensions;
pub use ext::default_extensions;
pub use file_stream::FileStream;
pub use stream::Stream;
pub use value::Value;

#[cfg(test)]
mod tests;
