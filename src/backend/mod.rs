//! Backend Module
//!
//! Connection to the Redis backing store: the RESP codec, the connection
//! halves and the pipeline that multiplexes concurrent reads onto them.

mod connection;
mod pipeline;
pub mod resp;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{
    dial, from_stream, CommandWriter, ReplyReader, RespReader, RespWriter, TcpConnection,
};
pub use pipeline::PipelineAdapter;
