pub mod decoder;
pub mod framer;
pub mod reducer;

pub use decoder::Utf8StreamDecoder;
pub use framer::{ parse_line, EventFramer, DATA_PREFIX };
pub use reducer::{ Flow, StreamReducer };
