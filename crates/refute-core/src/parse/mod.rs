pub mod block;

pub use block::{parse_block_text, parse_record, BlockTriple};
