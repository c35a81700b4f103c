//! Agent loop: the turn loop, its results and its event stream.

pub mod events;
pub mod interpreter;
pub mod runner;
pub mod stream;
pub mod types;

pub use events::*;
pub use interpreter::{extract_final_output, parse_response_items, parse_structured_output};
pub use runner::*;
pub use stream::RunStream;
pub use types::*;
