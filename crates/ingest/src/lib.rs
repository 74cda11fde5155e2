pub mod classify;
pub mod decode;
pub mod emit;
pub mod forward;
pub mod parser;
pub mod pipeline;
