pub mod instr;
pub mod program;
pub mod value;

pub use instr::instruction_parser;
pub use program::{function_file_parser, function_parser, program_parser, spill_file_parser};
