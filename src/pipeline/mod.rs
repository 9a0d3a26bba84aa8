pub mod assembler;
pub mod batch;
pub mod file_processor;
pub mod naming;
pub mod workspace;
