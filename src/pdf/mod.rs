pub mod archive;
pub mod optimizer;
pub mod writer;
