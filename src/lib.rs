use anyhow::Error;

pub mod io;
pub mod phyloxml;
pub mod tree;

mod macros;

type Result<T> = std::result::Result<T, Error>;
