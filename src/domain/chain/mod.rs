pub mod book;

pub use book::{owner_address, ChainBook, ChainEntry, ChainError};
