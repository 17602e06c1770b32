pub mod index_db;
pub mod index_store;
