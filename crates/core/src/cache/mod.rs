pub mod key;
pub mod query_cache;
pub mod value;
