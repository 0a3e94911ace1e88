pub mod adapter;
pub mod http;
pub mod traits;
