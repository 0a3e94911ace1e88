pub mod connectivity;
pub mod mutation;
pub mod poller;
