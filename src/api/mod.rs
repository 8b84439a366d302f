pub mod cache;
pub mod cached_client;
pub mod endpoint;
pub mod mock;
pub mod remote;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cached_client::TransactionClient;
pub use endpoint::Endpoint;
pub use mock::{Dataset, MockRemote};
pub use remote::RemoteSource;
