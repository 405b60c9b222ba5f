pub mod helpers;
pub mod mock_fetcher;
pub mod mock_oracle;

pub use helpers::*;
pub use mock_fetcher::{Chunk, MockFetcher, ScriptedResponse};
pub use mock_oracle::MockBalanceOracle;
