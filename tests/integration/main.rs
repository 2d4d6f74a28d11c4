//! Integration tests: full brackets through the public library API.

mod mock_store;
mod tournament;
