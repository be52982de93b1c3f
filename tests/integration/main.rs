//! Integration tests for the decision loop against in-memory
//! collaborators.

mod decision_loop;
mod mock_exchange;
