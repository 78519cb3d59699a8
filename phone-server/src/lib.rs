//! Phone Server Library
//!
//! Local HTTP API that exposes expense CRUD endpoints with a fixed routing
//! contract. Persistence is delegated to an [`ExpenseStore`]; the default
//! stub keeps nothing.

pub mod net;
pub mod payload;
pub mod routes;
pub mod server;
pub mod store;

pub use routes::router;
pub use server::{
    PhoneServer, ServerConfig, ServerError, ServerInfo, ServerStatus, StartOutcome, StopOutcome,
};
pub use store::{Expense, ExpenseStore, StoreError, StubExpenseStore};
