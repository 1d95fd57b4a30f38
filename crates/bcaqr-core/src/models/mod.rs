//! Data models for the QR Merchant BCA portal.
//!
//! - `Transaction`: a single incoming QR payment
//! - `LoginRequest`/`LoginResponse`: session endpoint wire types
//! - `TransactionListResponse`: transaction listing wire type

pub mod session;
pub mod transaction;

pub use session::{LoginRequest, LoginResponse, STATUS_SUCCESS};
pub use transaction::{Transaction, TransactionListResponse};
