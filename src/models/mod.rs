//! Data models for Libris

pub mod actor;
pub mod book;
pub mod borrowing;
pub mod event;
pub mod fine;
pub mod payment;

// Re-export commonly used types
pub use actor::Actor;
pub use book::{Book, CoverType};
pub use borrowing::{Borrowing, BorrowingDetails};
pub use event::Event;
pub use fine::{FineRecord, FineStatus};
pub use payment::{ObligationKind, PaymentRecord, PaymentStatus};
