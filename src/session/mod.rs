pub mod delete;
pub mod edit;

pub use delete::{ConfirmResponse, DeleteConfirmation, DeleteState};
pub use edit::{EditSession, EditState};
