// ABOUTME: Command module aggregator for the cosimport CLI.
// ABOUTME: Re-exports apply, reconcile, delete, and status command handlers.

mod apply;
mod delete;
mod reconcile;
mod status;
mod workspace;

pub use apply::apply;
pub use delete::delete;
pub use reconcile::reconcile;
pub use status::status;
