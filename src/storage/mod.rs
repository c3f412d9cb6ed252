mod saved;
mod schema;
mod types;

pub use saved::ArticleStore;
pub use schema::Database;
pub use types::DatabaseError;
