#[derive(Debug, PartialEq, Eq)]
pub enum FindError {
    NotFound,
    Internal,
}

mod backend_sql;
pub use backend_sql::*;
