mod user;
mod wish;
mod like;
mod comment;

pub use user::*;
pub use wish::*;
pub use like::*;
pub use comment::*;
