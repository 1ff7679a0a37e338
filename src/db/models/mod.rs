//! Database entity models and request/response DTOs.

mod case_study;
mod favorite;
mod notification;
mod user;

pub use case_study::*;
pub use favorite::*;
pub use notification::*;
pub use user::*;
