pub mod balance;
pub mod leave;
pub mod role;
pub mod user;
