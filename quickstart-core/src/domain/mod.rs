/// The users resource
pub mod users;
