//! Repository ports (interfaces). Implementations live under
//! `database::infrastructure`.

/// User collection port
pub mod users;
