pub mod approval;
pub mod attendance;
pub mod notification;
pub mod permission;
pub mod user;
