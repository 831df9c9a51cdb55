mod create_user;
mod init;
mod predict;

pub use create_user::cmd_create_user;
pub use init::cmd_init;
pub use predict::cmd_predict;
