pub mod prelude;

pub mod crop_analyses;
pub mod users;
