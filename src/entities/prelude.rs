pub use super::crop_analyses::Entity as CropAnalyses;
pub use super::users::Entity as Users;
