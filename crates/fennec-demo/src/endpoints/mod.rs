pub mod files;
pub mod products;
pub mod system;
pub mod users;

pub use files::{AddImageToMoment, UploadImage, UploadMultipleFiles, UploadVideo};
pub use products::{DeleteProduct, GetProducts};
pub use system::{GetHealth, GetLaps, GetSecureData, TestQueryBinding};
pub use users::{CreateUser, DeleteUser, GetUser, SearchUsers, UpdateUser, UpdateUserStatus};
