mod json_file;
pub use json_file::LoadError;

mod request;
pub use request::Request;

mod user_db;
pub use user_db::UserDb;

mod verb_db;
pub use verb_db::VerbDb;
