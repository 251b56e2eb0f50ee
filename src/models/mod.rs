mod category;
mod flash;
mod form;
mod listing;
mod product;
mod selection;
mod user;

pub use category::*;
pub use flash::*;
pub use form::*;
pub use listing::*;
pub use product::*;
pub use selection::*;
pub use user::*;
