pub mod isbn;
pub mod issn;

pub use isbn::{Isbn, is_valid_isbn10, is_valid_isbn13, normalize_isbn};
pub use issn::{Issn, is_valid_issn, normalize_issn};
