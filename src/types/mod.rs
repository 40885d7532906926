mod news;

pub use news::{NewsFields, NewsRecord};
