pub mod html;
pub mod instagram;
pub mod json;
pub mod youtube;
