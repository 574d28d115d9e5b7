pub mod html;
pub mod mime;
pub mod net;
