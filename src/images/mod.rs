mod services;

pub use services::{cleanup_images, discard_images, upload_images};
