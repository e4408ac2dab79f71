pub mod coinbase;
pub mod still_image;
pub mod tesseract;
pub mod test_mode;
