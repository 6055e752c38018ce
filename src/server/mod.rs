mod handlers;
mod models;
mod ocr;
mod state;

pub use handlers::run_server;
pub use models::OcrResponse;
