mod app;
mod error;
