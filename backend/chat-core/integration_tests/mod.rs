mod channel;
mod config;
mod errors;
mod helpers;
mod upload;
