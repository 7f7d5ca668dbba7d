mod address;
mod auth;
mod config;
mod dispatch;
mod reconnect;
mod support;
