mod config;
mod lifecycle;
mod sessions;
