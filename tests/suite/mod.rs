mod activation;
mod config;
mod stdio;
