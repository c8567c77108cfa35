mod config_store;
mod etvr;
mod helpers;
mod http;
mod receiver;
mod sender;
