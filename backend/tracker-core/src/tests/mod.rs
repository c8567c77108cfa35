mod codec;
mod config;
mod dispatch;
mod outbound_routes;
mod queue;
