pub mod app;
pub mod poller;
pub mod terminal;
pub mod ui;
