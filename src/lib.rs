pub mod app;

pub use app::LivecapApp;
