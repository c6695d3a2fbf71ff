pub mod connection;

pub use connection::WsSource;
