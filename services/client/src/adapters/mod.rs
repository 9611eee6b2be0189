pub mod postgres;
pub mod rest;
pub mod stub;

pub use postgres::PgBackend;
pub use rest::RestBackend;
pub use stub::StubBackend;
