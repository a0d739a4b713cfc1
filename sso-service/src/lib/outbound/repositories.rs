pub mod app;
pub mod memory;
pub mod user;

pub use app::PostgresAppRepository;
pub use memory::InMemoryAppRepository;
pub use memory::InMemoryUserRepository;
pub use user::PostgresUserRepository;
