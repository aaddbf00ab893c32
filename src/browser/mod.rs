pub mod chrome;
pub mod page;
pub mod probe;

pub use chrome::ChromeDriver;
pub use page::ExplorerPage;
