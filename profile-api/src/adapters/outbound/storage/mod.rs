mod local;

pub use local::LocalStorageProvider;
