pub mod postgres;
pub mod storage;
