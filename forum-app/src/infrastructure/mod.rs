pub mod db;
pub mod locking;
