pub mod map;
pub use self::map::Map;
