#![recursion_limit = "300"]

pub mod format;
pub mod nbt;
pub mod protocol;
pub mod types;

use craftlink_shared as shared;
