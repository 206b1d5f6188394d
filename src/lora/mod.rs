pub mod receiver;

pub use receiver::{LoraLink, LoraPacket};
