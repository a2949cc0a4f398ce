#![forbid(unsafe_code)]

pub mod pcd;
pub mod ply;

pub use pcd::{read_pcd, write_pcd, write_pcd_binary};
pub use ply::{read_ply, write_ply, write_ply_binary};
