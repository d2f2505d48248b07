#![allow(dead_code)]

pub mod sandbox;
pub mod synthetic_depth;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
