pub mod group_cache;
pub mod run_flags;
