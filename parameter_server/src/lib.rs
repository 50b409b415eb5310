mod group;
mod server;

pub use group::{group_count, group_of, group_range, GROUP_SIZE};
pub use server::FtrlParamServer;
