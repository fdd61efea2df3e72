// sensorvault-storage - Storage sink adapter
//
// Uniform put/get/list/delete over named containers. The archive job talks
// to the `ObjectSink` trait; `OpenDalSink` maps it onto any OpenDAL service
// (memory, local filesystem, S3-compatible, OpenStack Swift).

mod error;
mod init;
mod opendal_sink;
mod sink;

pub use error::{Result, StorageError};
pub use init::{build_operator, sink_from_config};
pub use opendal_sink::OpenDalSink;
pub use sink::{ObjectMeta, ObjectSink};
