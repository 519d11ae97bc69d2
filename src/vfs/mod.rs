pub mod factory;
pub mod handle;
pub mod mime;
pub mod path;
pub mod stream;

pub use factory::HandleFactory;
pub use handle::{FileHandle, SafeFile};
pub use path::NodeKind;
pub use stream::{InputStream, OutputStream, ReadStream, WriteMode};
