/// Records allowed in the post-processing chain at once.
pub const DEFAULT_POST_CONCURRENCY: usize = 4;
/// Capacity of the branch-outcome queue feeding the join.
pub const INTAKE_QUEUE_CAPACITY: usize = 64;
/// Bytes of payload handed to the metadata extractor (512 KiB).
pub const DEFAULT_EXIF_READ_LIMIT: usize = 512 * 1024;
/// Metadata extractor executable looked up on `PATH`.
pub const DEFAULT_EXIFTOOL_PROGRAM: &str = "exiftool";
/// Arguments sent with every extraction request.
pub const EXIFTOOL_ARGS: &[&str] = &["-e", "-n", "-json", "-fast2"];
/// Chunk size used when reading files from disk.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;
/// Longest wait for one extractor answer before the worker is restarted.
pub const EXTRACT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
