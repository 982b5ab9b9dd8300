use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// The expensive work a [`DiskCache`](crate::DiskCache) memoizes.
///
/// Implementations must be deterministic: the same input bytes and an equal
/// configuration must always produce the same output, because the cache
/// hands back a previous result instead of calling `transform` again.
///
/// # Examples
///
/// ```
/// use kiln_cache::Transform;
/// use std::io::Write;
/// use std::path::Path;
///
/// struct Uppercase;
///
/// impl Transform for Uppercase {
///     type Config = ();
///     type Error = std::io::Error;
///
///     fn transform(&self, input: &Path, _: &(), output: &mut dyn Write) -> std::io::Result<()> {
///         let text = std::fs::read_to_string(input)?;
///         output.write_all(text.to_uppercase().as_bytes())
///     }
/// }
/// ```
pub trait Transform {
    /// Everything besides the input file that affects the output. Its
    /// serialized form is half of the cache key.
    type Config: Serialize;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write the artifact for `input` into `output`. The cache takes care of
    /// compression and of making the result visible atomically.
    fn transform(&self, input: &Path, config: &Self::Config, output: &mut dyn Write) -> Result<(), Self::Error>;
}
