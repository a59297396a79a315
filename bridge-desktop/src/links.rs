//! Magic link strategies
//!
//! - [`FileUriGenerator`]: passive `file://` URI pointing at the local entry
//! - [`LocalServerLinkGenerator`]: active link served by a localhost helper

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use bridge_traits::{error::Result, links::LinkGenerator, storage::RelativeId};
use std::path::PathBuf;

/// Default port of the localhost link server
pub const DEFAULT_LINK_SERVER_PORT: u16 = 12345;

/// Passive link generation: `file://` URI of `root/relative`
#[derive(Debug, Clone)]
pub struct FileUriGenerator {
    root: PathBuf,
}

impl FileUriGenerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl LinkGenerator for FileUriGenerator {
    fn generate(&self, relative_path: &RelativeId) -> Result<String> {
        let absolute = relative_path.to_path(&self.root);
        let posix = absolute.to_string_lossy().replace('\\', "/");

        let encoded = posix
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        Ok(format!("file:///{}", encoded))
    }
}

/// Active link generation: `http://localhost:<port>/open?f=<base64url(path)>`
#[derive(Debug, Clone)]
pub struct LocalServerLinkGenerator {
    port: u16,
}

impl LocalServerLinkGenerator {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for LocalServerLinkGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_SERVER_PORT)
    }
}

impl LinkGenerator for LocalServerLinkGenerator {
    fn generate(&self, relative_path: &RelativeId) -> Result<String> {
        let token = URL_SAFE.encode(relative_path.as_str().as_bytes());
        Ok(format!("http://localhost:{}/open?f={}", self.port, token))
    }
}
