//! In-memory model of an ASiC-E archive.
//!
//! Members keep their decompressed bytes together with the compression
//! method they were stored with. An archive read from a container also keeps
//! the container bytes, so untouched members can be copied back verbatim.

use std::fmt;

/// Compression method of a single member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Stored,
    Deflated,
    /// Any other method; content is carried but never decoded
    Other,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::Stored => f.write_str("stored"),
            Compression::Deflated => f.write_str("deflated"),
            Compression::Other => f.write_str("other"),
        }
    }
}

/// One archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub path: String,
    pub data: Vec<u8>,
    pub is_dir: bool,
    pub compression: Compression,
    /// Per-entry comment as read from the central directory
    pub comment: String,
    /// Position in the source container, if read from one
    pub index: Option<usize>,
}

impl Member {
    #[must_use]
    pub fn file(path: impl Into<String>, data: Vec<u8>, compression: Compression) -> Self {
        Self {
            path: path.into(),
            data,
            is_dir: false,
            compression,
            comment: String::new(),
            index: None,
        }
    }
}

/// Ordered set of members keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    members: Vec<Member>,
    comment: Vec<u8>,
    source: Option<Vec<u8>>,
}

impl Archive {
    #[must_use]
    pub fn new(members: Vec<Member>, comment: Vec<u8>) -> Self {
        Self {
            members,
            comment,
            source: None,
        }
    }

    /// Attach the container bytes the members were read from.
    #[must_use]
    pub fn with_source(mut self, bytes: Vec<u8>) -> Self {
        self.source = Some(bytes);
        self
    }

    /// Container bytes this archive was read from.
    #[must_use]
    pub fn source(&self) -> Option<&[u8]> {
        self.source.as_deref()
    }

    /// Members in archive order.
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub fn member(&self, path: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.path == path)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.member(path).is_some()
    }

    /// Archive-level comment from the end of central directory record.
    #[must_use]
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
