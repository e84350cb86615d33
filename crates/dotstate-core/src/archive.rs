//! Writing a [`RootState`] as a tar archive
//!
//! Every entry shares one header template: the same owner and the same
//! timestamp for modify, access and change times. Entries are written in
//! name order (a directory, then its files, then its subdirectories), so a
//! fixed model, identity and timestamp always produce the same bytes.

use std::io::Write;

use chrono::{DateTime, Utc};
use tar::{Builder, EntryType, Header};
use tracing::debug;

use crate::state::{DirMap, DirState, FileMap, FileState, RootState, sorted_names};
use crate::{Error, Result};

/// Owner recorded on every archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: u64,
    pub gid: u64,
    pub user_name: String,
    pub group_name: String,
}

impl Identity {
    /// Identity of the invoking user and their primary group.
    pub fn current() -> Result<Self> {
        use nix::unistd::{Group, User, getuid};

        let uid = getuid();
        let user = User::from_uid(uid)
            .map_err(|e| Error::Identity {
                message: format!("uid {}: {}", uid, e),
            })?
            .ok_or_else(|| Error::Identity {
                message: format!("no user with uid {}", uid),
            })?;
        let group = Group::from_gid(user.gid)
            .map_err(|e| Error::Identity {
                message: format!("gid {}: {}", user.gid, e),
            })?
            .ok_or_else(|| Error::Identity {
                message: format!("no group with gid {}", user.gid),
            })?;

        Ok(Self {
            uid: u64::from(uid.as_raw()),
            gid: u64::from(user.gid.as_raw()),
            user_name: user.name,
            group_name: group.name,
        })
    }
}

/// Serializes target states with a fixed owner and timestamp.
#[derive(Debug, Clone)]
pub struct Archiver {
    identity: Identity,
    timestamp: DateTime<Utc>,
}

impl Archiver {
    pub fn new(identity: Identity, timestamp: DateTime<Utc>) -> Self {
        Self {
            identity,
            timestamp,
        }
    }

    /// Archiver for the invoking user, stamped with the current time.
    pub fn current() -> Result<Self> {
        Ok(Self::new(Identity::current()?, Utc::now()))
    }

    /// Append every entry of `root` to `builder`.
    ///
    /// The end-of-archive marker is not written; finish the builder to
    /// complete the stream.
    pub fn archive<W: Write>(&self, root: &RootState, builder: &mut Builder<W>) -> Result<()> {
        let template = self.header_template()?;
        append_children(builder, &template, &root.dirs, &root.files, None)
    }

    /// Archive `root` into a complete in-memory tar stream.
    pub fn archive_to_vec(&self, root: &RootState) -> Result<Vec<u8>> {
        let mut builder = Builder::new(Vec::new());
        self.archive(root, &mut builder)?;
        builder.into_inner().map_err(|source| Error::Archive {
            path: String::new(),
            source,
        })
    }

    fn header_template(&self) -> Result<Header> {
        let timestamp = u64::try_from(self.timestamp.timestamp()).unwrap_or(0);

        let mut header = Header::new_gnu();
        header.set_uid(self.identity.uid);
        header.set_gid(self.identity.gid);
        header
            .set_username(&self.identity.user_name)
            .map_err(|source| Error::Archive {
                path: String::new(),
                source,
            })?;
        header
            .set_groupname(&self.identity.group_name)
            .map_err(|source| Error::Archive {
                path: String::new(),
                source,
            })?;
        header.set_mtime(timestamp);
        if let Some(gnu) = header.as_gnu_mut() {
            gnu.set_atime(timestamp);
            gnu.set_ctime(timestamp);
        }
        Ok(header)
    }
}

fn append_children<W: Write>(
    builder: &mut Builder<W>,
    template: &Header,
    dirs: &DirMap,
    files: &FileMap,
    prefix: Option<&str>,
) -> Result<()> {
    for name in sorted_names(files) {
        append_file(builder, template, &files[name], &entry_path(prefix, name))?;
    }
    for name in sorted_names(dirs) {
        append_dir(builder, template, &dirs[name], &entry_path(prefix, name))?;
    }
    Ok(())
}

fn append_dir<W: Write>(
    builder: &mut Builder<W>,
    template: &Header,
    state: &DirState,
    path: &str,
) -> Result<()> {
    let mut header = template.clone();
    header.set_entry_type(EntryType::Directory);
    header.set_mode(state.mode);
    header.set_size(0);
    builder
        .append_data(&mut header, path, std::io::empty())
        .map_err(|source| Error::Archive {
            path: path.to_string(),
            source,
        })?;
    debug!(path, "Archived directory");

    append_children(builder, template, &state.dirs, &state.files, Some(path))
}

fn append_file<W: Write>(
    builder: &mut Builder<W>,
    template: &Header,
    state: &FileState,
    path: &str,
) -> Result<()> {
    let mut header = template.clone();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(state.mode);
    header.set_size(state.contents.len() as u64);
    builder
        .append_data(&mut header, path, state.contents.as_slice())
        .map_err(|source| Error::Archive {
            path: path.to_string(),
            source,
        })?;
    debug!(path, size = state.contents.len(), "Archived file");
    Ok(())
}

fn entry_path(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix, name),
        None => name.to_string(),
    }
}
