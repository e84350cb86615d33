//! Source-tree naming convention
//!
//! Target metadata is carried entirely in source entry names:
//!
//! ```text
//! file:      [private_] [executable_] [dot_] <name> [.tmpl]
//! directory: [private_] [dot_] <name>
//! ```
//!
//! Prefixes are recognised in exactly this order. Anything else is a literal
//! part of the name. Only four file modes and two directory modes survive a
//! decode; encoding an arbitrary mode keeps just its private and executable
//! classes.

pub const PRIVATE_PREFIX: &str = "private_";
pub const EXECUTABLE_PREFIX: &str = "executable_";
pub const DOT_PREFIX: &str = "dot_";
pub const TEMPLATE_SUFFIX: &str = ".tmpl";

/// Mode of a decoded regular file before private/executable adjustments.
pub const BASE_FILE_MODE: u32 = 0o666;
/// Mode of a decoded directory before private adjustment.
pub const BASE_DIR_MODE: u32 = 0o777;

const OWNER_ONLY: u32 = 0o700;
const GROUP_OTHER: u32 = 0o077;
const EXECUTE: u32 = 0o111;

/// Target attributes decoded from a source file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub name: String,
    pub mode: u32,
    pub is_template: bool,
}

/// Target attributes decoded from a source directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirAttributes {
    pub name: String,
    pub mode: u32,
}

/// Decode a source file name into its target name, mode and template flag.
///
/// # Example
///
/// ```
/// use dotstate_core::attr::decode_file_name;
///
/// let attrs = decode_file_name("private_executable_dot_foo.tmpl");
/// assert_eq!(attrs.name, ".foo");
/// assert_eq!(attrs.mode, 0o700);
/// assert!(attrs.is_template);
/// ```
pub fn decode_file_name(source_name: &str) -> FileAttributes {
    let mut name = source_name;
    let mut mode = BASE_FILE_MODE;

    let is_private = match name.strip_prefix(PRIVATE_PREFIX) {
        Some(rest) => {
            name = rest;
            true
        }
        None => false,
    };
    if let Some(rest) = name.strip_prefix(EXECUTABLE_PREFIX) {
        name = rest;
        mode |= EXECUTE;
    }
    let mut name = decode_dot(name);
    let is_template = name.ends_with(TEMPLATE_SUFFIX);
    if is_template {
        name.truncate(name.len() - TEMPLATE_SUFFIX.len());
    }
    if is_private {
        mode &= OWNER_ONLY;
    }

    FileAttributes {
        name,
        mode,
        is_template,
    }
}

/// Decode a source directory name into its target name and mode.
pub fn decode_dir_name(source_name: &str) -> DirAttributes {
    let mut name = source_name;
    let mut mode = BASE_DIR_MODE;

    if let Some(rest) = name.strip_prefix(PRIVATE_PREFIX) {
        name = rest;
        mode &= OWNER_ONLY;
    }

    DirAttributes {
        name: decode_dot(name),
        mode,
    }
}

/// Encode a target file name, mode and template flag as a source file name.
///
/// A mode with no group or other bits is encoded as private; any execute
/// bit is encoded as executable.
pub fn encode_file_name(name: &str, mode: u32, is_template: bool) -> String {
    let mut source_name = String::new();
    if mode & GROUP_OTHER == 0 {
        source_name.push_str(PRIVATE_PREFIX);
    }
    if mode & EXECUTE != 0 {
        source_name.push_str(EXECUTABLE_PREFIX);
    }
    source_name.push_str(&encode_dot(name));
    if is_template {
        source_name.push_str(TEMPLATE_SUFFIX);
    }
    source_name
}

/// Encode a target directory name and mode as a source directory name.
pub fn encode_dir_name(name: &str, mode: u32) -> String {
    let mut source_name = String::new();
    if mode & GROUP_OTHER == 0 {
        source_name.push_str(PRIVATE_PREFIX);
    }
    source_name.push_str(&encode_dot(name));
    source_name
}

/// Canonical file mode for a private/executable class.
pub fn canonical_file_mode(is_private: bool, is_executable: bool) -> u32 {
    let mut mode = BASE_FILE_MODE;
    if is_executable {
        mode |= EXECUTE;
    }
    if is_private {
        mode &= OWNER_ONLY;
    }
    mode
}

/// Canonical directory mode for a private class.
pub fn canonical_dir_mode(is_private: bool) -> u32 {
    if is_private {
        BASE_DIR_MODE & OWNER_ONLY
    } else {
        BASE_DIR_MODE
    }
}

fn decode_dot(name: &str) -> String {
    match name.strip_prefix(DOT_PREFIX) {
        Some(rest) => format!(".{}", rest),
        None => name.to_string(),
    }
}

fn encode_dot(name: &str) -> String {
    match name.strip_prefix('.') {
        Some(rest) => format!("{}{}", DOT_PREFIX, rest),
        None => name.to_string(),
    }
}
