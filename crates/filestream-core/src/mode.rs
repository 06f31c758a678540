//! Open modes, hints and seek origins.
//!
//! Two encodings reach `open`: the structured form (access + binary /
//! create-new / replace-existing flags) and the legacy bitmask, whose low
//! byte selects the access mode and whose high bits carry hints.

use std::ffi::CStr;

// ---------------------------------------------------------------------------
// Legacy bitmask encoding
// ---------------------------------------------------------------------------

pub const RFILE_MODE_READ: u32 = 0;
pub const RFILE_MODE_READ_TEXT: u32 = 1;
pub const RFILE_MODE_WRITE: u32 = 2;
pub const RFILE_MODE_READ_WRITE: u32 = 3;

/// Bypass stdio buffering; use a raw descriptor.
pub const RFILE_HINT_UNBUFFERED: u32 = 1 << 8;
/// Map the file read-only instead of reading through a descriptor.
pub const RFILE_HINT_MMAP: u32 = 1 << 9;

const LEGACY_MODE_MASK: u32 = 0xff;

// ---------------------------------------------------------------------------
// Host VFS encoding
// ---------------------------------------------------------------------------

pub const VFS_ACCESS_READ: u32 = 1 << 0;
pub const VFS_ACCESS_WRITE: u32 = 1 << 1;
pub const VFS_ACCESS_READ_WRITE: u32 = VFS_ACCESS_READ | VFS_ACCESS_WRITE;
/// Keep existing contents when opening for writing.
pub const VFS_ACCESS_UPDATE_EXISTING: u32 = 1 << 2;

pub const VFS_HINT_NONE: u32 = 0;
/// Host may keep the file resident (mapped or cached).
pub const VFS_HINT_FREQUENT_ACCESS: u32 = 1 << 0;

/// Owner read/write bits applied when a file is created.
pub(crate) const CREATE_PERMISSIONS: libc::mode_t = libc::S_IRUSR | libc::S_IWUSR;

/// What the caller intends to do with the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    /// Write-only; creates the file and truncates it unless told otherwise.
    Write,
    ReadWrite,
}

/// Strategy hints. Advisory: the engine may override them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hints {
    pub text: bool,
    pub unbuffered: bool,
    pub mmap: bool,
}

/// Complete open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenMode {
    pub access: Access,
    pub binary: bool,
    pub create_new: bool,
    pub replace_existing: bool,
    pub hints: Hints,
}

impl OpenMode {
    /// Structured form used by the C `filestream_open`.
    #[must_use]
    pub const fn new(access: Access, binary: bool, create_new: bool, replace_existing: bool) -> Self {
        Self {
            access,
            binary,
            create_new,
            replace_existing,
            hints: Hints {
                text: !binary,
                unbuffered: false,
                mmap: false,
            },
        }
    }

    /// Read an existing file.
    #[must_use]
    pub const fn read() -> Self {
        Self::new(Access::Read, true, false, false)
    }

    /// Create or truncate, write-only.
    #[must_use]
    pub const fn write() -> Self {
        Self::new(Access::Write, true, true, true)
    }

    /// Read and write, creating the file if missing, keeping its contents.
    #[must_use]
    pub const fn read_write() -> Self {
        Self::new(Access::ReadWrite, true, true, false)
    }

    #[must_use]
    pub const fn unbuffered(mut self) -> Self {
        self.hints.unbuffered = true;
        self
    }

    #[must_use]
    pub const fn mmap(mut self) -> Self {
        self.hints.mmap = true;
        self
    }

    #[must_use]
    pub const fn text(mut self) -> Self {
        self.binary = false;
        self.hints.text = true;
        self
    }

    /// Keep existing contents when writing.
    #[must_use]
    pub const fn update_existing(mut self) -> Self {
        self.replace_existing = false;
        self
    }

    /// Decode the legacy `RFILE_MODE_* | RFILE_HINT_*` bitmask.
    ///
    /// Returns `None` for an unknown access byte.
    #[must_use]
    pub fn from_legacy_bits(bits: u32) -> Option<Self> {
        let mut mode = match bits & LEGACY_MODE_MASK {
            RFILE_MODE_READ => Self::read(),
            RFILE_MODE_READ_TEXT => Self::read().text(),
            RFILE_MODE_WRITE => Self::write(),
            RFILE_MODE_READ_WRITE => Self::read_write(),
            _ => return None,
        };
        mode.hints.unbuffered = bits & RFILE_HINT_UNBUFFERED != 0;
        mode.hints.mmap = bits & RFILE_HINT_MMAP != 0;
        Some(mode)
    }

    /// Encode back into the legacy bitmask.
    #[must_use]
    pub fn to_legacy_bits(&self) -> u32 {
        let mut bits = match self.access {
            Access::Read if self.hints.text => RFILE_MODE_READ_TEXT,
            Access::Read => RFILE_MODE_READ,
            Access::Write => RFILE_MODE_WRITE,
            Access::ReadWrite => RFILE_MODE_READ_WRITE,
        };
        if self.hints.unbuffered {
            bits |= RFILE_HINT_UNBUFFERED;
        }
        if self.hints.mmap {
            bits |= RFILE_HINT_MMAP;
        }
        bits
    }

    /// Decode host VFS access bits and hints.
    #[must_use]
    pub fn from_vfs_bits(access: u32, hints: u32) -> Option<Self> {
        let update = access & VFS_ACCESS_UPDATE_EXISTING != 0;
        let mut mode = match access & VFS_ACCESS_READ_WRITE {
            VFS_ACCESS_READ => Self::read(),
            VFS_ACCESS_WRITE => Self::write(),
            VFS_ACCESS_READ_WRITE => Self::new(Access::ReadWrite, true, true, true),
            _ => return None,
        };
        if update {
            mode = mode.update_existing();
        }
        mode.hints.mmap = hints & VFS_HINT_FREQUENT_ACCESS != 0;
        Some(mode)
    }

    /// Encode as host VFS `(access, hints)`.
    #[must_use]
    pub fn to_vfs_bits(&self) -> (u32, u32) {
        let mut access = match self.access {
            Access::Read => VFS_ACCESS_READ,
            Access::Write => VFS_ACCESS_WRITE,
            Access::ReadWrite => VFS_ACCESS_READ_WRITE,
        };
        if self.access != Access::Read && !self.replace_existing {
            access |= VFS_ACCESS_UPDATE_EXISTING;
        }
        let hints = if self.hints.mmap {
            VFS_HINT_FREQUENT_ACCESS
        } else {
            VFS_HINT_NONE
        };
        (access, hints)
    }

    /// POSIX `O_*` flags for the descriptor behind every fallback strategy.
    #[must_use]
    pub fn oflags(&self) -> i32 {
        let mut oflags = match self.access {
            Access::Read => libc::O_RDONLY,
            Access::Write => libc::O_WRONLY | libc::O_CREAT,
            Access::ReadWrite => libc::O_RDWR,
        };
        if self.access == Access::ReadWrite && self.create_new {
            oflags |= libc::O_CREAT;
        }
        if self.access != Access::Read && self.replace_existing {
            oflags |= libc::O_TRUNC;
        }
        oflags | libc::O_CLOEXEC
    }

    /// stdio mode string for the buffered strategy.
    #[must_use]
    pub fn stdio_mode(&self) -> &'static CStr {
        match self.access {
            Access::Read if self.hints.text => c"r",
            Access::Read => c"rb",
            Access::Write => c"wb",
            Access::ReadWrite if self.replace_existing => c"w+b",
            Access::ReadWrite => c"r+b",
        }
    }
}

/// Seek origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    /// Convert from the C `SEEK_*` value.
    #[must_use]
    pub fn from_raw(whence: i32) -> Option<Self> {
        match whence {
            libc::SEEK_SET => Some(Self::Start),
            libc::SEEK_CUR => Some(Self::Current),
            libc::SEEK_END => Some(Self::End),
            _ => None,
        }
    }

    #[must_use]
    pub const fn to_raw(self) -> i32 {
        match self {
            Self::Start => libc::SEEK_SET,
            Self::Current => libc::SEEK_CUR,
            Self::End => libc::SEEK_END,
        }
    }
}

/// Resolve `offset` against `base` (the cursor or the end), rejecting
/// positions below zero and overflow.
pub(crate) fn resolve_offset(base: u64, offset: i64) -> Option<u64> {
    base.checked_add_signed(offset)
}
