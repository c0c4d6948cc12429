//! The passwd record shape and field-mask application.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::field::{Field, FieldMask};

/// Numeric user id.
pub type Uid = u32;

/// Numeric group id.
pub type Gid = u32;

/// Value of a cleared uid, the `(uid_t)-1` convention.
pub const UID_UNSET: Uid = Uid::MAX;

/// Value of a cleared gid, the `(gid_t)-1` convention.
pub const GID_UNSET: Gid = Gid::MAX;

/// One passwd database entry.
///
/// Alongside each value the record carries a presence set (`fields`) naming
/// the attributes the backend actually populated. A present attribute may
/// still be empty text or zero; presence is never inferred from the value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Passwd {
    name: String,
    passwd: String,
    uid: Uid,
    gid: Gid,
    change: i64,
    class: String,
    gecos: String,
    dir: String,
    shell: String,
    expire: i64,
    fields: FieldMask,
}

impl Default for Passwd {
    fn default() -> Self {
        Self::empty()
    }
}

impl Passwd {
    /// A record with every attribute cleared and nothing present.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            passwd: String::new(),
            uid: UID_UNSET,
            gid: GID_UNSET,
            change: 0,
            class: String::new(),
            gecos: String::new(),
            dir: String::new(),
            shell: String::new(),
            expire: 0,
            fields: FieldMask::empty(),
        }
    }

    /// A record with name, uid and gid present.
    pub fn new(name: impl Into<String>, uid: Uid, gid: Gid) -> Self {
        Self {
            name: name.into(),
            uid,
            gid,
            fields: FieldMask::empty()
                .with(Field::Name)
                .with(Field::Uid)
                .with(Field::Gid),
            ..Self::empty()
        }
    }

    /// Set the password hash and mark it present.
    pub fn with_passwd(mut self, passwd: impl Into<String>) -> Self {
        self.passwd = passwd.into();
        self.fields.insert(Field::Passwd);
        self
    }

    /// Set the password change time and mark it present.
    pub fn with_change(mut self, change: i64) -> Self {
        self.change = change;
        self.fields.insert(Field::Change);
        self
    }

    /// Set the login class and mark it present.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self.fields.insert(Field::Class);
        self
    }

    /// Set the gecos comment and mark it present.
    pub fn with_gecos(mut self, gecos: impl Into<String>) -> Self {
        self.gecos = gecos.into();
        self.fields.insert(Field::Gecos);
        self
    }

    /// Set the home directory and mark it present.
    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = dir.into();
        self.fields.insert(Field::Dir);
        self
    }

    /// Set the login shell and mark it present.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self.fields.insert(Field::Shell);
        self
    }

    /// Set the expiration time and mark it present.
    pub fn with_expire(mut self, expire: i64) -> Self {
        self.expire = expire;
        self.fields.insert(Field::Expire);
        self
    }

    /// Login name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Password hash.
    pub fn passwd(&self) -> &str {
        &self.passwd
    }

    /// User id, [`UID_UNSET`] when cleared.
    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Group id, [`GID_UNSET`] when cleared.
    pub fn gid(&self) -> Gid {
        self.gid
    }

    /// Password change time, 0 when cleared.
    pub fn change(&self) -> i64 {
        self.change
    }

    /// Login class.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Gecos comment.
    pub fn gecos(&self) -> &str {
        &self.gecos
    }

    /// Home directory.
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// Login shell.
    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Expiration time, 0 when cleared.
    pub fn expire(&self) -> i64 {
        self.expire
    }

    /// Attributes the backend populated (and the mask let through).
    pub fn fields(&self) -> FieldMask {
        self.fields
    }

    /// Whether an attribute is present.
    pub fn is_present(&self, field: Field) -> bool {
        self.fields.contains(field)
    }

    /// Clear one attribute to its empty representation and drop its
    /// presence bit.
    pub fn clear(&mut self, field: Field) {
        match field {
            Field::Name => self.name.clear(),
            Field::Passwd => self.passwd.clear(),
            Field::Uid => self.uid = UID_UNSET,
            Field::Gid => self.gid = GID_UNSET,
            Field::Change => self.change = 0,
            Field::Class => self.class.clear(),
            Field::Gecos => self.gecos.clear(),
            Field::Dir => self.dir.clear(),
            Field::Shell => self.shell.clear(),
            Field::Expire => self.expire = 0,
        }
        self.fields.remove(field);
    }

    /// The view of this record a channel with field mask `mask` may see.
    ///
    /// Attributes outside the mask are cleared; the rest are copied
    /// unchanged. `r.masked(m).masked(m) == r.masked(m)` for every `r`, `m`.
    pub fn masked(&self, mask: &FieldMask) -> Passwd {
        let mut view = self.clone();
        for field in FieldMask::all().iter() {
            if !mask.contains(field) {
                view.clear(field);
            }
        }
        view
    }

    /// Bytes a caller-supplied buffer needs to hold the text attributes,
    /// each with a terminator.
    pub fn storage_len(&self) -> usize {
        [
            &self.name,
            &self.passwd,
            &self.class,
            &self.gecos,
            &self.dir,
            &self.shell,
        ]
        .iter()
        .map(|s| s.len() + 1)
        .sum()
    }
}
