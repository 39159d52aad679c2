use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use fab_types::{Slug, Username};
use parking_lot::{Mutex, MutexGuard};

const STRIPES: usize = 64;

/// Fixed set of mutexes keyed by `(owner, slug)`.
///
/// Two writers to the same path always share a stripe; unrelated paths may
/// share one too, which costs only contention.
pub(crate) struct PathLocks {
    stripes: [Mutex<()>; STRIPES],
}

impl PathLocks {
    pub(crate) fn new() -> Self {
        Self {
            stripes: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    pub(crate) fn lock(&self, owner: &Username, slug: &Slug) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        owner.hash(&mut hasher);
        slug.hash(&mut hasher);
        self.stripes[(hasher.finish() as usize) % STRIPES].lock()
    }
}

impl std::fmt::Debug for PathLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathLocks").field("stripes", &STRIPES).finish()
    }
}
