use std::fmt;

use crate::name::Username;

/// The identity on whose behalf a core operation runs.
///
/// Every document read and write takes a requester so that ownership and
/// visibility are checked at the index, not left to the HTTP layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Requester {
    /// No session was presented.
    Anonymous,
    /// A user authenticated by a valid session.
    User(Username),
}

impl Requester {
    pub fn user(name: Username) -> Self {
        Requester::User(name)
    }

    /// The authenticated username, if any.
    pub fn username(&self) -> Option<&Username> {
        match self {
            Requester::Anonymous => None,
            Requester::User(name) => Some(name),
        }
    }

    /// Returns `true` if this requester is the given user.
    pub fn is(&self, name: &Username) -> bool {
        self.username() == Some(name)
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requester::Anonymous => f.write_str("anonymous"),
            Requester::User(name) => write!(f, "{name}"),
        }
    }
}
