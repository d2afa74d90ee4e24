use std::fmt;

use crate::documents::model::Document;

/// Where the user goes next after an operation completes.
///
/// Components return this instead of redirecting, the CLI decides what to
/// do with it.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    /// Landing page for signed-out users.
    Entry,
    Login,
    Dashboard,
    Document(i64),
    /// Inline analysis results for a guest upload.
    Results(Box<Document>),
    /// Hand-off to a page outside the app (payment provider).
    External(String),
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Navigation::Entry => write!(f, "entry page"),
            Navigation::Login => write!(f, "login"),
            Navigation::Dashboard => write!(f, "dashboard"),
            Navigation::Document(id) => write!(f, "document #{}", id),
            Navigation::Results(_) => write!(f, "analysis results"),
            Navigation::External(url) => write!(f, "{}", url),
        }
    }
}
