use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An opaque handle to a provider-side conversation.
///
/// The relays never look inside a handle, they only pass it back to the
/// provider that created it. Providers may attach arbitrary state to the
/// handle, e.g. the conversation memory that the remote service would
/// otherwise keep on its side.
///
/// Cloning a handle is cheap and yields the same session. Comparing two
/// handles is trivially comparing their ids.
pub struct SessionHandle(Arc<dyn SessionObject>);

impl SessionHandle {
    /// Creates a new `SessionHandle`.
    ///
    /// The `id` identifies the session and should be unique for the
    /// lifetime of the provider.
    #[inline]
    pub fn new<ID: Into<String>, T: Send + Sync + 'static>(
        id: ID,
        value: T,
    ) -> Self {
        let id = id.into();
        Self(Arc::new(SessionInner { id, value }))
    }

    /// Returns the id of this session.
    #[inline]
    pub fn id(&self) -> &str {
        self.0.id()
    }

    /// Returns the provider state attached to this handle.
    #[inline]
    pub fn to_raw<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }
}

impl Clone for SessionHandle {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Debug for SessionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.0.id())
            .finish()
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }
}

impl Eq for SessionHandle {}

impl Hash for SessionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id().hash(state);
    }
}

trait SessionObject: Send + Sync {
    fn id(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

struct SessionInner<T> {
    id: String,
    value: T,
}

impl<T: Send + Sync + 'static> SessionObject for SessionInner<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    struct History(Vec<String>);

    #[test]
    fn test_attached_state() {
        let handle = SessionHandle::new(
            "session:0",
            History(vec!["Hello".to_owned()]),
        );
        let history = handle.to_raw::<History>().unwrap();
        assert_eq!(history.0, ["Hello"]);
        assert!(handle.to_raw::<String>().is_none());
        assert_eq!(handle.id(), "session:0");
    }

    #[test]
    fn test_identity() {
        let handle_0 = SessionHandle::new("session:0", ());
        let handle_1 = SessionHandle::new("session:1", ());

        let handle_0_clone = handle_0.clone();
        assert_eq!(handle_0, handle_0_clone);
        assert_ne!(handle_0, handle_1);

        let mut set = HashSet::new();
        set.insert(handle_0);
        set.insert(handle_0_clone);
        set.insert(handle_1);
        assert_eq!(set.len(), 2);
    }
}
