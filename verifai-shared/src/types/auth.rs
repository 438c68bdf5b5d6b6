/// Identity of the signed-in user, as exposed by the host app's auth layer.
///
/// The sync core never authenticates anyone itself; it only needs to know
/// which user owns the inbox right now, or that nobody is signed in.
pub trait AuthProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}
