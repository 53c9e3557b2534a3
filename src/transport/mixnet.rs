use anyhow::Result;
use futures::future::BoxFuture;

/// The mixnet's single-use request primitive: deliver `message` to
/// `recipient` from the local session and resolve with the one reply.
///
/// Implementations own session bring-up, identities, and delivery; the
/// relay client only frames what goes through. Injected at construction so
/// tests can substitute an in-process relay.
pub trait MixnetRequester: Send + Sync {
    fn request<'a>(
        &'a self,
        session_id: u32,
        recipient: &'a [u8],
        message: Vec<u8>,
        params: &'a [u8],
    ) -> BoxFuture<'a, Result<Vec<u8>>>;
}
