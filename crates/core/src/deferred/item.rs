//! Deferred item

/// One pending message.
///
/// `C` is an opaque classifier consulted only by priority predicates and
/// handed back to the completion handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredItem<C> {
    pub key: String,
    /// Encoded message; empty means there is nothing to send
    pub payload: Vec<u8>,
    /// Byte count advertised to the transport
    pub size: u64,
    pub destination: String,
    pub classifier: C,
    /// Treat a 4xx/5xx answer as final for this item
    pub bail_on_http_error: bool,
    pub with_net_tracing: bool,
    /// A failure never halts the round and the item is dropped anyway
    pub ignore_errors: bool,
}

impl<C> DeferredItem<C> {
    /// New item with `size` taken from the payload length and all flags off.
    pub fn new(
        key: impl Into<String>,
        payload: impl Into<Vec<u8>>,
        destination: impl Into<String>,
        classifier: C,
    ) -> Self {
        let payload = payload.into();
        Self {
            key: key.into(),
            size: payload.len() as u64,
            payload,
            destination: destination.into(),
            classifier,
            bail_on_http_error: false,
            with_net_tracing: false,
            ignore_errors: false,
        }
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn bail_on_http_error(mut self, bail: bool) -> Self {
        self.bail_on_http_error = bail;
        self
    }

    pub fn with_net_tracing(mut self, enabled: bool) -> Self {
        self.with_net_tracing = enabled;
        self
    }

    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }

    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }
}
