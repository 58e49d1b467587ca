use std::collections::HashMap;
use std::sync::Arc;

use common::Channel;

use crate::{ChannelAdapter, ChannelError};

/// The adapters available to the engine, keyed by channel.
///
/// Built explicitly from configuration at start-up. A channel missing here
/// fails with `NotConfigured` when an operation needs it.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    adapters: HashMap<Channel, Arc<dyn ChannelAdapter>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under the channel it reports.
    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.insert(adapter.channel(), adapter);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, channel: Channel) -> Result<Arc<dyn ChannelAdapter>, ChannelError> {
        self.adapters
            .get(&channel)
            .cloned()
            .ok_or(ChannelError::NotConfigured(channel))
    }

    pub fn is_configured(&self, channel: Channel) -> bool {
        self.adapters.contains_key(&channel)
    }

    /// Configured channels in a stable order.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<_> = self.adapters.keys().copied().collect();
        channels.sort();
        channels
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryChannelAdapter;

    #[test]
    fn test_unregistered_channel_is_not_configured() {
        let registry =
            ChannelRegistry::new().with(Arc::new(InMemoryChannelAdapter::new(Channel::Beds24)));
        assert!(registry.get(Channel::Beds24).is_ok());
        assert_eq!(
            registry.get(Channel::Channex).err(),
            Some(ChannelError::NotConfigured(Channel::Channex))
        );
        assert_eq!(registry.channels(), vec![Channel::Beds24]);
    }
}
